// src/task/normalize.rs

//! One-time backfill of persisted task records.
//!
//! Older records may predate fields such as `conflicts_with` or
//! `required_capabilities`. Every such gap is filled here, once, at load time,
//! so the rest of the crate can rely on fully populated [`Task`]s.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{Result, TaskweaveError};
use crate::task::model::Task;
use crate::types::{AgentId, Priority, TaskId, TaskStatus};

/// A task as it may appear in a persisted snapshot or config file.
///
/// Everything is optional; see [`normalize_records`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTask {
    #[serde(default)]
    pub id: Option<TaskId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Legacy cache; always recomputed from `priority`.
    #[serde(default)]
    pub numeric_priority: Option<u32>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub depends_on: Option<Vec<TaskId>>,
    /// Legacy cache; always recomputed by the scheduler.
    #[serde(default)]
    pub blocked_by: Option<Vec<TaskId>>,
    #[serde(default)]
    pub conflicts_with: Option<Vec<TaskId>>,
    #[serde(default)]
    pub required_capabilities: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub assigned_agent_id: Option<AgentId>,
    #[serde(default)]
    pub requested_agent: Option<AgentId>,
    #[serde(default)]
    pub retry_count: Option<u32>,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// Backfill a batch of stored records into tasks.
///
/// - `status` defaults to `Queued` when absent and is otherwise preserved
///   (a stored `Ready` is kept; the scheduler re-derives readiness later).
/// - `assigned_agent_id` is preserved as-is. A record whose agent does not
///   agree with its status is rejected rather than silently repaired.
/// - Missing collections become empty, a missing priority becomes `Medium`,
///   a missing title falls back to the id.
/// - Edges are copied verbatim; the scheduler validates them when it
///   rebuilds the graph.
pub fn normalize_records(records: Vec<StoredTask>) -> Result<Vec<Task>> {
    let mut seen: HashSet<TaskId> = HashSet::new();
    let mut tasks = Vec::with_capacity(records.len());

    for record in records {
        let task = normalize_record(record)?;
        if !seen.insert(task.id.clone()) {
            return Err(TaskweaveError::Validation(format!(
                "duplicate task id '{}' in stored records",
                task.id
            )));
        }
        tasks.push(task);
    }

    debug!(count = tasks.len(), "normalized stored task records");
    Ok(tasks)
}

fn normalize_record(record: StoredTask) -> Result<Task> {
    let id = match record.id {
        Some(id) if !id.as_str().trim().is_empty() => id,
        _ => {
            return Err(TaskweaveError::Validation(
                "stored task record is missing an id".to_string(),
            ));
        }
    };

    let title = match record.title {
        Some(t) if !t.trim().is_empty() => t,
        _ => {
            warn!(task = %id, "stored task has no title; using its id");
            id.to_string()
        }
    };

    let status = record.status.unwrap_or_default();
    let assigned = record.assigned_agent_id.filter(|a| !a.is_empty());
    if status.is_active() != assigned.is_some() {
        return Err(TaskweaveError::Validation(format!(
            "stored task '{}' has status {} but assigned agent {:?}",
            id, status, assigned
        )));
    }

    let priority = record.priority.unwrap_or_default();
    if let Some(stale) = record.numeric_priority {
        if stale != priority.numeric() {
            debug!(
                task = %id,
                stored = stale,
                derived = priority.numeric(),
                "discarding stale numeric priority"
            );
        }
    }

    let depends_on: BTreeSet<TaskId> = record.depends_on.unwrap_or_default().into_iter().collect();
    let conflicts_with: BTreeSet<TaskId> = record
        .conflicts_with
        .unwrap_or_default()
        .into_iter()
        .collect();

    Ok(Task {
        id,
        title,
        description: record.description.unwrap_or_default(),
        priority,
        numeric_priority: priority.numeric(),
        status,
        depends_on,
        blocked_by: BTreeSet::new(),
        conflicts_with,
        required_capabilities: record
            .required_capabilities
            .unwrap_or_default()
            .into_iter()
            .collect(),
        tags: record.tags.unwrap_or_default().into_iter().collect(),
        assigned_agent_id: assigned,
        requested_agent: record.requested_agent.filter(|a| !a.is_empty()),
        retry_count: record.retry_count.unwrap_or(0),
        last_error: record.last_error,
    })
}
