// src/task/model.rs

//! The canonical task record and the request types that create or edit it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{AgentId, Priority, TaskId, TaskStatus};

/// A unit of work owned by the scheduler's registry.
///
/// Fields that carry invariants (`status`, `numeric_priority`, `blocked_by`,
/// `assigned_agent_id`, the graph edges) are only readable from outside the
/// crate. `status` is written exclusively by the state machine; the derived
/// caches are recomputed by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) priority: Priority,
    pub(crate) numeric_priority: u32,
    pub(crate) status: TaskStatus,
    pub(crate) depends_on: BTreeSet<TaskId>,
    pub(crate) blocked_by: BTreeSet<TaskId>,
    pub(crate) conflicts_with: BTreeSet<TaskId>,
    pub(crate) required_capabilities: BTreeSet<String>,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) assigned_agent_id: Option<AgentId>,
    pub(crate) requested_agent: Option<AgentId>,
    pub(crate) retry_count: u32,
    pub(crate) last_error: Option<String>,
}

impl Task {
    /// Build a fresh `Queued` task. Graph edges are attached afterwards by the
    /// scheduler, once they have been validated.
    pub(crate) fn new(id: TaskId, title: String, spec: &NewTask) -> Self {
        let priority = spec.priority.unwrap_or_default();
        Self {
            id,
            title,
            description: spec.description.clone().unwrap_or_default(),
            priority,
            numeric_priority: priority.numeric(),
            status: TaskStatus::Queued,
            depends_on: BTreeSet::new(),
            blocked_by: BTreeSet::new(),
            conflicts_with: BTreeSet::new(),
            required_capabilities: spec.required_capabilities.iter().cloned().collect(),
            tags: spec.tags.iter().cloned().collect(),
            assigned_agent_id: None,
            requested_agent: spec.requested_agent.clone(),
            retry_count: 0,
            last_error: None,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn numeric_priority(&self) -> u32 {
        self.numeric_priority
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn depends_on(&self) -> &BTreeSet<TaskId> {
        &self.depends_on
    }

    pub fn blocked_by(&self) -> &BTreeSet<TaskId> {
        &self.blocked_by
    }

    pub fn conflicts_with(&self) -> &BTreeSet<TaskId> {
        &self.conflicts_with
    }

    pub fn required_capabilities(&self) -> &BTreeSet<String> {
        &self.required_capabilities
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn assigned_agent_id(&self) -> Option<&AgentId> {
        self.assigned_agent_id.as_ref()
    }

    pub fn requested_agent(&self) -> Option<&AgentId> {
        self.requested_agent.as_ref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The only writer of `priority`; keeps `numeric_priority` in step.
    pub(crate) fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
        self.numeric_priority = priority.numeric();
    }
}

/// Request to create a task.
///
/// Only `title` is required. Everything else defaults to empty / `Medium`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    /// Caller-chosen id (remote submissions). Must not have been used before.
    pub id: Option<TaskId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub depends_on: Vec<TaskId>,
    pub conflicts_with: Vec<TaskId>,
    pub required_capabilities: Vec<String>,
    pub tags: Vec<String>,
    /// Pin the task to one agent.
    pub requested_agent: Option<AgentId>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn from_remote(remote: RemoteTaskDescriptor) -> Self {
        remote.into()
    }
}

/// Task descriptor as received from the message bus.
///
/// Remote peers only send a handful of fields; the rest is defaulted when it
/// is turned into a [`NewTask`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteTaskDescriptor {
    #[serde(default)]
    pub id: Option<TaskId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default, rename = "agentId", alias = "agent_id")]
    pub agent_id: Option<AgentId>,
}

impl From<RemoteTaskDescriptor> for NewTask {
    fn from(remote: RemoteTaskDescriptor) -> Self {
        NewTask {
            id: remote.id,
            title: remote.title,
            priority: remote.priority,
            requested_agent: remote.agent_id.filter(|a| !a.is_empty()),
            ..Default::default()
        }
    }
}

/// Partial edit of a task's descriptive fields. Status is not editable here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub required_capabilities: Option<Vec<String>>,
}

/// Query used by `Scheduler::get_tasks`. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub tag: Option<String>,
    pub agent: Option<AgentId>,
    pub capability: Option<String>,
}

impl TaskFilter {
    pub fn with_status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(ref tag) = self.tag {
            if !task.tags.contains(tag) {
                return false;
            }
        }
        if let Some(ref agent) = self.agent {
            if task.assigned_agent_id.as_ref() != Some(agent) {
                return false;
            }
        }
        if let Some(ref cap) = self.capability {
            if !task.required_capabilities.contains(cap) {
                return false;
            }
        }
        true
    }
}
