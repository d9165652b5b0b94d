// src/agents/model.rs

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::types::{AgentId, AgentStatus, TaskId};

/// Read-only snapshot of a worker, as reported by the agent-lifecycle
/// collaborator. The scheduler never creates or edits these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub current_task_id: Option<TaskId>,
    /// When the agent last became idle. `None` means "unknown", which ranks
    /// as the shortest possible idle time.
    #[serde(skip)]
    pub idle_since: Option<Instant>,
    /// Reported utilisation in `[0, 1]`.
    #[serde(default)]
    pub load: f64,
}

impl Agent {
    /// An idle agent with the given capabilities.
    pub fn new<I, S>(id: impl Into<AgentId>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            specialization: None,
            status: AgentStatus::Idle,
            current_task_id: None,
            idle_since: None,
            load: 0.0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == AgentStatus::Idle
    }

    /// How long the agent has been idle as of `now`.
    pub fn idle_for(&self, now: Instant) -> Duration {
        match (self.status, self.idle_since) {
            (AgentStatus::Idle, Some(since)) => now.saturating_duration_since(since),
            _ => Duration::ZERO,
        }
    }
}
