// src/dag/stats.rs

use std::collections::BTreeMap;

use crate::types::{TaskId, TaskStatus};

/// Read-only aggregate for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    /// Count per status; every status is present, possibly with 0.
    pub by_status: BTreeMap<TaskStatus, usize>,
    /// Queued tasks held back by a dependency or an active conflict.
    pub blocked: usize,
    /// Ready tasks that no online agent could ever take as things stand.
    pub unmatched: Vec<TaskId>,
    pub idle_agents: usize,
    /// Lifetime counters.
    pub assignments: u64,
    pub capacity_misses: u64,
    pub unmatched_misses: u64,
}

impl TaskStats {
    pub fn count(&self, status: TaskStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}
