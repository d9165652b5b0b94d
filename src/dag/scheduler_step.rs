// src/dag/scheduler_step.rs

//! Result types returned by the scheduler's mutating operations.

use std::collections::BTreeSet;

use crate::task::Task;
use crate::types::{AgentId, TaskId};

/// A task handed to an agent. This is what the runtime forwards to the
/// agent backend once the assignment is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub task: TaskId,
    pub agent: AgentId,
    pub title: String,
    pub description: String,
    pub required_capabilities: BTreeSet<String>,
}

impl Assignment {
    pub fn from_task(task: &Task, agent: AgentId) -> Self {
        Self {
            task: task.id().clone(),
            agent,
            title: task.title().to_string(),
            description: task.description().to_string(),
            required_capabilities: task.required_capabilities().clone(),
        }
    }
}

/// Result of one `assign_next_task` attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    Assigned(Assignment),
    /// Nothing is ready.
    NoReadyTasks,
    /// Tasks are ready but no agent is idle.
    NoCapacity { ready: usize },
    /// Idle agents exist but none qualifies for any ready task.
    Unmatched { tasks: Vec<TaskId> },
}

impl AssignOutcome {
    pub fn is_assigned(&self) -> bool {
        matches!(self, AssignOutcome::Assigned(_))
    }
}

/// Structured result of a signal handled by the scheduler.
///
/// Useful for the runtime (which dispatches `assignments`) and for tests that
/// want to assert on what a single step changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Assignments made while draining the ready set after the signal.
    pub assignments: Vec<Assignment>,
    /// Tasks promoted to `Ready` by this step.
    pub newly_ready: Vec<TaskId>,
    /// Tasks that reached terminal `Failed` (the task itself and any
    /// dependents failed by propagation).
    pub newly_failed: Vec<TaskId>,
    /// Tasks whose failure was absorbed by a retry.
    pub requeued: Vec<TaskId>,
}
