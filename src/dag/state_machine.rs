// src/dag/state_machine.rs

//! The task lifecycle transition table.
//!
//! ```text
//!            promote            assign            start            complete
//!   Queued ----------> Ready ----------> Assigned -------> InProgress -------> Completed
//!     ^  <----------                                 |
//!     |     demote                                   | fail (retries left)
//!     +----------------------------------------------+
//!
//!   fail (no retries) -> Failed      cancel (any non-terminal) -> Cancelled
//! ```
//!
//! This is the only code that writes `Task::status`.

use std::fmt;

use tracing::{debug, warn};

use crate::agents::Agent;
use crate::errors::{Result, TaskweaveError};
use crate::task::Task;
use crate::types::{AgentId, AgentStatus, TaskStatus};

/// A requested lifecycle change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Queued -> Ready, once nothing blocks the task.
    Promote,
    /// Ready -> Queued, when a dependency or an active conflict appears.
    Demote,
    /// Ready -> Assigned to an idle agent.
    Assign { agent: AgentId },
    /// Assigned -> InProgress, on the agent's start confirmation.
    Start,
    /// InProgress -> Completed.
    Complete,
    /// Failure signal. Re-queues while retries remain and `allow_retry` is set.
    Fail { reason: String, allow_retry: bool },
    /// Any non-terminal state -> Cancelled.
    Cancel,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Promote => write!(f, "promote"),
            Transition::Demote => write!(f, "demote"),
            Transition::Assign { agent } => write!(f, "assign to '{agent}'"),
            Transition::Start => write!(f, "start"),
            Transition::Complete => write!(f, "complete"),
            Transition::Fail { .. } => write!(f, "fail"),
            Transition::Cancel => write!(f, "cancel"),
        }
    }
}

/// Facts the guards need that the task itself does not carry.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardContext<'a> {
    /// Result of `DependencyGraph::is_blocked` for the task.
    pub blocked: bool,
    /// The agent named by an `Assign` request, if it is known.
    pub agent: Option<&'a Agent>,
}

/// Result of an applied transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub from: TaskStatus,
    pub to: TaskStatus,
    /// A failure that was turned into a retry.
    pub requeued: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStateMachine {
    max_retries: u32,
}

impl TaskStateMachine {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether the table has an edge for `transition` out of `from`,
    /// ignoring guards.
    pub fn permits(from: TaskStatus, transition: &Transition) -> bool {
        use TaskStatus::*;
        match transition {
            Transition::Promote => from == Queued,
            Transition::Demote => from == Ready,
            Transition::Assign { .. } => from == Ready,
            Transition::Start => from == Assigned,
            Transition::Complete => from == InProgress,
            Transition::Fail { .. } => matches!(from, Queued | Ready | Assigned | InProgress),
            Transition::Cancel => !from.is_terminal(),
        }
    }

    /// Validate and apply `transition` to `task`.
    ///
    /// On error the task is untouched and the rejection is logged.
    pub fn apply(
        &self,
        task: &mut Task,
        transition: Transition,
        guard: &GuardContext<'_>,
    ) -> Result<Applied> {
        let from = task.status;

        if !Self::permits(from, &transition) || !self.guard_holds(task, &transition, guard) {
            warn!(
                task = %task.id,
                from = %from,
                transition = %transition,
                "rejected invalid task transition"
            );
            return Err(TaskweaveError::InvalidTransition {
                task: task.id.clone(),
                from,
                transition,
            });
        }

        let mut requeued = false;
        let to = match transition {
            Transition::Promote => TaskStatus::Ready,
            Transition::Demote => TaskStatus::Queued,
            Transition::Assign { agent } => {
                task.assigned_agent_id = Some(agent);
                TaskStatus::Assigned
            }
            Transition::Start => TaskStatus::InProgress,
            Transition::Complete => {
                task.assigned_agent_id = None;
                TaskStatus::Completed
            }
            Transition::Fail {
                reason,
                allow_retry,
            } => {
                task.assigned_agent_id = None;
                task.last_error = Some(reason);
                if allow_retry && task.retry_count < self.max_retries {
                    task.retry_count += 1;
                    requeued = true;
                    TaskStatus::Queued
                } else {
                    TaskStatus::Failed
                }
            }
            Transition::Cancel => {
                task.assigned_agent_id = None;
                TaskStatus::Cancelled
            }
        };

        task.status = to;
        debug!(
            task = %task.id,
            from = %from,
            to = %to,
            requeued,
            retry_count = task.retry_count,
            "task transition applied"
        );

        Ok(Applied { from, to, requeued })
    }

    fn guard_holds(&self, task: &Task, transition: &Transition, guard: &GuardContext<'_>) -> bool {
        match transition {
            Transition::Promote => !guard.blocked,
            Transition::Demote => guard.blocked,
            Transition::Assign { agent } => {
                if agent.is_empty() {
                    return false;
                }
                if task.requested_agent.as_ref().is_some_and(|want| want != agent) {
                    return false;
                }
                match guard.agent {
                    Some(a) => a.id == *agent && a.status == AgentStatus::Idle,
                    None => false,
                }
            }
            Transition::Start
            | Transition::Complete
            | Transition::Fail { .. }
            | Transition::Cancel => true,
        }
    }
}
