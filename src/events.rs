// src/events.rs

//! Typed notifications emitted by the scheduler.
//!
//! The event set is closed: observers match on [`SchedulerEvent`] rather than
//! subscribing to string-keyed channels. Events are published *after* the
//! corresponding state change is committed; a publish that reaches nobody is
//! not an error.

use tokio::sync::broadcast;
use tracing::trace;

use crate::types::{AgentId, Priority, TaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    TaskCreated {
        task: TaskId,
        priority: Priority,
    },
    TaskReady {
        task: TaskId,
    },
    TaskBlocked {
        task: TaskId,
        blocked_by: Vec<TaskId>,
    },
    TaskAssigned {
        task: TaskId,
        agent: AgentId,
    },
    TaskStarted {
        task: TaskId,
        agent: AgentId,
    },
    TaskCompleted {
        task: TaskId,
    },
    TaskFailed {
        task: TaskId,
        reason: String,
        /// `true` when the failure was absorbed by a retry.
        requeued: bool,
        retry_count: u32,
    },
    TaskCancelled {
        task: TaskId,
    },
    TaskRemoved {
        task: TaskId,
    },
}

impl SchedulerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SchedulerEvent::TaskCreated { .. } => "task_created",
            SchedulerEvent::TaskReady { .. } => "task_ready",
            SchedulerEvent::TaskBlocked { .. } => "task_blocked",
            SchedulerEvent::TaskAssigned { .. } => "task_assigned",
            SchedulerEvent::TaskStarted { .. } => "task_started",
            SchedulerEvent::TaskCompleted { .. } => "task_completed",
            SchedulerEvent::TaskFailed { .. } => "task_failed",
            SchedulerEvent::TaskCancelled { .. } => "task_cancelled",
            SchedulerEvent::TaskRemoved { .. } => "task_removed",
        }
    }

    pub fn task_id(&self) -> &TaskId {
        match self {
            SchedulerEvent::TaskCreated { task, .. }
            | SchedulerEvent::TaskReady { task }
            | SchedulerEvent::TaskBlocked { task, .. }
            | SchedulerEvent::TaskAssigned { task, .. }
            | SchedulerEvent::TaskStarted { task, .. }
            | SchedulerEvent::TaskCompleted { task }
            | SchedulerEvent::TaskFailed { task, .. }
            | SchedulerEvent::TaskCancelled { task }
            | SchedulerEvent::TaskRemoved { task } => task,
        }
    }
}

/// Fan-out of [`SchedulerEvent`]s to any number of observers.
///
/// Slow observers that fall behind by more than `capacity` events see a
/// `Lagged` error on their receiver; the scheduler is never blocked.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SchedulerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SchedulerEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            trace!(event = name, "no event subscribers; dropping notification");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
