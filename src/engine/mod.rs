// src/engine/mod.rs

//! Orchestration engine for taskweave.
//!
//! This module ties together:
//! - the scheduler facade
//! - the main runtime event loop that reacts to:
//!   - task submissions (local and remote)
//!   - agent signals (started / completed / failed / timed out)
//!   - periodic auto-assign ticks
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::Duration;

use crate::task::{NewTask, RemoteTaskDescriptor};
use crate::types::TaskId;

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once no task is assigned or in progress and
    /// nothing more can be assigned.
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from submitters, agents and timers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A local caller submitted a task.
    TaskSubmitted(NewTask),
    /// A task request arrived from a remote peer.
    RemoteTaskReceived(RemoteTaskDescriptor),
    /// The assigned agent picked the task up.
    TaskStarted { task: TaskId },
    /// The assigned agent finished the task.
    TaskCompleted { task: TaskId },
    /// The assigned agent gave up on the task.
    TaskFailed { task: TaskId, reason: String },
    /// An external watchdog decided the task took too long.
    TaskTimedOut { task: TaskId, after: Duration },
    /// Operator cancellation.
    CancelRequested { task: TaskId },
    /// Periodic auto-assign sweep.
    Tick,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
