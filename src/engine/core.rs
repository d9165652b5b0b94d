// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated scheduler state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `Assignment`s to the agent backend
//! - driving the auto-assign ticker and Ctrl+C handling
//!
//! The core can be tested without any Tokio, channels or agents.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    CoreStep, handle_cancel, handle_submission, handle_task_completion, handle_task_failure,
    handle_task_started, handle_tick,
};
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::task::NewTask;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler, options: RuntimeOptions) -> Self {
        Self { scheduler, options }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn into_scheduler(self) -> Scheduler {
        self.scheduler
    }

    /// No task is assigned or in progress.
    pub fn is_idle(&self) -> bool {
        self.scheduler.active_count() == 0
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskSubmitted(spec) => {
                handle_submission(&mut self.scheduler, &self.options, spec)
            }
            RuntimeEvent::RemoteTaskReceived(remote) => {
                handle_submission(&mut self.scheduler, &self.options, NewTask::from(remote))
            }
            RuntimeEvent::TaskStarted { task } => handle_task_started(&mut self.scheduler, task),
            RuntimeEvent::TaskCompleted { task } => {
                handle_task_completion(&mut self.scheduler, &self.options, task)
            }
            RuntimeEvent::TaskFailed { task, reason } => {
                handle_task_failure(&mut self.scheduler, &self.options, task, reason)
            }
            RuntimeEvent::TaskTimedOut { task, after } => {
                let reason = format!("timed out after {}s", after.as_secs());
                handle_task_failure(&mut self.scheduler, &self.options, task, reason)
            }
            RuntimeEvent::CancelRequested { task } => {
                handle_cancel(&mut self.scheduler, &self.options, task)
            }
            RuntimeEvent::Tick => handle_tick(&mut self.scheduler, &self.options),
            RuntimeEvent::ShutdownRequested => CoreStep::stop(),
        }
    }
}
