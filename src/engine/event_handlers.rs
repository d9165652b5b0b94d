// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.
//!
//! Handlers never fail: a signal the scheduler rejects (unknown task, illegal
//! transition) is logged and otherwise ignored, and the runtime keeps going.

use tracing::{debug, info, warn};

use crate::dag::{Assignment, Scheduler, SchedulerStep};
use crate::engine::RuntimeOptions;
use crate::errors::Result;
use crate::task::NewTask;
use crate::types::TaskId;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Notify agents of these assignments.
    Dispatch(Vec<Assignment>),
    /// Request that the process exits (used when `exit_when_idle` is set).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    /// Commands the IO shell should execute (dispatch assignments, exit).
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn stop() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: false,
        }
    }
}

/// Handle a new task submission: register it and use any idle capacity.
pub fn handle_submission(
    scheduler: &mut Scheduler,
    options: &RuntimeOptions,
    spec: NewTask,
) -> CoreStep {
    match scheduler.add_task(spec) {
        Ok(task) => debug!(task = %task.id(), status = %task.status(), "submission accepted"),
        Err(err) => warn!(error = %err, "rejected task submission"),
    }
    let step = scheduler.assign_ready();
    finish(scheduler, options, step.assignments)
}

/// Handle an agent's start confirmation.
pub fn handle_task_started(scheduler: &mut Scheduler, task: TaskId) -> CoreStep {
    if let Err(err) = scheduler.start_task(&task) {
        warn!(task = %task, error = %err, "ignoring start signal");
    }
    CoreStep {
        commands: Vec::new(),
        keep_running: true,
    }
}

/// Handle a task completion signal.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    options: &RuntimeOptions,
    task: TaskId,
) -> CoreStep {
    let result = scheduler.complete_task(&task);
    finish_signal(scheduler, options, &task, "completion", result)
}

/// Handle a task failure (including timeouts, which are plain failures).
pub fn handle_task_failure(
    scheduler: &mut Scheduler,
    options: &RuntimeOptions,
    task: TaskId,
    reason: String,
) -> CoreStep {
    let result = scheduler.fail_task(&task, reason);
    finish_signal(scheduler, options, &task, "failure", result)
}

/// Handle an operator cancellation.
pub fn handle_cancel(scheduler: &mut Scheduler, options: &RuntimeOptions, task: TaskId) -> CoreStep {
    let result = scheduler.cancel_task(&task);
    finish_signal(scheduler, options, &task, "cancellation", result)
}

/// Periodic sweep: ready tasks may have aged past others, or agents may have
/// come back.
pub fn handle_tick(scheduler: &mut Scheduler, options: &RuntimeOptions) -> CoreStep {
    let step = scheduler.assign_ready();
    finish(scheduler, options, step.assignments)
}

fn finish_signal(
    scheduler: &mut Scheduler,
    options: &RuntimeOptions,
    task: &TaskId,
    signal: &str,
    result: Result<SchedulerStep>,
) -> CoreStep {
    match result {
        Ok(step) => {
            if !step.newly_failed.is_empty() {
                info!(task = %task, failed = ?step.newly_failed, "tasks failed");
            }
            finish(scheduler, options, step.assignments)
        }
        Err(err) => {
            warn!(task = %task, signal, error = %err, "ignoring agent signal");
            finish(scheduler, options, Vec::new())
        }
    }
}

/// Wrap fresh assignments into commands and decide whether to keep running.
fn finish(
    scheduler: &Scheduler,
    options: &RuntimeOptions,
    assignments: Vec<Assignment>,
) -> CoreStep {
    let mut commands = Vec::new();
    let dispatched = !assignments.is_empty();
    if dispatched {
        commands.push(CoreCommand::Dispatch(assignments));
    }

    let mut keep_running = true;
    if options.exit_when_idle && !dispatched && scheduler.active_count() == 0 {
        info!(
            pending = scheduler.pending_count(),
            "no task is running and nothing more can be assigned"
        );
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
