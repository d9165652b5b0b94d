// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::dag::{Assignment, Scheduler};
use crate::errors::Result;
use crate::exec::AgentBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Drives the scheduler in response to `RuntimeEvent`s, and delegates agent
/// notification to an `AgentBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. Every input, including the auto-assign tick, is
/// serialised through this loop, so the scheduler only ever has one writer.
pub struct Runtime<B: AgentBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    backend: B,
    auto_assign: Option<Duration>,
}

impl<B: AgentBackend> fmt::Debug for Runtime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("auto_assign", &self.auto_assign)
            .finish_non_exhaustive()
    }
}

impl<B: AgentBackend> Runtime<B> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, backend: B) -> Self {
        Self {
            core,
            event_rx,
            backend,
            auto_assign: None,
        }
    }

    /// Inject a `RuntimeEvent::Tick` every `period`.
    pub fn with_auto_assign(mut self, period: Duration) -> Self {
        self.auto_assign = Some(period);
        self
    }

    /// Main event loop.
    ///
    /// - Runs one assignment pass for whatever is already ready.
    /// - Consumes `RuntimeEvent`s from `event_rx` (and ticks, if enabled).
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (dispatch, exit).
    ///
    /// Returns the scheduler so the caller can report on the final state.
    pub async fn run(mut self) -> Result<Scheduler> {
        info!("taskweave runtime started");

        let mut ticker = self.auto_assign.map(new_ticker);

        let mut event = RuntimeEvent::Tick;
        loop {
            debug!(?event, "runtime received event");

            // Feed the event into the pure core and get commands back.
            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }

            let next = match ticker.as_mut() {
                Some(ticker) => tokio::select! {
                    received = self.event_rx.recv() => received,
                    _ = ticker.tick() => Some(RuntimeEvent::Tick),
                },
                None => self.event_rx.recv().await,
            };

            event = match next {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };
        }

        info!("runtime exiting");
        Ok(self.core.into_scheduler())
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::Dispatch(assignments) => {
                self.dispatch(assignments).await?;
            }
            CoreCommand::RequestExit => {
                // keep_running is already false; nothing else to do.
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, assignments: Vec<Assignment>) -> Result<()> {
        if assignments.is_empty() {
            return Ok(());
        }

        let pairs: Vec<_> = assignments
            .iter()
            .map(|a| format!("{}->{}", a.task, a.agent))
            .collect();
        debug!(?pairs, "dispatching assignments");

        self.backend.dispatch(assignments).await
    }
}

fn new_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
