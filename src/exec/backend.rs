// src/exec/backend.rs

//! Pluggable agent backend abstraction.
//!
//! The runtime talks to an `AgentBackend` instead of to agents directly.
//! Launching and supervising real workers lives outside this crate; the
//! backend is where an integration hands assignments over to them.
//!
//! - `SimulatedBackend` plays the agents in-process: it marks the agent
//!   working, waits a little, marks it idle again and reports back through
//!   `RuntimeEvent`s. The CLI uses it.
//! - Tests can provide their own `AgentBackend` that, for example, records
//!   which assignments were made and replies immediately.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::agents::InMemoryAgentDirectory;
use crate::clock::Clock;
use crate::dag::Assignment;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::types::TaskId;

/// Trait abstracting how assignments reach agents.
pub trait AgentBackend: Send {
    /// Hand the given assignments to their agents.
    ///
    /// The implementation is free to:
    /// - notify real agents over some transport (production integrations)
    /// - simulate the work and emit `RuntimeEvent`s (CLI, tests)
    fn dispatch(
        &mut self,
        assignments: Vec<Assignment>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// In-process stand-in for a pool of agents.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    directory: InMemoryAgentDirectory,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    clock: Arc<dyn Clock>,
    work_time: Duration,
    /// Tasks whose every attempt fails.
    failing: HashSet<TaskId>,
}

impl SimulatedBackend {
    pub fn new(
        directory: InMemoryAgentDirectory,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            runtime_tx,
            clock,
            work_time: Duration::from_millis(50),
            failing: HashSet::new(),
        }
    }

    pub fn with_work_time(mut self, work_time: Duration) -> Self {
        self.work_time = work_time;
        self
    }

    pub fn with_failing(mut self, tasks: impl IntoIterator<Item = TaskId>) -> Self {
        self.failing.extend(tasks);
        self
    }
}

impl AgentBackend for SimulatedBackend {
    fn dispatch(
        &mut self,
        assignments: Vec<Assignment>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for assignment in assignments {
                self.directory
                    .mark_working(&assignment.agent, &assignment.task);

                let directory = self.directory.clone();
                let tx = self.runtime_tx.clone();
                let clock = Arc::clone(&self.clock);
                let work_time = self.work_time;
                let fails = self.failing.contains(&assignment.task);

                tokio::spawn(async move {
                    let Assignment { task, agent, .. } = assignment;
                    if tx
                        .send(RuntimeEvent::TaskStarted { task: task.clone() })
                        .await
                        .is_err()
                    {
                        return;
                    }

                    tokio::time::sleep(work_time).await;

                    // Free the agent before reporting, so the scheduler sees
                    // it idle when it handles the signal.
                    directory.mark_idle(&agent, clock.now());
                    let event = if fails {
                        RuntimeEvent::TaskFailed {
                            task: task.clone(),
                            reason: "simulated failure".to_string(),
                        }
                    } else {
                        RuntimeEvent::TaskCompleted { task: task.clone() }
                    };
                    debug!(task = %task, agent = %agent, fails, "simulated agent finished");
                    if tx.send(event).await.is_err() {
                        warn!(task = %task, "runtime gone before simulated agent reported back");
                    }
                });
            }
            Ok(())
        })
    }
}
