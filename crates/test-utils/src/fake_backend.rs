use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use taskweave::dag::Assignment;
use taskweave::engine::RuntimeEvent;
use taskweave::errors::Result;
use taskweave::exec::AgentBackend;
use taskweave::types::TaskId;

/// A fake agent backend that:
/// - records every assignment it is handed
/// - immediately reports `TaskStarted` followed by `TaskCompleted` (or
///   `TaskFailed` for tasks registered with [`FakeBackend::failing`]).
pub struct FakeBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    dispatched: Arc<Mutex<Vec<Assignment>>>,
    failing: HashSet<TaskId>,
}

impl FakeBackend {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        dispatched: Arc<Mutex<Vec<Assignment>>>,
    ) -> Self {
        Self {
            runtime_tx,
            dispatched,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(TaskId::new(task));
        self
    }
}

impl AgentBackend for FakeBackend {
    fn dispatch(
        &mut self,
        assignments: Vec<Assignment>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let dispatched = Arc::clone(&self.dispatched);
        let failing = self.failing.clone();

        Box::pin(async move {
            for a in assignments {
                {
                    let mut guard = dispatched.lock().unwrap();
                    guard.push(a.clone());
                }

                tx.send(RuntimeEvent::TaskStarted { task: a.task.clone() })
                    .await
                    .map_err(anyhow::Error::from)?;

                let done = if failing.contains(&a.task) {
                    RuntimeEvent::TaskFailed {
                        task: a.task.clone(),
                        reason: "fake failure".to_string(),
                    }
                } else {
                    RuntimeEvent::TaskCompleted { task: a.task.clone() }
                };
                tx.send(done).await.map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
