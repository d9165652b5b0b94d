// src/agents/directory.rs

//! Source of agent snapshots.
//!
//! The scheduler only ever *reads* agents through [`AgentDirectory`]. The
//! in-memory implementation here is what the CLI simulation and the tests use
//! to play the role of the agent-lifecycle collaborator.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::debug;

use crate::agents::model::Agent;
use crate::types::{AgentId, AgentStatus, TaskId};

pub trait AgentDirectory: Send + Sync + Debug {
    /// Current snapshot of all known agents.
    fn list_agents(&self) -> Vec<Agent>;
}

/// Shared, mutable agent table. Clones see the same agents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgentDirectory {
    agents: Arc<Mutex<BTreeMap<AgentId, Agent>>>,
}

impl InMemoryAgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agents(agents: impl IntoIterator<Item = Agent>) -> Self {
        let dir = Self::new();
        for agent in agents {
            dir.upsert(agent);
        }
        dir
    }

    pub fn upsert(&self, agent: Agent) {
        self.lock().insert(agent.id.clone(), agent);
    }

    pub fn remove(&self, id: &AgentId) -> Option<Agent> {
        self.lock().remove(id)
    }

    pub fn get(&self, id: &AgentId) -> Option<Agent> {
        self.lock().get(id).cloned()
    }

    /// The agent picked up `task`.
    pub fn mark_working(&self, id: &AgentId, task: &TaskId) {
        if let Some(agent) = self.lock().get_mut(id) {
            agent.status = AgentStatus::Working;
            agent.current_task_id = Some(task.clone());
            agent.idle_since = None;
            debug!(agent = %id, task = %task, "agent marked working");
        }
    }

    /// The agent finished whatever it was doing at `now`.
    pub fn mark_idle(&self, id: &AgentId, now: Instant) {
        if let Some(agent) = self.lock().get_mut(id) {
            agent.status = AgentStatus::Idle;
            agent.current_task_id = None;
            agent.idle_since = Some(now);
            debug!(agent = %id, "agent marked idle");
        }
    }

    pub fn mark_offline(&self, id: &AgentId) {
        if let Some(agent) = self.lock().get_mut(id) {
            agent.status = AgentStatus::Offline;
            agent.current_task_id = None;
            agent.idle_since = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<AgentId, Agent>> {
        self.agents.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AgentDirectory for InMemoryAgentDirectory {
    fn list_agents(&self) -> Vec<Agent> {
        self.lock().values().cloned().collect()
    }
}
