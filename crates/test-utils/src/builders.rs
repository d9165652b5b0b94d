#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Instant;

use taskweave::agents::Agent;
use taskweave::config::{AgentConfig, ConfigFile, RawConfigFile};
use taskweave::errors::Result;
use taskweave::task::{NewTask, StoredTask};
use taskweave::types::{AgentId, AgentStatus, Priority, TaskId, TaskStatus};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                task: BTreeMap::new(),
                ..Default::default()
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: StoredTask) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_agent(mut self, id: &str, capabilities: &[&str]) -> Self {
        self.config.agent.push(AgentConfig {
            id: id.to_string(),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            specialization: None,
            status: AgentStatus::Idle,
            load: 0.0,
        });
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.scheduler.max_retries = max_retries;
        self
    }

    pub fn with_aging(mut self, threshold_secs: u64, interval_secs: u64, max_bonus: u32) -> Self {
        self.config.scheduler.aging_threshold_secs = threshold_secs;
        self.config.scheduler.aging_interval_secs = interval_secs;
        self.config.scheduler.max_aging_bonus = max_bonus;
        self
    }

    pub fn with_auto_assign_ms(mut self, ms: u64) -> Self {
        self.config.scheduler.auto_assign_interval_ms = ms;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `NewTask`.
pub struct NewTaskBuilder {
    task: NewTask,
}

impl NewTaskBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            task: NewTask::titled(title),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.task.id = Some(TaskId::new(id));
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.task.priority = Some(priority);
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.depends_on.push(TaskId::new(dep));
        self
    }

    pub fn conflicts_with(mut self, other: &str) -> Self {
        self.task.conflicts_with.push(TaskId::new(other));
        self
    }

    pub fn requires(mut self, capability: &str) -> Self {
        self.task.required_capabilities.push(capability.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.task.tags.push(tag.to_string());
        self
    }

    pub fn pinned_to(mut self, agent: &str) -> Self {
        self.task.requested_agent = Some(AgentId::new(agent));
        self
    }

    pub fn build(self) -> NewTask {
        self.task
    }
}

/// Builder for `StoredTask` records (config files, restore).
pub struct StoredTaskBuilder {
    task: StoredTask,
}

impl StoredTaskBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            task: StoredTask {
                title: Some(title.to_string()),
                ..Default::default()
            },
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.task.id = Some(TaskId::new(id));
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.task.priority = Some(priority);
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.task.status = Some(status);
        self
    }

    pub fn assigned_to(mut self, agent: &str) -> Self {
        self.task.assigned_agent_id = Some(AgentId::new(agent));
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task
            .depends_on
            .get_or_insert_with(Vec::new)
            .push(TaskId::new(dep));
        self
    }

    pub fn conflicts_with(mut self, other: &str) -> Self {
        self.task
            .conflicts_with
            .get_or_insert_with(Vec::new)
            .push(TaskId::new(other));
        self
    }

    pub fn requires(mut self, capability: &str) -> Self {
        self.task
            .required_capabilities
            .get_or_insert_with(Vec::new)
            .push(capability.to_string());
        self
    }

    pub fn retry_count(mut self, count: u32) -> Self {
        self.task.retry_count = Some(count);
        self
    }

    pub fn build(self) -> StoredTask {
        self.task
    }
}

/// Builder for agent snapshots.
pub struct AgentBuilder {
    agent: Agent,
}

impl AgentBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            agent: Agent::new(id, Vec::<String>::new()),
        }
    }

    pub fn capability(mut self, capability: &str) -> Self {
        self.agent.capabilities.insert(capability.to_string());
        self
    }

    pub fn specialization(mut self, specialization: &str) -> Self {
        self.agent.specialization = Some(specialization.to_string());
        self
    }

    pub fn status(mut self, status: AgentStatus) -> Self {
        self.agent.status = status;
        self
    }

    pub fn load(mut self, load: f64) -> Self {
        self.agent.load = load;
        self
    }

    pub fn idle_since(mut self, since: Instant) -> Self {
        self.agent.idle_since = Some(since);
        self
    }

    pub fn build(self) -> Agent {
        self.agent
    }
}
