// src/config/model.rs

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::agents::Agent;
use crate::dispatch::{AgingPolicy, MatcherSettings};
use crate::task::StoredTask;
use crate::types::{AgentId, AgentStatus, TaskId};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [scheduler]
/// max_retries = 2
/// aging_threshold_secs = 300
///
/// [matcher]
/// specialization_bonus = 0.5
///
/// [[agent]]
/// id = "alice"
/// capabilities = ["rust"]
///
/// [task.build]
/// title = "Build the workspace"
/// priority = "high"
/// required_capabilities = ["rust"]
/// ```
///
/// All sections are optional and have reasonable defaults. This is the raw,
/// unvalidated form; convert with `ConfigFile::try_from`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub matcher: MatcherSection,

    /// Static agent pool from `[[agent]]`.
    #[serde(default)]
    pub agent: Vec<AgentConfig>,

    /// Persisted tasks from `[task.<id>]`. Keys are task ids.
    #[serde(default)]
    pub task: BTreeMap<String, StoredTask>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerSection,
    pub matcher: MatcherSection,
    pub agent: Vec<AgentConfig>,
    pub task: BTreeMap<String, StoredTask>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerSection,
        matcher: MatcherSection,
        agent: Vec<AgentConfig>,
        task: BTreeMap<String, StoredTask>,
    ) -> Self {
        Self {
            scheduler,
            matcher,
            agent,
            task,
        }
    }

    /// Task records with their ids filled in from the table keys.
    pub fn stored_tasks(&self) -> Vec<StoredTask> {
        self.task
            .iter()
            .map(|(key, record)| {
                let mut record = record.clone();
                record.id = Some(TaskId::new(key.clone()));
                record
            })
            .collect()
    }

    /// Agent snapshots for the configured pool; idle agents count as idle
    /// since `now`.
    pub fn agents(&self, now: Instant) -> Vec<Agent> {
        self.agent.iter().map(|a| a.to_agent(now)).collect()
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.scheduler, raw.matcher, raw.agent, raw.task)
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Automatic re-queues allowed after a failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Seconds a ready task waits before it starts accruing an aging bonus.
    #[serde(default = "default_aging_threshold_secs")]
    pub aging_threshold_secs: u64,

    /// Seconds per additional bonus point after the threshold.
    #[serde(default = "default_aging_interval_secs")]
    pub aging_interval_secs: u64,

    /// Cap on the aging bonus, in priority levels. At least the Low to
    /// Critical gap, so every waiting task eventually reaches the front.
    #[serde(default = "default_max_aging_bonus")]
    pub max_aging_bonus: u32,

    /// Period of the automatic assignment sweep.
    #[serde(default = "default_auto_assign_interval_ms")]
    pub auto_assign_interval_ms: u64,

    /// Buffer size of the event bus.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_max_retries() -> u32 {
    2
}

fn default_aging_threshold_secs() -> u64 {
    300
}

fn default_aging_interval_secs() -> u64 {
    60
}

fn default_max_aging_bonus() -> u32 {
    3
}

fn default_auto_assign_interval_ms() -> u64 {
    1000
}

fn default_event_capacity() -> usize {
    256
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            aging_threshold_secs: default_aging_threshold_secs(),
            aging_interval_secs: default_aging_interval_secs(),
            max_aging_bonus: default_max_aging_bonus(),
            auto_assign_interval_ms: default_auto_assign_interval_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl SchedulerSection {
    pub fn aging_policy(&self) -> AgingPolicy {
        AgingPolicy {
            threshold: Duration::from_secs(self.aging_threshold_secs),
            interval: Duration::from_secs(self.aging_interval_secs),
            max_bonus: self.max_aging_bonus,
        }
    }

    pub fn auto_assign_interval(&self) -> Duration {
        Duration::from_millis(self.auto_assign_interval_ms)
    }
}

/// `[matcher]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MatcherSection {
    #[serde(default = "default_specialization_bonus")]
    pub specialization_bonus: f64,

    #[serde(default = "default_load_penalty")]
    pub load_penalty: f64,
}

fn default_specialization_bonus() -> f64 {
    0.5
}

fn default_load_penalty() -> f64 {
    0.5
}

impl Default for MatcherSection {
    fn default() -> Self {
        Self {
            specialization_bonus: default_specialization_bonus(),
            load_penalty: default_load_penalty(),
        }
    }
}

impl MatcherSection {
    pub fn settings(&self) -> MatcherSettings {
        MatcherSettings {
            specialization_bonus: self.specialization_bonus,
            load_penalty: self.load_penalty,
        }
    }
}

/// One `[[agent]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub id: String,

    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub specialization: Option<String>,

    #[serde(default)]
    pub status: AgentStatus,

    #[serde(default)]
    pub load: f64,
}

impl AgentConfig {
    pub fn to_agent(&self, now: Instant) -> Agent {
        let mut agent = Agent::new(AgentId::new(self.id.clone()), self.capabilities.iter().cloned());
        agent.specialization = self.specialization.clone();
        agent.status = self.status;
        agent.load = self.load;
        if agent.status == AgentStatus::Idle {
            agent.idle_since = Some(now);
        }
        agent
    }
}
