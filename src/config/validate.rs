// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskweaveError};
use crate::types::Priority;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::TaskweaveError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.scheduler,
            raw.matcher,
            raw.agent,
            raw.task,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_scheduler_section(cfg)?;
    validate_matcher_section(cfg)?;
    validate_agents(cfg)?;
    validate_task_references(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn validate_scheduler_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scheduler.aging_interval_secs == 0 {
        return Err(TaskweaveError::ConfigError(
            "[scheduler].aging_interval_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    // Below this a waiting Low task can never overtake a fresh Critical one.
    let min_bonus = Priority::Critical.numeric() - Priority::Low.numeric();
    if cfg.scheduler.max_aging_bonus < min_bonus {
        return Err(TaskweaveError::ConfigError(format!(
            "[scheduler].max_aging_bonus must be >= {min_bonus} (got {})",
            cfg.scheduler.max_aging_bonus
        )));
    }
    if cfg.scheduler.auto_assign_interval_ms == 0 {
        return Err(TaskweaveError::ConfigError(
            "[scheduler].auto_assign_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_matcher_section(cfg: &RawConfigFile) -> Result<()> {
    let m = &cfg.matcher;
    for (key, value) in [
        ("specialization_bonus", m.specialization_bonus),
        ("load_penalty", m.load_penalty),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(TaskweaveError::ConfigError(format!(
                "[matcher].{key} must be a non-negative number (got {value})"
            )));
        }
    }
    Ok(())
}

fn validate_agents(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for agent in &cfg.agent {
        if agent.id.trim().is_empty() {
            return Err(TaskweaveError::ConfigError(
                "[[agent]] entries must have a non-empty id".to_string(),
            ));
        }
        if !seen.insert(agent.id.as_str()) {
            return Err(TaskweaveError::ConfigError(format!(
                "duplicate agent id '{}'",
                agent.id
            )));
        }
        if !(0.0..=1.0).contains(&agent.load) {
            return Err(TaskweaveError::ConfigError(format!(
                "agent '{}' has load {} outside [0, 1]",
                agent.id, agent.load
            )));
        }
    }
    Ok(())
}

fn validate_task_references(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if let Some(ref id) = task.id {
            if id.as_str() != name {
                return Err(TaskweaveError::ConfigError(format!(
                    "task '{}' declares a different id '{}'",
                    name, id
                )));
            }
        }

        for dep in task.depends_on.iter().flatten() {
            if !cfg.task.contains_key(dep.as_str()) {
                return Err(TaskweaveError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `depends_on`",
                    name, dep
                )));
            }
            if dep.as_str() == name {
                return Err(TaskweaveError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `depends_on`",
                    name
                )));
            }
        }

        for other in task.conflicts_with.iter().flatten() {
            if !cfg.task.contains_key(other.as_str()) {
                return Err(TaskweaveError::ConfigError(format!(
                    "task '{}' has unknown task '{}' in `conflicts_with`",
                    name, other
                )));
            }
            if other.as_str() == name {
                return Err(TaskweaveError::ConfigError(format!(
                    "task '{}' cannot conflict with itself",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dependency -> task.
    // For:
    //   [task.B]
    //   depends_on = ["A"]
    // we add edge A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.depends_on.iter().flatten() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(TaskweaveError::DagCycle(format!(
                "cycle detected in task DAG involving task '{}'",
                node
            )))
        }
    }
}
