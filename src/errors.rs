// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Structural violations (bad input, cycles, illegal transitions) are errors
//! and leave the scheduler untouched. Steady-state conditions such as "no idle
//! agent" are not errors; see [`crate::dag::AssignOutcome`].

use thiserror::Error;

use crate::dag::state_machine::Transition;
use crate::types::{TaskId, TaskStatus};

#[derive(Error, Debug)]
pub enum TaskweaveError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Dependency cycle: '{task}' cannot depend on '{depends_on}'")]
    Cycle { task: TaskId, depends_on: TaskId },

    #[error("Task '{0}' cannot conflict with itself")]
    ConflictDeclaration(TaskId),

    #[error("Invalid transition for task '{task}': {transition} is not allowed from {from}")]
    InvalidTransition {
        task: TaskId,
        from: TaskStatus,
        transition: Transition,
    },

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Task '{0}' is in progress; cancel it first or force removal")]
    TaskInProgress(TaskId),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in task DAG: {0}")]
    DagCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskweaveError>;
