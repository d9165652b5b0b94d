// src/dag/mod.rs

//! Dependency graph and scheduling.
//!
//! - [`graph`] holds the mutable dependency DAG and the conflict relation.
//! - [`state_machine`] is the task lifecycle transition table.
//! - [`scheduler`] contains the facade that owns the registry and decides
//!   which tasks are ready, and where they run.
//! - [`scheduler_step`] defines the result types of scheduler operations.
//! - [`stats`] is the read-only aggregate for observability.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_machine;
pub mod stats;

pub use graph::{DependencyGraph, StatusLookup};
pub use scheduler::{RemoveMode, RequeuePolicy, Scheduler, SchedulerSettings};
pub use scheduler_step::{AssignOutcome, Assignment, SchedulerStep};
pub use state_machine::{Applied, GuardContext, TaskStateMachine, Transition};
pub use stats::TaskStats;
