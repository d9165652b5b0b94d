// src/exec/mod.rs

//! Agent notification layer.
//!
//! - [`backend`] provides the `AgentBackend` trait the runtime dispatches
//!   through, and the `SimulatedBackend` used by the CLI.

pub mod backend;

pub use backend::{AgentBackend, SimulatedBackend};
