// src/agents/mod.rs

//! Read-only view of the worker pool.

pub mod directory;
pub mod model;

pub use directory::{AgentDirectory, InMemoryAgentDirectory};
pub use model::Agent;
