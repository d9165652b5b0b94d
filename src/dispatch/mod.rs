// src/dispatch/mod.rs

//! Choosing what runs next and where.
//!
//! - [`priority`] keeps ready tasks ranked by priority, age and arrival.
//! - [`matcher`] scores agents against a task's required capabilities.

pub mod matcher;
pub mod priority;

pub use matcher::{CapabilityMatcher, MatcherSettings};
pub use priority::{AgingPolicy, PopContext, PopOutcome, PriorityScheduler, RankKey};
