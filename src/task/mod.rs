// src/task/mod.rs

//! Task records.
//!
//! - [`model`] defines [`Task`] and the request types around it.
//! - [`registry`] is the owned id -> task map.
//! - [`normalize`] backfills persisted records at load time.

pub mod model;
pub mod normalize;
pub mod registry;

pub use model::{NewTask, RemoteTaskDescriptor, Task, TaskFilter, TaskUpdate};
pub use normalize::{StoredTask, normalize_records};
pub use registry::TaskRegistry;
