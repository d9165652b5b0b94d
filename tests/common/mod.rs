#![allow(dead_code)]

pub use taskweave_test_utils::builders;
pub use taskweave_test_utils::{Harness, init_tracing, with_timeout};

use taskweave::task::{StoredTask, Task, normalize_records};
use taskweave::types::{TaskId, TaskStatus};

pub fn tid(id: &str) -> TaskId {
    TaskId::new(id)
}

pub fn tids(ids: &[&str]) -> Vec<TaskId> {
    ids.iter().map(|id| TaskId::new(*id)).collect()
}

/// A standalone task record, built the same way persisted records are.
pub fn task_from(record: StoredTask) -> Task {
    normalize_records(vec![record])
        .expect("record should normalize")
        .pop()
        .expect("one task")
}

/// Status of `id` in the harness scheduler, panicking if it is unknown.
pub fn status_of(h: &Harness, id: &str) -> TaskStatus {
    h.scheduler
        .get_task(&tid(id))
        .unwrap_or_else(|| panic!("task {id} should exist"))
        .status()
}
