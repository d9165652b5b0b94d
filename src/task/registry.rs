// src/task/registry.rs

//! Owned task registry. One instance per scheduler; there is no global state.

use std::collections::{BTreeMap, HashSet};

use crate::dag::graph::StatusLookup;
use crate::task::model::Task;
use crate::types::{TaskId, TaskStatus};

#[derive(Debug, Default, Clone)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskId, Task>,
    /// Every id ever handed out or accepted, including removed tasks.
    issued: HashSet<TaskId>,
    next_seq: u64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next unused generated id (`task-<n>`).
    pub fn next_id(&mut self) -> TaskId {
        loop {
            self.next_seq += 1;
            let id = TaskId::new(format!("task-{}", self.next_seq));
            if !self.issued.contains(&id) {
                return id;
            }
        }
    }

    /// Whether `id` was ever used, even by a task that has since been removed.
    pub fn was_issued(&self, id: &TaskId) -> bool {
        self.issued.contains(id)
    }

    pub fn insert(&mut self, task: Task) {
        self.issued.insert(task.id.clone());
        self.tasks.insert(task.id.clone(), task);
    }

    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        self.tasks.remove(id)
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Tasks in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl StatusLookup for TaskRegistry {
    fn status_of(&self, id: &TaskId) -> Option<TaskStatus> {
        self.tasks.get(id).map(|t| t.status)
    }
}
