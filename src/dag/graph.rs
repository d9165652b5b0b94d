// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use crate::errors::{Result, TaskweaveError};
use crate::types::{TaskId, TaskStatus};

static NO_EDGES: BTreeSet<TaskId> = BTreeSet::new();

/// Read access to task statuses, so the graph can answer readiness questions
/// without owning (or retaining) the registry.
pub trait StatusLookup {
    fn status_of(&self, id: &TaskId) -> Option<TaskStatus>;
}

impl StatusLookup for HashMap<TaskId, TaskStatus> {
    fn status_of(&self, id: &TaskId) -> Option<TaskStatus> {
        self.get(id).copied()
    }
}

impl StatusLookup for BTreeMap<TaskId, TaskStatus> {
    fn status_of(&self, id: &TaskId) -> Option<TaskStatus> {
        self.get(id).copied()
    }
}

/// Internal node structure: immediate deps, dependents and conflicts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct DagNode {
    /// Tasks this one waits on.
    deps: BTreeSet<TaskId>,
    /// Tasks waiting on this one.
    dependents: BTreeSet<TaskId>,
    /// Tasks that may not be active at the same time as this one.
    conflicts: BTreeSet<TaskId>,
}

/// Mutable dependency DAG plus the symmetric conflict relation.
///
/// Acyclicity is enforced on every [`add_dependency`](Self::add_dependency);
/// the graph is never in a cyclic state, not even transiently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeMap<TaskId, DagNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. Returns `false` if it already existed.
    pub fn add_task(&mut self, id: &TaskId) -> bool {
        if self.nodes.contains_key(id) {
            return false;
        }
        self.nodes.insert(id.clone(), DagNode::default());
        true
    }

    /// Drop a node and every edge touching it.
    ///
    /// Returns the neighbours whose edge sets changed (former dependents,
    /// former dependencies and conflict partners), in id order.
    pub fn remove_task(&mut self, id: &TaskId) -> Vec<TaskId> {
        let Some(node) = self.nodes.remove(id) else {
            return Vec::new();
        };

        let mut touched = BTreeSet::new();
        for dep in &node.deps {
            if let Some(n) = self.nodes.get_mut(dep) {
                n.dependents.remove(id);
                touched.insert(dep.clone());
            }
        }
        for dependent in &node.dependents {
            if let Some(n) = self.nodes.get_mut(dependent) {
                n.deps.remove(id);
                touched.insert(dependent.clone());
            }
        }
        for other in &node.conflicts {
            if let Some(n) = self.nodes.get_mut(other) {
                n.conflicts.remove(id);
                touched.insert(other.clone());
            }
        }

        debug!(task = %id, neighbours = touched.len(), "removed task from graph");
        touched.into_iter().collect()
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskId> {
        self.nodes.keys()
    }

    /// Insert `task -> depends_on`.
    ///
    /// Fails with [`TaskweaveError::Cycle`] if `depends_on` already reaches
    /// `task` (or they are the same task). The graph is unchanged on error.
    pub fn add_dependency(&mut self, task: &TaskId, depends_on: &TaskId) -> Result<()> {
        self.ensure_known(task)?;
        self.ensure_known(depends_on)?;

        if task == depends_on || self.has_path(depends_on, task) {
            warn!(
                task = %task,
                depends_on = %depends_on,
                "rejecting dependency that would close a cycle"
            );
            return Err(TaskweaveError::Cycle {
                task: task.clone(),
                depends_on: depends_on.clone(),
            });
        }

        if let Some(n) = self.nodes.get_mut(task) {
            n.deps.insert(depends_on.clone());
        }
        if let Some(n) = self.nodes.get_mut(depends_on) {
            n.dependents.insert(task.clone());
        }
        debug!(task = %task, depends_on = %depends_on, "dependency added");
        Ok(())
    }

    /// Remove `task -> depends_on`. Returns whether the edge existed.
    pub fn remove_dependency(&mut self, task: &TaskId, depends_on: &TaskId) -> Result<bool> {
        self.ensure_known(task)?;
        self.ensure_known(depends_on)?;

        let removed = self
            .nodes
            .get_mut(task)
            .map(|n| n.deps.remove(depends_on))
            .unwrap_or(false);
        if let Some(n) = self.nodes.get_mut(depends_on) {
            n.dependents.remove(task);
        }
        Ok(removed)
    }

    /// Declare `a` and `b` mutually exclusive. Both directions are inserted.
    pub fn add_conflict(&mut self, a: &TaskId, b: &TaskId) -> Result<()> {
        if a == b {
            return Err(TaskweaveError::ConflictDeclaration(a.clone()));
        }
        self.ensure_known(a)?;
        self.ensure_known(b)?;

        if let Some(n) = self.nodes.get_mut(a) {
            n.conflicts.insert(b.clone());
        }
        if let Some(n) = self.nodes.get_mut(b) {
            n.conflicts.insert(a.clone());
        }
        debug!(a = %a, b = %b, "conflict declared");
        Ok(())
    }

    /// Remove the conflict between `a` and `b` in both directions.
    pub fn remove_conflict(&mut self, a: &TaskId, b: &TaskId) -> Result<bool> {
        self.ensure_known(a)?;
        self.ensure_known(b)?;

        let removed = self
            .nodes
            .get_mut(a)
            .map(|n| n.conflicts.remove(b))
            .unwrap_or(false);
        if let Some(n) = self.nodes.get_mut(b) {
            n.conflicts.remove(a);
        }
        Ok(removed)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, id: &TaskId) -> &BTreeSet<TaskId> {
        self.nodes.get(id).map(|n| &n.deps).unwrap_or(&NO_EDGES)
    }

    /// Immediate dependents of a task (tasks that list it in `depends_on`).
    pub fn dependents_of(&self, id: &TaskId) -> &BTreeSet<TaskId> {
        self.nodes.get(id).map(|n| &n.dependents).unwrap_or(&NO_EDGES)
    }

    pub fn conflicts_of(&self, id: &TaskId) -> &BTreeSet<TaskId> {
        self.nodes.get(id).map(|n| &n.conflicts).unwrap_or(&NO_EDGES)
    }

    /// Every task downstream of `id`, breadth first, excluding `id` itself.
    pub fn transitive_dependents_of(&self, id: &TaskId) -> Vec<TaskId> {
        let mut out = Vec::new();
        let mut seen: HashSet<&TaskId> = HashSet::new();
        let mut queue: VecDeque<&TaskId> = self.dependents_of(id).iter().collect();

        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next.clone());
            queue.extend(self.dependents_of(next).iter());
        }
        out
    }

    /// The tasks currently holding `id` back: unfinished dependencies plus
    /// conflicting tasks that are assigned or in progress.
    pub fn blockers_of(&self, id: &TaskId, statuses: &impl StatusLookup) -> BTreeSet<TaskId> {
        let mut blockers = BTreeSet::new();
        let Some(node) = self.nodes.get(id) else {
            return blockers;
        };

        for dep in &node.deps {
            match statuses.status_of(dep) {
                Some(TaskStatus::Completed) => {}
                Some(_) => {
                    blockers.insert(dep.clone());
                }
                None => {
                    warn!(task = %id, dep = %dep, "dependency missing from status lookup");
                    blockers.insert(dep.clone());
                }
            }
        }

        for other in &node.conflicts {
            if statuses.status_of(other).is_some_and(TaskStatus::is_active) {
                blockers.insert(other.clone());
            }
        }

        blockers
    }

    pub fn is_blocked(&self, id: &TaskId, statuses: &impl StatusLookup) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };

        let dep_pending = node
            .deps
            .iter()
            .any(|dep| statuses.status_of(dep) != Some(TaskStatus::Completed));
        if dep_pending {
            return true;
        }

        node.conflicts
            .iter()
            .any(|other| statuses.status_of(other).is_some_and(TaskStatus::is_active))
    }

    /// All `Queued` tasks that are not blocked, in id order.
    pub fn compute_ready_set(&self, statuses: &impl StatusLookup) -> Vec<TaskId> {
        self.nodes
            .keys()
            .filter(|id| statuses.status_of(id) == Some(TaskStatus::Queued))
            .filter(|id| !self.is_blocked(id, statuses))
            .cloned()
            .collect()
    }

    /// Whether `id` conflicts with any task that is currently active.
    pub fn has_active_conflict(&self, id: &TaskId, statuses: &impl StatusLookup) -> bool {
        self.conflicts_of(id)
            .iter()
            .any(|other| statuses.status_of(other).is_some_and(TaskStatus::is_active))
    }

    /// Full dependency edge set as `(task, depends_on)` pairs.
    pub fn edges(&self) -> BTreeSet<(TaskId, TaskId)> {
        self.nodes
            .iter()
            .flat_map(|(id, n)| n.deps.iter().map(move |d| (id.clone(), d.clone())))
            .collect()
    }

    /// Conflict pairs, each reported once with the smaller id first.
    pub fn conflict_pairs(&self) -> BTreeSet<(TaskId, TaskId)> {
        self.nodes
            .iter()
            .flat_map(|(id, n)| {
                n.conflicts
                    .iter()
                    .filter(move |other| id < *other)
                    .map(move |other| (id.clone(), other.clone()))
            })
            .collect()
    }

    fn ensure_known(&self, id: &TaskId) -> Result<()> {
        if self.nodes.contains_key(id) {
            Ok(())
        } else {
            Err(TaskweaveError::TaskNotFound(id.clone()))
        }
    }

    /// Depth-first search along dependency edges.
    fn has_path(&self, from: &TaskId, to: &TaskId) -> bool {
        let mut stack: Vec<&TaskId> = vec![from];
        let mut visited: HashSet<&TaskId> = HashSet::new();

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.extend(self.dependencies_of(current).iter());
        }
        false
    }
}
