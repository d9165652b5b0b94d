// src/dispatch/priority.rs

//! Ordered set of ready tasks with aging.
//!
//! Ordering, best first:
//! 1. effective priority = numeric priority + aging bonus (higher first)
//! 2. aging bonus (higher first)
//! 3. insertion sequence (lower first)
//!
//! A task keeps its sequence number and its first-ready time for as long as
//! it stays in the registry, so a task that is re-queued after a failure, or
//! briefly demoted by a conflict, does not lose its place in line.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::agents::Agent;
use crate::dag::graph::DependencyGraph;
use crate::dispatch::matcher::CapabilityMatcher;
use crate::task::TaskRegistry;
use crate::types::{AgentId, TaskId, TaskStatus};

/// How waiting time turns into extra priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgingPolicy {
    /// No bonus before a task has waited this long.
    pub threshold: Duration,
    /// One more bonus point per full interval past the threshold.
    pub interval: Duration,
    /// Upper bound on the bonus.
    pub max_bonus: u32,
}

impl AgingPolicy {
    pub fn bonus(&self, waited: Duration) -> u32 {
        if waited < self.threshold {
            return 0;
        }
        let over = waited - self.threshold;
        let interval = self.interval.as_nanos().max(1);
        let steps = (over.as_nanos() / interval).saturating_add(1);
        u32::try_from(steps).unwrap_or(u32::MAX).min(self.max_bonus)
    }
}

impl Default for AgingPolicy {
    fn default() -> Self {
        Self {
            threshold: Duration::from_secs(300),
            interval: Duration::from_secs(60),
            max_bonus: 3,
        }
    }
}

/// Sort key of a ready task at a given instant. `Greater` runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankKey {
    pub effective_priority: u32,
    pub aging_bonus: u32,
    pub sequence: u64,
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.effective_priority
            .cmp(&other.effective_priority)
            .then_with(|| self.aging_bonus.cmp(&other.aging_bonus))
            // earlier insertion wins for equal priority
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    sequence: u64,
    first_ready_at: Instant,
}

/// Borrowed state `pop_next_ready` consults. Nothing here is retained.
#[derive(Debug, Clone, Copy)]
pub struct PopContext<'a> {
    pub registry: &'a TaskRegistry,
    pub graph: &'a DependencyGraph,
    pub matcher: &'a CapabilityMatcher,
    pub now: Instant,
}

/// What a pop attempt found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopOutcome {
    /// The chosen pair, already removed from the ready set.
    pub selection: Option<(TaskId, AgentId)>,
    /// Ready tasks visited before the selection that no candidate could take.
    pub unmatched: Vec<TaskId>,
    /// Ready tasks visited before the selection that were skipped because a
    /// conflicting task is active.
    pub conflicted: Vec<TaskId>,
}

#[derive(Debug, Clone)]
pub struct PriorityScheduler {
    aging: AgingPolicy,
    /// Ready task -> numeric priority.
    ready: BTreeMap<TaskId, u32>,
    /// Fairness bookkeeping, kept across re-queues.
    slots: HashMap<TaskId, Slot>,
    next_sequence: u64,
}

impl PriorityScheduler {
    pub fn new(aging: AgingPolicy) -> Self {
        Self {
            aging,
            ready: BTreeMap::new(),
            slots: HashMap::new(),
            next_sequence: 0,
        }
    }

    pub fn aging(&self) -> AgingPolicy {
        self.aging
    }

    /// Add a task to the ready set. Returns `false` if it was already there.
    ///
    /// The first enqueue of a task fixes its sequence and first-ready time.
    pub fn enqueue(&mut self, id: &TaskId, numeric_priority: u32, now: Instant) -> bool {
        if !self.slots.contains_key(id) {
            self.next_sequence += 1;
            self.slots.insert(
                id.clone(),
                Slot {
                    sequence: self.next_sequence,
                    first_ready_at: now,
                },
            );
        }
        let inserted = self.ready.insert(id.clone(), numeric_priority).is_none();
        if inserted {
            trace!(task = %id, numeric_priority, "task entered ready set");
        }
        inserted
    }

    /// Take a task out of the ready set, keeping its place-in-line data.
    pub fn remove(&mut self, id: &TaskId) -> bool {
        self.ready.remove(id).is_some()
    }

    /// Drop every trace of a task (it left the registry or finished).
    pub fn forget(&mut self, id: &TaskId) {
        self.ready.remove(id);
        self.slots.remove(id);
    }

    /// Update the numeric priority of a ready task.
    pub fn reprioritize(&mut self, id: &TaskId, numeric_priority: u32) {
        if let Some(p) = self.ready.get_mut(id) {
            *p = numeric_priority;
        }
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.ready.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    pub fn rank_of(&self, id: &TaskId, now: Instant) -> Option<RankKey> {
        let numeric = *self.ready.get(id)?;
        let slot = self.slots.get(id)?;
        let bonus = self
            .aging
            .bonus(now.saturating_duration_since(slot.first_ready_at));
        Some(RankKey {
            effective_priority: numeric + bonus,
            aging_bonus: bonus,
            sequence: slot.sequence,
        })
    }

    /// Ready tasks, best first, as ranked at `now`.
    pub fn ordered(&self, now: Instant) -> Vec<TaskId> {
        let mut ranked: Vec<(RankKey, &TaskId)> = self
            .ready
            .keys()
            .filter_map(|id| self.rank_of(id, now).map(|key| (key, id)))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        ranked.into_iter().map(|(_, id)| id.clone()).collect()
    }

    /// Find the best ready task that some candidate agent can take.
    ///
    /// Tasks that conflict with an active task are skipped; tasks nobody
    /// qualifies for are reported as unmatched and left in place. Only the
    /// selected task is removed from the ready set.
    pub fn pop_next_ready(&mut self, candidates: &[Agent], ctx: &PopContext<'_>) -> PopOutcome {
        let mut outcome = PopOutcome::default();

        for id in self.ordered(ctx.now) {
            let Some(task) = ctx.registry.get(&id) else {
                continue;
            };
            if task.status() != TaskStatus::Ready {
                continue;
            }
            if ctx.graph.has_active_conflict(&id, ctx.registry) {
                trace!(task = %id, "skipping ready task with an active conflict");
                outcome.conflicted.push(id);
                continue;
            }

            match ctx.matcher.select_best_agent(task, candidates, ctx.now) {
                Some(agent) => {
                    debug!(task = %id, agent = %agent.id, "selected task and agent");
                    self.ready.remove(&id);
                    outcome.selection = Some((id, agent.id.clone()));
                    return outcome;
                }
                None => outcome.unmatched.push(id),
            }
        }

        outcome
    }
}

impl Default for PriorityScheduler {
    fn default() -> Self {
        Self::new(AgingPolicy::default())
    }
}
