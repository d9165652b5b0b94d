// src/dag/scheduler.rs

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::agents::{Agent, AgentDirectory};
use crate::clock::Clock;
use crate::config::model::ConfigFile;
use crate::dag::graph::DependencyGraph;
use crate::dag::scheduler_step::{AssignOutcome, Assignment, SchedulerStep};
use crate::dag::state_machine::{Applied, GuardContext, TaskStateMachine, Transition};
use crate::dag::stats::TaskStats;
use crate::dispatch::{AgingPolicy, CapabilityMatcher, MatcherSettings, PopContext, PriorityScheduler};
use crate::errors::{Result, TaskweaveError};
use crate::events::{EventBus, SchedulerEvent};
use crate::task::{
    NewTask, StoredTask, Task, TaskFilter, TaskRegistry, TaskUpdate, normalize_records,
};
use crate::types::{AgentId, AgentStatus, TaskId, TaskStatus};

/// What happens to a failed task that still has retries left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequeuePolicy {
    /// Re-queue with the same priority and the same place in line.
    #[default]
    Preserve,
    /// Re-queue one priority level higher.
    Escalate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RemoveMode {
    /// Refuse to remove a task that is in progress.
    #[default]
    Normal,
    /// Cancel an in-progress task first, then remove it.
    Force,
}

/// Tunables for a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerSettings {
    pub max_retries: u32,
    pub aging: AgingPolicy,
    pub matcher: MatcherSettings,
    pub event_capacity: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            aging: AgingPolicy::default(),
            matcher: MatcherSettings::default(),
            event_capacity: 256,
        }
    }
}

impl From<&ConfigFile> for SchedulerSettings {
    fn from(cfg: &ConfigFile) -> Self {
        Self {
            max_retries: cfg.scheduler.max_retries,
            aging: cfg.scheduler.aging_policy(),
            matcher: cfg.matcher.settings(),
            event_capacity: cfg.scheduler.event_capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    assignments: u64,
    capacity_misses: u64,
    unmatched_misses: u64,
}

/// Single entry point for task management.
///
/// Owns the task registry, the dependency graph and the ready set, and is
/// responsible for:
/// - validating and registering new tasks
/// - keeping `Ready` equivalent to "queued and not blocked"
/// - pairing ready tasks with idle agents
/// - applying agent signals (start / complete / fail) through the state machine
/// - propagating terminal failures to downstream tasks
/// - publishing a [`SchedulerEvent`] after every committed change
///
/// All mutation goes through `&mut self`; there is exactly one writer.
#[derive(Debug)]
pub struct Scheduler {
    registry: TaskRegistry,
    graph: DependencyGraph,
    queue: PriorityScheduler,
    matcher: CapabilityMatcher,
    machine: TaskStateMachine,
    agents: Arc<dyn AgentDirectory>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    counters: Counters,
}

impl Scheduler {
    pub fn new(
        settings: SchedulerSettings,
        agents: Arc<dyn AgentDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry: TaskRegistry::new(),
            graph: DependencyGraph::new(),
            queue: PriorityScheduler::new(settings.aging),
            matcher: CapabilityMatcher::new(settings.matcher),
            machine: TaskStateMachine::new(settings.max_retries),
            agents,
            clock,
            events: EventBus::new(settings.event_capacity),
            counters: Counters::default(),
        }
    }

    /// Construct a scheduler from a validated [`ConfigFile`], restoring the
    /// tasks it lists.
    pub fn from_config(
        cfg: &ConfigFile,
        agents: Arc<dyn AgentDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut scheduler = Self::new(SchedulerSettings::from(cfg), agents, clock);
        scheduler.restore_records(cfg.stored_tasks())?;
        Ok(scheduler)
    }

    /// Normalize persisted records and register them. See [`Self::restore`].
    pub fn restore_records(&mut self, records: Vec<StoredTask>) -> Result<()> {
        let tasks = normalize_records(records)?;
        self.restore(tasks)
    }

    /// Register already-normalized tasks, keeping their stored status.
    ///
    /// Edges are re-validated while the graph is rebuilt. Either every task is
    /// restored or, on error, nothing is.
    pub fn restore(&mut self, tasks: Vec<Task>) -> Result<()> {
        let mut registry = self.registry.clone();
        let mut graph = self.graph.clone();

        for task in &tasks {
            if registry.was_issued(&task.id) {
                return Err(TaskweaveError::Validation(format!(
                    "task id '{}' is already in use",
                    task.id
                )));
            }
            graph.add_task(&task.id);
            registry.insert(task.clone());
        }

        for task in &tasks {
            for dep in &task.depends_on {
                graph
                    .add_dependency(&task.id, dep)
                    .map_err(|err| unknown_reference(err, &task.id, "depends on"))?;
            }
            for other in &task.conflicts_with {
                graph
                    .add_conflict(&task.id, other)
                    .map_err(|err| unknown_reference(err, &task.id, "conflicts with"))?;
            }
        }

        for task in &tasks {
            if !task.status.is_active() {
                continue;
            }
            let active_partner = graph
                .conflicts_of(&task.id)
                .iter()
                .find(|other| registry.get(other).is_some_and(|t| t.status.is_active()));
            if let Some(other) = active_partner {
                return Err(TaskweaveError::Validation(format!(
                    "conflicting tasks '{}' and '{other}' are both active",
                    task.id
                )));
            }
        }

        self.registry = registry;
        self.graph = graph;
        info!(restored = tasks.len(), "restored stored tasks");

        self.refresh_readiness()?;
        Ok(())
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SchedulerEvent> {
        self.events.subscribe()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn max_retries(&self) -> u32 {
        self.machine.max_retries()
    }

    /// Current agent snapshot from the directory.
    pub fn agents(&self) -> Vec<Agent> {
        self.agents.list_agents()
    }

    /// Validate and register a new task.
    ///
    /// Emits `TaskCreated`, then `TaskReady` or `TaskBlocked`.
    pub fn add_task(&mut self, spec: NewTask) -> Result<Task> {
        let title = spec.title.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() {
            return Err(TaskweaveError::Validation(
                "task title is required".to_string(),
            ));
        }
        let title = title.to_string();

        for dep in &spec.depends_on {
            if !self.registry.contains(dep) {
                return Err(TaskweaveError::Validation(format!(
                    "unknown dependency '{dep}'"
                )));
            }
        }
        for other in &spec.conflicts_with {
            if !self.registry.contains(other) {
                return Err(TaskweaveError::Validation(format!(
                    "unknown conflicting task '{other}'"
                )));
            }
        }

        let id = match spec.id.clone() {
            Some(id) if id.as_str().trim().is_empty() => {
                return Err(TaskweaveError::Validation(
                    "task id must not be empty".to_string(),
                ));
            }
            Some(id) if self.registry.was_issued(&id) => {
                return Err(TaskweaveError::Validation(format!(
                    "task id '{id}' is already in use"
                )));
            }
            Some(id) => id,
            None => self.registry.next_id(),
        };

        let task = Task::new(id.clone(), title, &spec);
        let priority = task.priority();
        self.registry.insert(task);
        self.graph.add_task(&id);

        if let Err(err) = self.attach_edges(&id, &spec) {
            self.graph.remove_task(&id);
            self.registry.remove(&id);
            return Err(err);
        }

        info!(task = %id, priority = %priority, "task created");
        self.events.emit(SchedulerEvent::TaskCreated {
            task: id.clone(),
            priority,
        });

        self.refresh_readiness()?;

        let task = self
            .registry
            .get(&id)
            .cloned()
            .ok_or_else(|| TaskweaveError::TaskNotFound(id.clone()))?;
        if task.status == TaskStatus::Queued {
            debug!(task = %id, blocked_by = ?task.blocked_by, "new task is blocked");
            self.events.emit(SchedulerEvent::TaskBlocked {
                task: id,
                blocked_by: task.blocked_by.iter().cloned().collect(),
            });
        }
        Ok(task)
    }

    /// Try to hand the best ready task to the best idle agent.
    ///
    /// Returns `true` if an assignment was made. When nothing can be
    /// assigned, the registry is left exactly as it was.
    pub fn assign_next_task(&mut self) -> bool {
        match self.try_assign_next() {
            Ok(outcome) => outcome.is_assigned(),
            Err(err) => {
                error!(error = %err, "assignment attempt failed");
                false
            }
        }
    }

    /// Like [`Self::assign_next_task`], but says why nothing was assigned.
    pub fn try_assign_next(&mut self) -> Result<AssignOutcome> {
        if self.queue.is_empty() {
            return Ok(AssignOutcome::NoReadyTasks);
        }

        let candidates = self.idle_candidates();
        if candidates.is_empty() {
            self.counters.capacity_misses += 1;
            debug!(ready = self.queue.len(), "ready tasks waiting for an idle agent");
            return Ok(AssignOutcome::NoCapacity {
                ready: self.queue.len(),
            });
        }

        let now = self.clock.now();
        let outcome = self.queue.pop_next_ready(
            &candidates,
            &PopContext {
                registry: &self.registry,
                graph: &self.graph,
                matcher: &self.matcher,
                now,
            },
        );

        let Some((task_id, agent_id)) = outcome.selection else {
            if !outcome.unmatched.is_empty() {
                self.counters.unmatched_misses += 1;
                debug!(
                    unmatched = outcome.unmatched.len(),
                    idle_agents = candidates.len(),
                    "no idle agent qualifies for any ready task"
                );
            }
            return Ok(AssignOutcome::Unmatched {
                tasks: outcome.unmatched,
            });
        };

        let agent = candidates.iter().find(|a| a.id == agent_id);
        let assign = Transition::Assign {
            agent: agent_id.clone(),
        };
        if let Err(err) = self.apply(&task_id, assign, agent) {
            // Put it back; the ready set must keep matching the registry.
            if let Some(task) = self.registry.get(&task_id) {
                self.queue.enqueue(&task_id, task.numeric_priority, now);
            }
            return Err(err);
        }

        let assignment = self
            .registry
            .get(&task_id)
            .map(|task| Assignment::from_task(task, agent_id.clone()))
            .ok_or_else(|| TaskweaveError::TaskNotFound(task_id.clone()))?;
        self.counters.assignments += 1;

        info!(task = %task_id, agent = %agent_id, "task assigned");
        self.events.emit(SchedulerEvent::TaskAssigned {
            task: task_id,
            agent: agent_id,
        });

        // Conflict partners of the now-active task may have to leave Ready.
        self.refresh_readiness()?;
        Ok(AssignOutcome::Assigned(assignment))
    }

    /// Assign until no further pairing is possible.
    pub fn assign_ready(&mut self) -> SchedulerStep {
        SchedulerStep {
            assignments: self.drain_assignments(),
            ..Default::default()
        }
    }

    /// Agent confirmed it picked the task up: Assigned -> InProgress.
    pub fn start_task(&mut self, id: &TaskId) -> Result<()> {
        self.apply(id, Transition::Start, None)?;

        if let Some(agent) = self
            .registry
            .get(id)
            .and_then(|task| task.assigned_agent_id.clone())
        {
            info!(task = %id, agent = %agent, "task started");
            self.events.emit(SchedulerEvent::TaskStarted {
                task: id.clone(),
                agent,
            });
        }
        Ok(())
    }

    /// Agent reported success. Dependents whose last blocker this was become
    /// ready, and freed capacity is used straight away.
    pub fn complete_task(&mut self, id: &TaskId) -> Result<SchedulerStep> {
        self.apply(id, Transition::Complete, None)?;
        self.queue.forget(id);

        info!(task = %id, "task completed");
        self.events
            .emit(SchedulerEvent::TaskCompleted { task: id.clone() });

        let newly_ready = self.refresh_readiness()?;
        let assignments = self.drain_assignments();
        Ok(SchedulerStep {
            assignments,
            newly_ready,
            ..Default::default()
        })
    }

    /// Agent reported failure. Retries keep the task's priority.
    pub fn fail_task(&mut self, id: &TaskId, reason: impl Into<String>) -> Result<SchedulerStep> {
        self.fail_task_with(id, reason, RequeuePolicy::Preserve)
    }

    /// Agent reported failure.
    ///
    /// Only assigned or in-progress tasks can be failed this way. While
    /// retries remain the task goes back to `Queued`. Otherwise it becomes
    /// `Failed` and every downstream task that has not started yet fails
    /// with it.
    pub fn fail_task_with(
        &mut self,
        id: &TaskId,
        reason: impl Into<String>,
        policy: RequeuePolicy,
    ) -> Result<SchedulerStep> {
        let reason = reason.into();
        let status = self.status_of(id)?;
        if !status.is_active() {
            warn!(task = %id, from = %status, "rejected failure report for a task no agent holds");
            return Err(TaskweaveError::InvalidTransition {
                task: id.clone(),
                from: status,
                transition: Transition::Fail {
                    reason,
                    allow_retry: true,
                },
            });
        }

        let applied = self.apply(
            id,
            Transition::Fail {
                reason: reason.clone(),
                allow_retry: true,
            },
            None,
        )?;
        self.queue.remove(id);

        let mut step = SchedulerStep::default();
        let retry_count = self.registry.get(id).map_or(0, |t| t.retry_count);

        if applied.requeued {
            if policy == RequeuePolicy::Escalate {
                if let Some(task) = self.registry.get_mut(id) {
                    let escalated = task.priority.escalated();
                    task.set_priority(escalated);
                    debug!(task = %id, priority = %escalated, "escalated priority for retry");
                }
            }
            warn!(
                task = %id,
                retry_count,
                max_retries = self.machine.max_retries(),
                reason = %reason,
                "task failed; re-queued for retry"
            );
            self.events.emit(SchedulerEvent::TaskFailed {
                task: id.clone(),
                reason,
                requeued: true,
                retry_count,
            });
            step.requeued.push(id.clone());
        } else {
            error!(task = %id, retry_count, reason = %reason, "task failed permanently");
            self.queue.forget(id);
            self.events.emit(SchedulerEvent::TaskFailed {
                task: id.clone(),
                reason,
                requeued: false,
                retry_count,
            });
            step.newly_failed.push(id.clone());
            let upstream = upstream_reason(id, TaskStatus::Failed);
            step.newly_failed
                .extend(self.fail_downstream(id, &upstream)?);
        }

        step.newly_ready = self.refresh_readiness()?;
        step.assignments = self.drain_assignments();
        Ok(step)
    }

    /// Cancel a non-terminal task. Cancellation is logical: the agent is not
    /// interrupted. Downstream tasks that have not started fail.
    pub fn cancel_task(&mut self, id: &TaskId) -> Result<SchedulerStep> {
        let newly_failed = self.cancel_internal(id)?;
        let newly_ready = self.refresh_readiness()?;
        let assignments = self.drain_assignments();
        Ok(SchedulerStep {
            assignments,
            newly_ready,
            newly_failed,
            requeued: Vec::new(),
        })
    }

    /// Remove a task and every edge touching it.
    ///
    /// Tasks that depended on it simply lose that dependency.
    pub fn remove_task(&mut self, id: &TaskId, mode: RemoveMode) -> Result<Task> {
        let status = self.status_of(id)?;
        if status == TaskStatus::InProgress {
            match mode {
                RemoveMode::Normal => {
                    warn!(task = %id, "refusing to remove a task in progress");
                    return Err(TaskweaveError::TaskInProgress(id.clone()));
                }
                RemoveMode::Force => {
                    self.cancel_internal(id)?;
                }
            }
        }

        self.queue.forget(id);
        let neighbours = self.graph.remove_task(id);
        let removed = self
            .registry
            .remove(id)
            .ok_or_else(|| TaskweaveError::TaskNotFound(id.clone()))?;

        info!(task = %id, neighbours = neighbours.len(), "task removed");
        self.events
            .emit(SchedulerEvent::TaskRemoved { task: id.clone() });

        self.refresh_readiness()?;
        Ok(removed)
    }

    /// Make `task` wait for `depends_on`.
    ///
    /// Only tasks that have not been handed out yet can gain dependencies.
    /// A cycle is rejected and leaves the graph untouched.
    pub fn add_dependency(&mut self, task: &TaskId, depends_on: &TaskId) -> Result<()> {
        let status = self.status_of(task)?;
        self.status_of(depends_on)?;
        if !matches!(status, TaskStatus::Queued | TaskStatus::Ready) {
            return Err(TaskweaveError::Validation(format!(
                "cannot add a dependency to task '{task}' while it is {status}"
            )));
        }

        self.graph.add_dependency(task, depends_on)?;
        self.refresh_readiness()?;
        Ok(())
    }

    /// Returns whether the edge existed.
    pub fn remove_dependency(&mut self, task: &TaskId, depends_on: &TaskId) -> Result<bool> {
        let removed = self.graph.remove_dependency(task, depends_on)?;
        if removed {
            debug!(task = %task, depends_on = %depends_on, "dependency removed");
            self.refresh_readiness()?;
        }
        Ok(removed)
    }

    /// Declare two tasks mutually exclusive.
    pub fn add_conflict(&mut self, a: &TaskId, b: &TaskId) -> Result<()> {
        if a == b {
            return Err(TaskweaveError::ConflictDeclaration(a.clone()));
        }
        let status_a = self.status_of(a)?;
        let status_b = self.status_of(b)?;
        if status_a.is_active() && status_b.is_active() {
            return Err(TaskweaveError::Validation(format!(
                "tasks '{a}' and '{b}' are both active and cannot be made conflicting"
            )));
        }

        self.graph.add_conflict(a, b)?;
        self.refresh_readiness()?;
        Ok(())
    }

    /// Returns whether the conflict existed.
    pub fn remove_conflict(&mut self, a: &TaskId, b: &TaskId) -> Result<bool> {
        let removed = self.graph.remove_conflict(a, b)?;
        if removed {
            debug!(a = %a, b = %b, "conflict removed");
            self.refresh_readiness()?;
        }
        Ok(removed)
    }

    /// Edit descriptive fields. Status is never changed here.
    pub fn update_task(&mut self, id: &TaskId, update: TaskUpdate) -> Result<Task> {
        if let Some(ref title) = update.title {
            if title.trim().is_empty() {
                return Err(TaskweaveError::Validation(
                    "task title must not be empty".to_string(),
                ));
            }
        }

        let task = self
            .registry
            .get_mut(id)
            .ok_or_else(|| TaskweaveError::TaskNotFound(id.clone()))?;

        if let Some(title) = update.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            task.description = description;
        }
        if let Some(tags) = update.tags {
            task.tags = tags.into_iter().collect();
        }
        if let Some(caps) = update.required_capabilities {
            task.required_capabilities = caps.into_iter().collect();
        }
        if let Some(priority) = update.priority {
            task.set_priority(priority);
            self.queue.reprioritize(id, task.numeric_priority);
        }

        debug!(task = %id, "task updated");
        Ok(task.clone())
    }

    pub fn get_task(&self, id: &TaskId) -> Option<&Task> {
        self.registry.get(id)
    }

    /// Tasks matching `filter`, in id order.
    pub fn get_tasks(&self, filter: &TaskFilter) -> Vec<&Task> {
        self.registry.iter().filter(|t| filter.matches(t)).collect()
    }

    pub fn get_task_stats(&self) -> TaskStats {
        let mut by_status: BTreeMap<TaskStatus, usize> =
            TaskStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut blocked = 0;
        for task in self.registry.iter() {
            *by_status.entry(task.status).or_default() += 1;
            if task.status == TaskStatus::Queued && !task.blocked_by.is_empty() {
                blocked += 1;
            }
        }

        let online: Vec<Agent> = self
            .agents
            .list_agents()
            .into_iter()
            .filter(|a| a.status != AgentStatus::Offline)
            .collect();
        let unmatched = self
            .registry
            .iter()
            .filter(|t| t.status == TaskStatus::Ready)
            .filter(|t| !online.iter().any(|a| CapabilityMatcher::qualifies(t, a)))
            .map(|t| t.id.clone())
            .collect();

        TaskStats {
            total: self.registry.len(),
            by_status,
            blocked,
            unmatched,
            idle_agents: self.idle_candidates().len(),
            assignments: self.counters.assignments,
            capacity_misses: self.counters.capacity_misses,
            unmatched_misses: self.counters.unmatched_misses,
        }
    }

    /// Ready tasks, best first, as they would be considered right now.
    pub fn ready_order(&self) -> Vec<TaskId> {
        self.queue.ordered(self.clock.now())
    }

    /// Queued tasks that nothing blocks. Always empty between operations,
    /// since such tasks are promoted immediately.
    pub fn compute_ready_set(&self) -> Vec<TaskId> {
        self.graph.compute_ready_set(&self.registry)
    }

    pub fn is_blocked(&self, id: &TaskId) -> bool {
        self.graph.is_blocked(id, &self.registry)
    }

    /// Number of tasks currently assigned or in progress.
    pub fn active_count(&self) -> usize {
        self.registry.iter().filter(|t| t.status.is_active()).count()
    }

    /// Number of tasks not yet in a terminal status.
    pub fn pending_count(&self) -> usize {
        self.registry
            .iter()
            .filter(|t| !t.status.is_terminal())
            .count()
    }

    fn attach_edges(&mut self, id: &TaskId, spec: &NewTask) -> Result<()> {
        for dep in &spec.depends_on {
            self.graph.add_dependency(id, dep)?;
        }
        for other in &spec.conflicts_with {
            self.graph.add_conflict(id, other)?;
        }
        Ok(())
    }

    fn status_of(&self, id: &TaskId) -> Result<TaskStatus> {
        self.registry
            .get(id)
            .map(|t| t.status)
            .ok_or_else(|| TaskweaveError::TaskNotFound(id.clone()))
    }

    /// Run `transition` through the state machine with fresh guard facts.
    fn apply(
        &mut self,
        id: &TaskId,
        transition: Transition,
        agent: Option<&Agent>,
    ) -> Result<Applied> {
        let blocked = self.graph.is_blocked(id, &self.registry);
        let task = self
            .registry
            .get_mut(id)
            .ok_or_else(|| TaskweaveError::TaskNotFound(id.clone()))?;
        self.machine
            .apply(task, transition, &GuardContext { blocked, agent })
    }

    /// Idle agents that do not already hold an active task.
    fn idle_candidates(&self) -> Vec<Agent> {
        let busy: HashSet<&AgentId> = self
            .registry
            .iter()
            .filter(|t| t.status.is_active())
            .filter_map(|t| t.assigned_agent_id.as_ref())
            .collect();

        self.agents
            .list_agents()
            .into_iter()
            .filter(|a| a.is_idle() && !busy.contains(&a.id))
            .collect()
    }

    fn drain_assignments(&mut self) -> Vec<Assignment> {
        let mut assignments = Vec::new();
        loop {
            match self.try_assign_next() {
                Ok(AssignOutcome::Assigned(assignment)) => assignments.push(assignment),
                Ok(_) => break,
                Err(err) => {
                    error!(error = %err, "assignment attempt failed");
                    break;
                }
            }
        }
        assignments
    }

    fn cancel_internal(&mut self, id: &TaskId) -> Result<Vec<TaskId>> {
        self.apply(id, Transition::Cancel, None)?;
        self.queue.forget(id);

        info!(task = %id, "task cancelled");
        self.events
            .emit(SchedulerEvent::TaskCancelled { task: id.clone() });

        let upstream = upstream_reason(id, TaskStatus::Cancelled);
        self.fail_downstream(id, &upstream)
    }

    /// Fail every downstream task of `root` that has not been handed out.
    fn fail_downstream(&mut self, root: &TaskId, reason: &str) -> Result<Vec<TaskId>> {
        let mut failed = Vec::new();

        for id in self.graph.transitive_dependents_of(root) {
            let pending = self
                .registry
                .get(&id)
                .is_some_and(|t| matches!(t.status, TaskStatus::Queued | TaskStatus::Ready));
            if !pending {
                continue;
            }
            self.fail_for_upstream(&id, root, reason)?;
            failed.push(id);
        }

        Ok(failed)
    }

    /// Fail pending tasks that depend on a task already `Failed` or
    /// `Cancelled`. Such an edge can appear after the upstream failure, when
    /// a task or dependency is added or records are restored.
    fn fail_stranded(&mut self) -> Result<Vec<TaskId>> {
        let mut failed = Vec::new();
        loop {
            let stranded: Vec<(TaskId, TaskId, TaskStatus)> = self
                .registry
                .iter()
                .filter(|t| matches!(t.status, TaskStatus::Queued | TaskStatus::Ready))
                .filter_map(|t| {
                    self.graph.dependencies_of(&t.id).iter().find_map(|dep| {
                        self.registry
                            .get(dep)
                            .filter(|d| matches!(d.status, TaskStatus::Failed | TaskStatus::Cancelled))
                            .map(|d| (t.id.clone(), dep.clone(), d.status))
                    })
                })
                .collect();
            if stranded.is_empty() {
                return Ok(failed);
            }

            for (id, dep, dep_status) in stranded {
                self.fail_for_upstream(&id, &dep, &upstream_reason(&dep, dep_status))?;
                failed.push(id);
            }
        }
    }

    fn fail_for_upstream(&mut self, id: &TaskId, root: &TaskId, reason: &str) -> Result<()> {
        self.apply(
            id,
            Transition::Fail {
                reason: reason.to_string(),
                allow_retry: false,
            },
            None,
        )?;
        self.queue.forget(id);

        let retry_count = self.registry.get(id).map_or(0, |t| t.retry_count);
        warn!(task = %id, upstream = %root, "failing task whose dependency can no longer complete");
        self.events.emit(SchedulerEvent::TaskFailed {
            task: id.clone(),
            reason: reason.to_string(),
            requeued: false,
            retry_count,
        });
        Ok(())
    }

    /// Re-derive every task's cached edges and `blocked_by`, then promote
    /// and demote so that `Ready` means exactly "queued and not blocked".
    ///
    /// Returns the tasks promoted by this pass.
    fn refresh_readiness(&mut self) -> Result<Vec<TaskId>> {
        let stranded = self.fail_stranded()?;
        if !stranded.is_empty() {
            debug!(failed = ?stranded, "failed tasks behind a dead dependency");
        }

        let now = self.clock.now();
        let mut promote = Vec::new();
        let mut demote = Vec::new();
        let mut requeue = Vec::new();

        for id in self.registry.ids() {
            let blockers = self.graph.blockers_of(&id, &self.registry);
            let depends_on = self.graph.dependencies_of(&id).clone();
            let conflicts_with = self.graph.conflicts_of(&id).clone();
            let Some(task) = self.registry.get_mut(&id) else {
                continue;
            };

            task.depends_on = depends_on;
            task.conflicts_with = conflicts_with;
            let blocked = !blockers.is_empty();
            task.blocked_by = blockers;

            match (task.status, blocked) {
                (TaskStatus::Queued, false) => promote.push(id),
                (TaskStatus::Ready, true) => demote.push(id),
                // Restored as Ready but not yet in the ready set.
                (TaskStatus::Ready, false) if !self.queue.contains(&id) => {
                    requeue.push((id, task.numeric_priority))
                }
                _ => {}
            }
        }

        for id in demote {
            self.apply(&id, Transition::Demote, None)?;
            self.queue.remove(&id);
            let blocked_by: Vec<TaskId> = self
                .registry
                .get(&id)
                .map(|t| t.blocked_by.iter().cloned().collect())
                .unwrap_or_default();
            debug!(task = %id, blocked_by = ?blocked_by, "ready task is blocked again");
            self.events
                .emit(SchedulerEvent::TaskBlocked { task: id, blocked_by });
        }

        for (id, numeric_priority) in requeue {
            self.queue.enqueue(&id, numeric_priority, now);
        }

        let mut newly_ready = Vec::with_capacity(promote.len());
        for id in promote {
            self.apply(&id, Transition::Promote, None)?;
            let numeric_priority = self.registry.get(&id).map_or(0, |t| t.numeric_priority);
            self.queue.enqueue(&id, numeric_priority, now);
            debug!(task = %id, "task is ready");
            self.events
                .emit(SchedulerEvent::TaskReady { task: id.clone() });
            newly_ready.push(id);
        }

        Ok(newly_ready)
    }
}

fn upstream_reason(upstream: &TaskId, status: TaskStatus) -> String {
    match status {
        TaskStatus::Cancelled => format!("upstream task '{upstream}' was cancelled"),
        _ => format!("upstream task '{upstream}' failed"),
    }
}

/// Turn a graph lookup failure during restore into a readable validation
/// error; cycles and conflict misdeclarations pass through.
fn unknown_reference(err: TaskweaveError, task: &TaskId, relation: &str) -> TaskweaveError {
    match err {
        TaskweaveError::TaskNotFound(missing) => TaskweaveError::Validation(format!(
            "task '{task}' {relation} unknown task '{missing}'"
        )),
        other => other,
    }
}
