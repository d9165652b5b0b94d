// tests/scheduler_facade.rs

mod common;
use crate::common::builders::{AgentBuilder, NewTaskBuilder};
use crate::common::{Harness, init_tracing, status_of, tid, tids};

use taskweave::dag::{AssignOutcome, RemoveMode, RequeuePolicy, SchedulerSettings};
use taskweave::errors::TaskweaveError;
use taskweave::task::{NewTask, RemoteTaskDescriptor, TaskFilter, TaskUpdate};
use taskweave::types::{AgentId, AgentStatus, Priority, TaskStatus};

fn rust_agent(id: &str) -> taskweave::agents::Agent {
    AgentBuilder::new(id).capability("rust").build()
}

/// Every Ready task is unblocked, and no conflicting pair is active at once.
fn assert_invariants(h: &Harness) {
    let tasks = h.scheduler.get_tasks(&TaskFilter::default());
    for task in &tasks {
        if task.status() == TaskStatus::Ready {
            assert!(!h.scheduler.is_blocked(task.id()), "{} ready but blocked", task.id());
        }
        assert_eq!(
            task.assigned_agent_id().is_some(),
            task.status().is_active(),
            "{} agent/status mismatch",
            task.id()
        );
        if task.status().is_active() {
            for other in task.conflicts_with() {
                let other = h.scheduler.get_task(other).unwrap();
                assert!(
                    !other.status().is_active(),
                    "{} and {} both active",
                    task.id(),
                    other.id()
                );
            }
        }
    }
    assert!(h.scheduler.compute_ready_set().is_empty());
}

#[test]
fn end_to_end_dependency_then_assignment() {
    init_tracing();
    let mut h = Harness::new(Vec::new());

    let a = h.scheduler.add_task(NewTaskBuilder::new("A").id("A").build()).unwrap();
    assert_eq!(a.status(), TaskStatus::Ready);

    let b = h
        .scheduler
        .add_task(NewTaskBuilder::new("B").id("B").after("A").requires("rust").build())
        .unwrap();
    assert_eq!(b.status(), TaskStatus::Queued);
    assert_eq!(b.blocked_by().iter().cloned().collect::<Vec<_>>(), tids(&["A"]));

    // Drive A through its lifecycle with an agent that cannot take B.
    h.agents.upsert(AgentBuilder::new("generalist").build());
    assert!(h.scheduler.assign_next_task());
    h.scheduler.start_task(&tid("A")).unwrap();
    let step = h.scheduler.complete_task(&tid("A")).unwrap();

    assert_eq!(step.newly_ready, tids(&["B"]));
    assert!(step.assignments.is_empty());
    assert_eq!(status_of(&h, "B"), TaskStatus::Ready);
    assert!(h.scheduler.get_task(&tid("B")).unwrap().blocked_by().is_empty());

    h.agents.upsert(rust_agent("rusty"));
    assert!(h.scheduler.assign_next_task());
    let b = h.scheduler.get_task(&tid("B")).unwrap();
    assert_eq!(b.status(), TaskStatus::Assigned);
    assert_eq!(b.assigned_agent_id(), Some(&AgentId::new("rusty")));
    assert_invariants(&h);
}

#[test]
fn unmatched_task_waits_until_a_qualifying_agent_is_idle() {
    init_tracing();
    let mut h = Harness::new(vec![AgentBuilder::new("py").capability("python").build()]);

    h.scheduler
        .add_task(NewTaskBuilder::new("needs rust").id("r").requires("rust").build())
        .unwrap();

    for _ in 0..3 {
        assert!(!h.scheduler.assign_next_task());
    }
    match h.scheduler.try_assign_next().unwrap() {
        AssignOutcome::Unmatched { tasks } => assert_eq!(tasks, tids(&["r"])),
        other => panic!("expected Unmatched, got {other:?}"),
    }
    assert_eq!(status_of(&h, "r"), TaskStatus::Ready);

    let stats = h.scheduler.get_task_stats();
    assert_eq!(stats.unmatched, tids(&["r"]));
    assert_eq!(stats.count(TaskStatus::Ready), 1);
    assert_eq!(stats.unmatched_misses, 4);

    // A qualifying agent exists but is busy: still waiting.
    h.agents.upsert(
        AgentBuilder::new("rusty")
            .capability("rust")
            .status(AgentStatus::Working)
            .build(),
    );
    assert!(!h.scheduler.assign_next_task());
    assert!(h.scheduler.get_task_stats().unmatched.is_empty());

    h.agents.upsert(rust_agent("rusty"));
    assert!(h.scheduler.assign_next_task());
    assert_eq!(status_of(&h, "r"), TaskStatus::Assigned);
}

#[test]
fn failed_assignment_attempt_changes_nothing() {
    init_tracing();
    let mut h = Harness::new(vec![AgentBuilder::new("py").capability("python").build()]);
    h.scheduler
        .add_task(NewTaskBuilder::new("x").id("x").requires("rust").priority(Priority::High).build())
        .unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("y").id("y").after("x").build()).unwrap();

    let before: Vec<_> = h
        .scheduler
        .get_tasks(&TaskFilter::default())
        .into_iter()
        .cloned()
        .collect();
    let order_before = h.scheduler.ready_order();

    assert!(!h.scheduler.assign_next_task());

    let after: Vec<_> = h
        .scheduler
        .get_tasks(&TaskFilter::default())
        .into_iter()
        .cloned()
        .collect();
    assert_eq!(before, after);
    assert_eq!(order_before, h.scheduler.ready_order());
}

#[test]
fn no_capacity_is_reported_not_raised() {
    let mut h = Harness::new(Vec::new());
    assert_eq!(h.scheduler.try_assign_next().unwrap(), AssignOutcome::NoReadyTasks);

    h.scheduler.add_task(NewTask::titled("t")).unwrap();
    assert_eq!(
        h.scheduler.try_assign_next().unwrap(),
        AssignOutcome::NoCapacity { ready: 1 }
    );
    assert_eq!(h.scheduler.get_task_stats().capacity_misses, 1);
}

#[test]
fn conflicting_tasks_never_run_together() {
    init_tracing();
    let mut h = Harness::new(vec![
        AgentBuilder::new("a1").build(),
        AgentBuilder::new("a2").build(),
    ]);

    h.scheduler.add_task(NewTaskBuilder::new("m1").id("m1").build()).unwrap();
    h.scheduler
        .add_task(NewTaskBuilder::new("m2").id("m2").conflicts_with("m1").build())
        .unwrap();

    let step = h.scheduler.assign_ready();
    assert_eq!(step.assignments.len(), 1);
    assert_eq!(step.assignments[0].task, tid("m1"));

    // m2 was pushed back to Queued while m1 is active.
    assert_eq!(status_of(&h, "m2"), TaskStatus::Queued);
    assert_eq!(
        h.scheduler.get_task(&tid("m2")).unwrap().blocked_by().iter().cloned().collect::<Vec<_>>(),
        tids(&["m1"])
    );
    assert_invariants(&h);

    h.scheduler.start_task(&tid("m1")).unwrap();
    assert_invariants(&h);

    let step = h.scheduler.complete_task(&tid("m1")).unwrap();
    assert_eq!(step.newly_ready, tids(&["m2"]));
    assert_eq!(step.assignments.len(), 1);
    assert_eq!(step.assignments[0].task, tid("m2"));
    assert_invariants(&h);
}

#[test]
fn conflict_with_completed_task_does_not_block() {
    let mut h = Harness::new(vec![AgentBuilder::new("a1").build()]);
    h.scheduler.add_task(NewTaskBuilder::new("done").id("done").build()).unwrap();
    assert!(h.scheduler.assign_next_task());
    h.scheduler.start_task(&tid("done")).unwrap();
    h.scheduler.complete_task(&tid("done")).unwrap();

    let t = h
        .scheduler
        .add_task(NewTaskBuilder::new("later").id("later").conflicts_with("done").build())
        .unwrap();
    assert_eq!(t.status(), TaskStatus::Ready);
}

#[test]
fn adding_a_conflict_demotes_a_ready_partner_of_an_active_task() {
    let mut h = Harness::new(vec![AgentBuilder::new("a1").build()]);
    h.scheduler.add_task(NewTaskBuilder::new("busy").id("busy").build()).unwrap();
    assert!(h.scheduler.assign_next_task());
    h.scheduler.add_task(NewTaskBuilder::new("waiting").id("waiting").build()).unwrap();
    assert_eq!(status_of(&h, "waiting"), TaskStatus::Ready);

    h.scheduler.add_conflict(&tid("busy"), &tid("waiting")).unwrap();
    assert_eq!(status_of(&h, "waiting"), TaskStatus::Queued);
    assert_invariants(&h);

    assert!(h.scheduler.remove_conflict(&tid("waiting"), &tid("busy")).unwrap());
    assert_eq!(status_of(&h, "waiting"), TaskStatus::Ready);
}

#[test]
fn self_conflict_is_rejected() {
    let mut h = Harness::new(Vec::new());
    h.scheduler.add_task(NewTaskBuilder::new("a").id("a").build()).unwrap();
    let err = h.scheduler.add_conflict(&tid("a"), &tid("a")).unwrap_err();
    assert!(matches!(err, TaskweaveError::ConflictDeclaration(_)));
}

#[test]
fn add_task_validation() {
    let mut h = Harness::new(Vec::new());

    let err = h.scheduler.add_task(NewTask::default()).unwrap_err();
    assert!(matches!(err, TaskweaveError::Validation(_)));

    let err = h.scheduler.add_task(NewTask::titled("   ")).unwrap_err();
    assert!(matches!(err, TaskweaveError::Validation(_)));

    let err = h
        .scheduler
        .add_task(NewTaskBuilder::new("orphan").after("ghost").build())
        .unwrap_err();
    assert!(matches!(err, TaskweaveError::Validation(msg) if msg.contains("ghost")));

    let err = h
        .scheduler
        .add_task(NewTaskBuilder::new("odd").conflicts_with("ghost").build())
        .unwrap_err();
    assert!(matches!(err, TaskweaveError::Validation(_)));

    assert!(h.scheduler.registry().is_empty());
}

#[test]
fn generated_ids_are_never_reused() {
    let mut h = Harness::new(Vec::new());
    let first = h.scheduler.add_task(NewTask::titled("one")).unwrap();
    assert_eq!(first.id(), &tid("task-1"));

    h.scheduler.remove_task(first.id(), RemoveMode::Normal).unwrap();
    let second = h.scheduler.add_task(NewTask::titled("two")).unwrap();
    assert_eq!(second.id(), &tid("task-2"));

    let err = h
        .scheduler
        .add_task(NewTaskBuilder::new("reuse").id("task-1").build())
        .unwrap_err();
    assert!(matches!(err, TaskweaveError::Validation(_)));

    // A caller-chosen id is skipped by the generator.
    h.scheduler
        .add_task(NewTaskBuilder::new("mine").id("task-3").build())
        .unwrap();
    let next = h.scheduler.add_task(NewTask::titled("three")).unwrap();
    assert_eq!(next.id(), &tid("task-4"));
}

#[test]
fn new_task_defaults() {
    let mut h = Harness::new(Vec::new());
    let task = h.scheduler.add_task(NewTask::titled("plain")).unwrap();

    assert_eq!(task.priority(), Priority::Medium);
    assert_eq!(task.numeric_priority(), 2);
    assert!(task.depends_on().is_empty());
    assert!(task.conflicts_with().is_empty());
    assert!(task.blocked_by().is_empty());
    assert!(task.tags().is_empty());
    assert!(task.required_capabilities().is_empty());
    assert_eq!(task.retry_count(), 0);
}

#[test]
fn remote_descriptor_is_defaulted_and_pinned() {
    init_tracing();
    let mut h = Harness::new(vec![
        AgentBuilder::new("alice").build(),
        AgentBuilder::new("bob").build(),
    ]);

    let remote = RemoteTaskDescriptor {
        id: Some(tid("remote-1")),
        title: Some("from the bus".to_string()),
        priority: Some(Priority::Critical),
        agent_id: Some(AgentId::new("bob")),
    };
    let task = h.scheduler.add_task(NewTask::from_remote(remote)).unwrap();
    assert_eq!(task.numeric_priority(), 4);
    assert_eq!(task.requested_agent(), Some(&AgentId::new("bob")));
    assert!(task.tags().is_empty());

    assert!(h.scheduler.assign_next_task());
    assert_eq!(
        h.scheduler.get_task(&tid("remote-1")).unwrap().assigned_agent_id(),
        Some(&AgentId::new("bob"))
    );
}

#[test]
fn dependency_cycle_through_facade_is_rejected_without_change() {
    let mut h = Harness::new(Vec::new());
    h.scheduler.add_task(NewTaskBuilder::new("a").id("a").build()).unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("b").id("b").after("a").build()).unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("c").id("c").after("b").build()).unwrap();

    let edges = h.scheduler.graph().edges();
    let err = h.scheduler.add_dependency(&tid("a"), &tid("c")).unwrap_err();
    assert!(matches!(err, TaskweaveError::Cycle { .. }));
    assert_eq!(h.scheduler.graph().edges(), edges);
    assert_eq!(status_of(&h, "a"), TaskStatus::Ready);
}

#[test]
fn adding_and_removing_dependencies_updates_readiness() {
    let mut h = Harness::new(Vec::new());
    h.scheduler.add_task(NewTaskBuilder::new("a").id("a").build()).unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("b").id("b").build()).unwrap();
    assert_eq!(status_of(&h, "b"), TaskStatus::Ready);

    h.scheduler.add_dependency(&tid("b"), &tid("a")).unwrap();
    assert_eq!(status_of(&h, "b"), TaskStatus::Queued);
    assert!(h.scheduler.get_task(&tid("b")).unwrap().depends_on().contains(&tid("a")));
    assert!(!h.scheduler.ready_order().contains(&tid("b")));

    assert!(h.scheduler.remove_dependency(&tid("b"), &tid("a")).unwrap());
    assert_eq!(status_of(&h, "b"), TaskStatus::Ready);
    assert!(h.scheduler.get_task(&tid("b")).unwrap().depends_on().is_empty());
}

#[test]
fn dependencies_cannot_be_added_to_assigned_tasks() {
    let mut h = Harness::new(vec![AgentBuilder::new("a1").build()]);
    h.scheduler.add_task(NewTaskBuilder::new("a").id("a").build()).unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("b").id("b").build()).unwrap();
    h.scheduler.assign_next_task();
    let assigned = h
        .scheduler
        .get_tasks(&TaskFilter::with_status(TaskStatus::Assigned))[0]
        .id()
        .clone();
    let other = if assigned == tid("a") { tid("b") } else { tid("a") };

    let err = h.scheduler.add_dependency(&assigned, &other).unwrap_err();
    assert!(matches!(err, TaskweaveError::Validation(_)));
}

#[test]
fn failure_requeues_then_fails_and_propagates() {
    init_tracing();
    let settings = SchedulerSettings {
        max_retries: 1,
        ..Default::default()
    };
    let mut h = Harness::with_settings(vec![AgentBuilder::new("a1").build()], settings);

    h.scheduler.add_task(NewTaskBuilder::new("root").id("root").build()).unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("mid").id("mid").after("root").build()).unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("leaf").id("leaf").after("mid").build()).unwrap();

    assert!(h.scheduler.assign_next_task());
    h.scheduler.start_task(&tid("root")).unwrap();

    let step = h.scheduler.fail_task(&tid("root"), "flaky").unwrap();
    assert_eq!(step.requeued, tids(&["root"]));
    // Re-queued, ready again and handed straight back to the free agent.
    assert_eq!(step.assignments.len(), 1);
    let root = h.scheduler.get_task(&tid("root")).unwrap();
    assert_eq!(root.status(), TaskStatus::Assigned);
    assert_eq!(root.retry_count(), 1);
    assert_eq!(root.last_error(), Some("flaky"));

    h.scheduler.start_task(&tid("root")).unwrap();
    let step = h.scheduler.fail_task(&tid("root"), "still flaky").unwrap();
    assert_eq!(step.newly_failed, tids(&["root", "mid", "leaf"]));
    for id in ["root", "mid", "leaf"] {
        assert_eq!(status_of(&h, id), TaskStatus::Failed);
    }
    assert!(
        h.scheduler
            .get_task(&tid("leaf"))
            .unwrap()
            .last_error()
            .unwrap()
            .contains("upstream")
    );
    assert_invariants(&h);
}

#[test]
fn escalating_requeue_raises_priority() {
    let mut h = Harness::new(vec![AgentBuilder::new("a1").build()]);
    h.scheduler
        .add_task(NewTaskBuilder::new("t").id("t").priority(Priority::Low).build())
        .unwrap();
    assert!(h.scheduler.assign_next_task());
    h.agents.mark_offline(&AgentId::new("a1"));

    h.scheduler
        .fail_task_with(&tid("t"), "retry harder", RequeuePolicy::Escalate)
        .unwrap();
    let t = h.scheduler.get_task(&tid("t")).unwrap();
    assert_eq!(t.priority(), Priority::Medium);
    assert_eq!(t.numeric_priority(), 2);
    assert_eq!(t.status(), TaskStatus::Ready);
}

#[test]
fn cancel_fails_pending_dependents() {
    let mut h = Harness::new(Vec::new());
    h.scheduler.add_task(NewTaskBuilder::new("a").id("a").build()).unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("b").id("b").after("a").build()).unwrap();

    let step = h.scheduler.cancel_task(&tid("a")).unwrap();
    assert_eq!(step.newly_failed, tids(&["b"]));
    assert_eq!(status_of(&h, "a"), TaskStatus::Cancelled);
    assert_eq!(status_of(&h, "b"), TaskStatus::Failed);

    let err = h.scheduler.cancel_task(&tid("a")).unwrap_err();
    assert!(matches!(err, TaskweaveError::InvalidTransition { .. }));
}

#[test]
fn in_progress_task_removal_needs_force() {
    init_tracing();
    let mut h = Harness::new(vec![AgentBuilder::new("a1").build()]);
    h.scheduler.add_task(NewTaskBuilder::new("a").id("a").build()).unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("b").id("b").after("a").build()).unwrap();
    assert!(h.scheduler.assign_next_task());
    h.scheduler.start_task(&tid("a")).unwrap();

    let err = h.scheduler.remove_task(&tid("a"), RemoveMode::Normal).unwrap_err();
    assert!(matches!(err, TaskweaveError::TaskInProgress(_)));
    assert_eq!(status_of(&h, "a"), TaskStatus::InProgress);

    let removed = h.scheduler.remove_task(&tid("a"), RemoveMode::Force).unwrap();
    assert_eq!(removed.status(), TaskStatus::Cancelled);
    assert!(h.scheduler.get_task(&tid("a")).is_none());
    assert!(!h.scheduler.graph().contains(&tid("a")));
    // b was downstream of a cancelled task.
    assert_eq!(status_of(&h, "b"), TaskStatus::Failed);
}

#[test]
fn removing_a_dependency_task_unblocks_dependents() {
    let mut h = Harness::new(Vec::new());
    h.scheduler.add_task(NewTaskBuilder::new("a").id("a").build()).unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("b").id("b").after("a").build()).unwrap();
    assert_eq!(status_of(&h, "b"), TaskStatus::Queued);

    h.scheduler.remove_task(&tid("a"), RemoveMode::Normal).unwrap();
    assert_eq!(status_of(&h, "b"), TaskStatus::Ready);
    assert!(h.scheduler.get_task(&tid("b")).unwrap().depends_on().is_empty());

    let err = h.scheduler.remove_task(&tid("a"), RemoveMode::Normal).unwrap_err();
    assert!(matches!(err, TaskweaveError::TaskNotFound(_)));
}

#[test]
fn update_task_edits_fields_but_not_status() {
    let mut h = Harness::new(Vec::new());
    h.scheduler.add_task(NewTaskBuilder::new("low").id("low").priority(Priority::Low).build()).unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("mid").id("mid").build()).unwrap();
    assert_eq!(h.scheduler.ready_order(), tids(&["mid", "low"]));

    let updated = h
        .scheduler
        .update_task(
            &tid("low"),
            TaskUpdate {
                title: Some("urgent now".to_string()),
                priority: Some(Priority::Critical),
                tags: Some(vec!["ops".to_string()]),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.title(), "urgent now");
    assert_eq!(updated.numeric_priority(), 4);
    assert_eq!(updated.status(), TaskStatus::Ready);
    assert_eq!(h.scheduler.ready_order(), tids(&["low", "mid"]));

    let tagged = h.scheduler.get_tasks(&TaskFilter {
        tag: Some("ops".to_string()),
        ..Default::default()
    });
    assert_eq!(tagged.len(), 1);

    let err = h
        .scheduler
        .update_task(
            &tid("low"),
            TaskUpdate {
                title: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, TaskweaveError::Validation(_)));
}

#[test]
fn stats_count_every_status() {
    let mut h = Harness::new(vec![AgentBuilder::new("a1").build()]);
    h.scheduler.add_task(NewTaskBuilder::new("a").id("a").build()).unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("b").id("b").after("a").build()).unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("c").id("c").build()).unwrap();
    h.scheduler.assign_next_task();

    let stats = h.scheduler.get_task_stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_status.len(), TaskStatus::ALL.len());
    assert_eq!(stats.count(TaskStatus::Assigned), 1);
    assert_eq!(stats.count(TaskStatus::Ready), 1);
    assert_eq!(stats.count(TaskStatus::Queued), 1);
    assert_eq!(stats.count(TaskStatus::Completed), 0);
    assert_eq!(stats.blocked, 1);
    assert_eq!(stats.assignments, 1);
    assert_eq!(stats.idle_agents, 0);
}

#[test]
fn late_edges_onto_a_dead_task_fail_the_dependent() {
    let settings = SchedulerSettings {
        max_retries: 0,
        ..Default::default()
    };
    let mut h = Harness::with_settings(vec![AgentBuilder::new("a1").build()], settings);
    h.scheduler.add_task(NewTaskBuilder::new("a").id("a").build()).unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("gone").id("gone").build()).unwrap();
    h.scheduler.cancel_task(&tid("gone")).unwrap();
    assert!(h.scheduler.assign_next_task());
    h.scheduler.start_task(&tid("a")).unwrap();
    h.scheduler.fail_task(&tid("a"), "boom").unwrap();
    assert_eq!(status_of(&h, "a"), TaskStatus::Failed);

    let b = h
        .scheduler
        .add_task(NewTaskBuilder::new("b").id("b").after("a").build())
        .unwrap();
    assert_eq!(b.status(), TaskStatus::Failed);
    assert!(b.last_error().unwrap().contains("'a' failed"));

    h.scheduler.add_task(NewTaskBuilder::new("c").id("c").build()).unwrap();
    h.scheduler.add_task(NewTaskBuilder::new("d").id("d").after("c").build()).unwrap();
    h.scheduler.add_dependency(&tid("c"), &tid("gone")).unwrap();
    assert_eq!(status_of(&h, "c"), TaskStatus::Failed);
    assert!(
        h.scheduler
            .get_task(&tid("c"))
            .unwrap()
            .last_error()
            .unwrap()
            .contains("cancelled")
    );
    // Transitively stranded as well.
    assert_eq!(status_of(&h, "d"), TaskStatus::Failed);

    assert_eq!(h.scheduler.pending_count(), 0);
    assert!(h.scheduler.ready_order().is_empty());
    assert_invariants(&h);
}

#[test]
fn failure_reports_need_a_task_an_agent_holds() {
    let mut h = Harness::new(Vec::new());
    h.scheduler.add_task(NewTaskBuilder::new("ready").id("ready").build()).unwrap();
    h.scheduler
        .add_task(NewTaskBuilder::new("queued").id("queued").after("ready").build())
        .unwrap();

    for (id, from) in [("ready", TaskStatus::Ready), ("queued", TaskStatus::Queued)] {
        let err = h.scheduler.fail_task(&tid(id), "not yours").unwrap_err();
        assert!(
            matches!(err, TaskweaveError::InvalidTransition { from: f, .. } if f == from),
            "{id}: {err:?}"
        );
        let task = h.scheduler.get_task(&tid(id)).unwrap();
        assert_eq!(task.status(), from);
        assert_eq!(task.retry_count(), 0);
        assert_eq!(task.last_error(), None);
    }
    assert_eq!(h.scheduler.ready_order(), tids(&["ready"]));
}
