// tests/priority_scheduler.rs

mod common;
use crate::common::builders::{AgentBuilder, NewTaskBuilder};
use crate::common::{Harness, init_tracing, tid, tids};

use std::time::{Duration, Instant};

use taskweave::dispatch::{AgingPolicy, PriorityScheduler};
use taskweave::types::{AgentId, Priority};

fn policy() -> AgingPolicy {
    AgingPolicy {
        threshold: Duration::from_secs(300),
        interval: Duration::from_secs(60),
        max_bonus: 3,
    }
}

#[test]
fn aging_bonus_steps_and_caps() {
    let p = policy();
    assert_eq!(p.bonus(Duration::ZERO), 0);
    assert_eq!(p.bonus(Duration::from_secs(299)), 0);
    assert_eq!(p.bonus(Duration::from_secs(300)), 1);
    assert_eq!(p.bonus(Duration::from_secs(359)), 1);
    assert_eq!(p.bonus(Duration::from_secs(360)), 2);
    assert_eq!(p.bonus(Duration::from_secs(420)), 3);
    assert_eq!(p.bonus(Duration::from_secs(100_000)), 3);
}

#[test]
fn orders_by_priority_then_arrival() {
    let t0 = Instant::now();
    let mut queue = PriorityScheduler::new(policy());

    queue.enqueue(&tid("low"), Priority::Low.numeric(), t0);
    queue.enqueue(&tid("high"), Priority::High.numeric(), t0);
    queue.enqueue(&tid("medium"), Priority::Medium.numeric(), t0);
    queue.enqueue(&tid("high-2"), Priority::High.numeric(), t0);

    assert_eq!(queue.ordered(t0), tids(&["high", "high-2", "medium", "low"]));
    assert!(queue.rank_of(&tid("high"), t0) > queue.rank_of(&tid("high-2"), t0));
}

#[test]
fn enqueue_twice_is_a_no_op() {
    let t0 = Instant::now();
    let mut queue = PriorityScheduler::new(policy());
    assert!(queue.enqueue(&tid("a"), 2, t0));
    assert!(!queue.enqueue(&tid("a"), 2, t0));
    assert_eq!(queue.len(), 1);
}

#[test]
fn requeue_keeps_place_in_line_but_forget_does_not() {
    let t0 = Instant::now();
    let mut queue = PriorityScheduler::new(policy());
    queue.enqueue(&tid("first"), 2, t0);
    queue.enqueue(&tid("second"), 2, t0);

    assert!(queue.remove(&tid("first")));
    assert!(!queue.contains(&tid("first")));
    queue.enqueue(&tid("first"), 2, t0);
    assert_eq!(queue.ordered(t0), tids(&["first", "second"]));

    queue.forget(&tid("first"));
    queue.enqueue(&tid("first"), 2, t0);
    assert_eq!(queue.ordered(t0), tids(&["second", "first"]));
}

#[test]
fn reprioritize_changes_rank() {
    let t0 = Instant::now();
    let mut queue = PriorityScheduler::new(policy());
    queue.enqueue(&tid("a"), 1, t0);
    queue.enqueue(&tid("b"), 2, t0);
    assert_eq!(queue.ordered(t0), tids(&["b", "a"]));

    queue.reprioritize(&tid("a"), 4);
    assert_eq!(queue.ordered(t0), tids(&["a", "b"]));
}

#[test]
fn assignment_follows_high_medium_low() {
    init_tracing();
    let mut h = Harness::new(Vec::new());

    for (title, priority) in [
        ("low", Priority::Low),
        ("high", Priority::High),
        ("medium", Priority::Medium),
    ] {
        h.scheduler
            .add_task(NewTaskBuilder::new(title).id(title).priority(priority).build())
            .unwrap();
    }
    assert_eq!(h.scheduler.ready_order(), tids(&["high", "medium", "low"]));

    for id in ["a1", "a2", "a3"] {
        h.agents.upsert(AgentBuilder::new(id).build());
    }
    let step = h.scheduler.assign_ready();
    let order: Vec<_> = step.assignments.iter().map(|a| a.task.clone()).collect();
    assert_eq!(order, tids(&["high", "medium", "low"]));
}

#[test]
fn long_waiting_low_task_overtakes_fresh_high_task() {
    init_tracing();
    let mut h = Harness::new(Vec::new());

    h.scheduler
        .add_task(NewTaskBuilder::new("old").id("old").priority(Priority::Low).build())
        .unwrap();

    h.clock.advance(Duration::from_secs(301));
    h.scheduler
        .add_task(NewTaskBuilder::new("fresh").id("fresh").priority(Priority::High).build())
        .unwrap();

    // Low + 1 is still below High.
    assert_eq!(h.scheduler.ready_order(), tids(&["fresh", "old"]));

    h.clock.advance(Duration::from_secs(120));
    // Low + 3 now beats High + 0.
    assert_eq!(h.scheduler.ready_order(), tids(&["old", "fresh"]));

    h.agents.upsert(AgentBuilder::new("solo").build());
    assert!(h.scheduler.assign_next_task());
    assert_eq!(
        h.scheduler.get_task(&tid("old")).unwrap().assigned_agent_id(),
        Some(&AgentId::new("solo"))
    );
}
