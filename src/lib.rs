// src/lib.rs

pub mod agents;
pub mod cli;
pub mod clock;
pub mod config;
pub mod dag;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod events;
pub mod exec;
pub mod logging;
pub mod task;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::agents::{AgentDirectory, InMemoryAgentDirectory};
use crate::cli::CliArgs;
use crate::clock::{Clock, SystemClock};
use crate::config::loader::{default_config_path, load_and_validate};
use crate::dag::{Scheduler, TaskStats};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::events::SchedulerEvent;
use crate::exec::SimulatedBackend;
use crate::task::TaskFilter;
use crate::types::{TaskId, TaskStatus};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the agent pool and the scheduler
/// - the runtime with the simulated agent backend
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let directory = InMemoryAgentDirectory::with_agents(cfg.agents(clock.now()));
    let agents: Arc<dyn AgentDirectory> = Arc::new(directory.clone());
    let scheduler = Scheduler::from_config(&cfg, agents, Arc::clone(&clock))?;

    if args.dry_run {
        print_dry_run(&scheduler);
        return Ok(());
    }

    let mut events = scheduler.subscribe();

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let backend = SimulatedBackend::new(directory, rt_tx.clone(), clock)
        .with_work_time(Duration::from_millis(args.work_ms))
        .with_failing(args.fail.iter().map(|t| TaskId::new(t.clone())));

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    info!(
        tasks = cfg.task.len(),
        agents = cfg.agent.len(),
        "starting simulation"
    );

    let options = RuntimeOptions {
        exit_when_idle: true,
    };

    // Construct the pure core runtime (single source of truth for semantics).
    let core = CoreRuntime::new(scheduler, options);

    // Construct the async IO shell around the core.
    let runtime = Runtime::new(core, rt_rx, backend)
        .with_auto_assign(cfg.scheduler.auto_assign_interval());
    let scheduler = runtime.run().await?;

    print_report(&scheduler, &mut events);
    Ok(())
}

/// Dry-run output: agents, tasks with their edges and readiness, stats.
fn print_dry_run(scheduler: &Scheduler) {
    println!("taskweave dry-run");
    println!("  max_retries = {}", scheduler.max_retries());
    println!();

    let agents = scheduler.agents();
    println!("agents ({}):", agents.len());
    for agent in &agents {
        let caps: Vec<_> = agent.capabilities.iter().collect();
        print!("  - {} [{:?}] capabilities: {:?}", agent.id, agent.status, caps);
        if let Some(ref spec) = agent.specialization {
            print!(" specialization: {spec}");
        }
        println!();
    }
    println!();

    let tasks = scheduler.get_tasks(&TaskFilter::default());
    println!("tasks ({}):", tasks.len());
    for task in tasks {
        println!(
            "  - {} \"{}\" ({}, {})",
            task.id(),
            task.title(),
            task.status(),
            task.priority()
        );
        if !task.depends_on().is_empty() {
            println!("      depends_on: {:?}", ids(task.depends_on()));
        }
        if !task.conflicts_with().is_empty() {
            println!("      conflicts_with: {:?}", ids(task.conflicts_with()));
        }
        if !task.blocked_by().is_empty() {
            println!("      blocked_by: {:?}", ids(task.blocked_by()));
        }
        if !task.required_capabilities().is_empty() {
            println!("      requires: {:?}", task.required_capabilities());
        }
        if let Some(agent) = task.requested_agent() {
            println!("      pinned to: {agent}");
        }
    }
    println!();

    println!("ready order: {:?}", ids(&scheduler.ready_order()));
    print_stats(&scheduler.get_task_stats());

    debug!("dry-run complete (no execution)");
}

fn print_report(scheduler: &Scheduler, events: &mut broadcast::Receiver<SchedulerEvent>) {
    println!("assignments:");
    loop {
        match events.try_recv() {
            Ok(SchedulerEvent::TaskAssigned { task, agent }) => println!("  {task} -> {agent}"),
            Ok(_) => {}
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                println!("  ... {skipped} events not shown");
            }
            Err(_) => break,
        }
    }
    println!();

    for status in [TaskStatus::Failed, TaskStatus::Ready, TaskStatus::Queued] {
        let tasks = scheduler.get_tasks(&TaskFilter::with_status(status));
        if tasks.is_empty() {
            continue;
        }
        println!("{status} ({}):", tasks.len());
        for task in tasks {
            match task.last_error() {
                Some(err) => println!("  - {} ({err})", task.id()),
                None => println!("  - {}", task.id()),
            }
        }
    }

    print_stats(&scheduler.get_task_stats());
}

fn print_stats(stats: &TaskStats) {
    println!("stats:");
    println!("  total: {}", stats.total);
    for (status, count) in &stats.by_status {
        println!("  {status}: {count}");
    }
    println!("  blocked: {}", stats.blocked);
    if !stats.unmatched.is_empty() {
        println!("  unmatched: {:?}", ids(&stats.unmatched));
    }
    println!("  idle agents: {}", stats.idle_agents);
    println!(
        "  assignments: {} (capacity misses: {}, unmatched misses: {})",
        stats.assignments, stats.capacity_misses, stats.unmatched_misses
    );
}

fn ids<'a>(ids: impl IntoIterator<Item = &'a TaskId>) -> Vec<&'a str> {
    ids.into_iter().map(TaskId::as_str).collect()
}
