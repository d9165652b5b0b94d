pub mod builders;
pub mod fake_backend;

use std::sync::{Arc, Once};

use taskweave::agents::{Agent, InMemoryAgentDirectory};
use taskweave::clock::ManualClock;
use taskweave::dag::{Scheduler, SchedulerSettings};
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// A scheduler wired to handles the test keeps: the agent table and a clock
/// that only moves when advanced.
pub struct Harness {
    pub scheduler: Scheduler,
    pub agents: InMemoryAgentDirectory,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new(agents: impl IntoIterator<Item = Agent>) -> Self {
        Self::with_settings(agents, SchedulerSettings::default())
    }

    pub fn with_settings(
        agents: impl IntoIterator<Item = Agent>,
        settings: SchedulerSettings,
    ) -> Self {
        let clock = ManualClock::new();
        let directory = InMemoryAgentDirectory::with_agents(agents);
        let scheduler = Scheduler::new(
            settings,
            Arc::new(directory.clone()),
            Arc::new(clock.clone()),
        );
        Self {
            scheduler,
            agents: directory,
            clock,
        }
    }
}
