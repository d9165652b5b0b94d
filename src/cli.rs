// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskweave`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskweave",
    version,
    about = "Schedule prioritized, dependent tasks across a pool of agents.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `TASKWEAVE_CONFIG`, else `Taskweave.toml` in the current
    /// working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKWEAVE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print tasks, readiness and stats, but don't run the
    /// simulation.
    #[arg(long)]
    pub dry_run: bool,

    /// How long each simulated agent works on a task, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 50)]
    pub work_ms: u64,

    /// Make every attempt of this task fail in the simulation. Repeatable.
    #[arg(long = "fail", value_name = "TASK")]
    pub fail: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
