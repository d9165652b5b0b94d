// tests/cli_and_logging.rs

use clap::Parser;
use tracing::level_filters::LevelFilter;

use taskweave::cli::{CliArgs, LogLevel};
use taskweave::logging::build_filter;

#[test]
fn cli_flag_beats_environment() {
    let filter = build_filter(Some(LogLevel::Debug), Some("error"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
}

#[test]
fn environment_directives_are_honoured() {
    let filter = build_filter(None, Some("warn"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

    let filter = build_filter(None, Some("info,taskweave::dispatch=trace"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
}

#[test]
fn missing_or_garbage_environment_falls_back_to_info() {
    for env in [None, Some(""), Some("   "), Some("taskweave=loudest")] {
        let filter = build_filter(None, env);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO), "env {env:?}");
    }
}

#[test]
fn cli_parses_simulation_flags() {
    let args = CliArgs::try_parse_from([
        "taskweave",
        "--config",
        "jobs.toml",
        "--log-level",
        "trace",
        "--work-ms",
        "5",
        "--fail",
        "build",
        "--fail",
        "deploy",
    ])
    .unwrap();

    assert_eq!(args.config.as_deref(), Some("jobs.toml"));
    assert!(matches!(args.log_level, Some(LogLevel::Trace)));
    assert_eq!(args.work_ms, 5);
    assert_eq!(args.fail, vec!["build".to_string(), "deploy".to_string()]);
    assert!(!args.dry_run);

    let args = CliArgs::try_parse_from(["taskweave", "--dry-run"]).unwrap();
    assert!(args.dry_run);
    assert_eq!(args.work_ms, 50);
    assert!(args.config.is_none());
}
