// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** check references
/// or the dependency graph. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_str(&contents)
}

/// Parse TOML text into a `RawConfigFile`.
pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for unknown `depends_on` / `conflicts_with` references,
///   self-references, dependency cycles and agent/matcher sanity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    debug!(
        path = ?path.as_ref(),
        tasks = config.task.len(),
        agents = config.agent.len(),
        "configuration loaded"
    );
    Ok(config)
}

/// Default config location: `Taskweave.toml` in the current directory, unless
/// `TASKWEAVE_CONFIG` points elsewhere.
pub fn default_config_path() -> PathBuf {
    std::env::var_os("TASKWEAVE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("Taskweave.toml"))
}
