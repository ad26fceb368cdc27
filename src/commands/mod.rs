//! CLI command implementations for devpg.
//!
//! - [`init`] - Create the data directory, role and database without seeding
//! - [`seed`] - Run the configured (or given) seed scripts
//! - [`wipe`] - Remove the data directory
//! - [`up`] - Start or adopt the server and keep it running

pub mod init;
pub mod seed;
pub mod up;
pub mod wipe;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

use devpg::config::{DevSettings, Settings, find_project_root};
use devpg::flags::ConfigValue;

/// Server log level used by the CLI unless the settings choose one.
const CLI_LOG_MIN_MESSAGES: &str = "fatal";

/// Load, validate and resolve the settings of the project containing `dir`
/// (or the current directory).
pub fn load_settings(dir: Option<&Path>) -> Result<DevSettings> {
    let start = match dir {
        Some(dir) => std::path::absolute(dir)
            .with_context(|| format!("Invalid project directory: {}", dir.display()))?,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let root = find_project_root(&start);

    let settings = Settings::load(&root)?;
    let validation = settings.validate(&root)?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }

    let mut resolved = settings.resolve(&root)?;
    resolved
        .server_config
        .entry("log_min_messages".to_string())
        .or_insert_with(|| ConfigValue::from(CLI_LOG_MIN_MESSAGES));
    Ok(resolved)
}

/// Make a path given on the command line absolute against the current
/// directory.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Invalid path: {}", path.display()))
}
