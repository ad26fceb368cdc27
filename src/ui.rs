//! UI utilities for consistent terminal output formatting.
//!
//! Provides shared formatting functions for error messages and status output.

use crate::error::Error;

/// Width of error box separators.
const ERROR_BOX_WIDTH: usize = 60;

/// Print a success line.
pub fn success(message: &str) {
    println!("✓ {message}");
}

/// Print an error box with a title and optional detail.
///
/// Outputs:
/// ```text
/// ============================================================
/// Seeding failed
/// ============================================================
///
/// <detail>
/// ```
pub fn print_error_box(title: &str, detail: Option<&str>) {
    eprintln!("\n{}", "=".repeat(ERROR_BOX_WIDTH));
    eprintln!("{title}");
    eprintln!("{}", "=".repeat(ERROR_BOX_WIDTH));

    if let Some(detail) = detail
        && !detail.is_empty()
    {
        eprintln!("\n{detail}");
    }
}

/// Print an error box followed by troubleshooting hints.
pub fn print_error_box_with_hints(title: &str, detail: Option<&str>, hints: &[&str]) {
    print_error_box(title, detail);

    if !hints.is_empty() {
        eprintln!("\n{}", "=".repeat(ERROR_BOX_WIDTH));
        eprintln!("Common Issues:");
        eprintln!("{}", "=".repeat(ERROR_BOX_WIDTH));

        for (i, hint) in hints.iter().enumerate() {
            eprintln!("\n{}. {hint}", i + 1);
        }
        eprintln!();
    }
}

/// Title and hints for a provisioning error.
pub fn describe_error(error: &Error) -> (&'static str, &'static [&'static str]) {
    match error {
        Error::Bootstrap { .. } => (
            "Database bootstrap failed",
            &[
                "initdb or createuser not found: install PostgreSQL or set bin_dir in devpg.toml",
                "A half-initialized data directory is left behind: run `devpg wipe` and retry",
            ],
        ),
        Error::StartupFailure { .. } => (
            "Postgres failed to start",
            &[
                "postgres not found: install PostgreSQL or set bin_dir in devpg.toml",
                "Invalid server_config entry: check the server output above",
                "Slow machine: raise startup_timeout_secs in devpg.toml",
            ],
        ),
        Error::PortExhausted { .. } => ("No free port", &[]),
        Error::Seed { .. } => ("Seeding failed", &[]),
        Error::Compile { .. } => (
            "Seed script translation failed",
            &["TypeScript seeds need a translator: install esbuild or set translator in devpg.toml"],
        ),
        Error::LockTimeout { .. } => (
            "Data directory is busy",
            &["Another devpg command is starting this server; wait for it to finish"],
        ),
        _ => ("devpg failed", &[]),
    }
}
