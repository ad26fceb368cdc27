//! Shared constants for devpg.
//!
//! Defaults that more than one module needs live here so the CLI, the
//! settings loader and the orchestrator agree on them.

use std::time::Duration;

/// Settings file looked up in the project root.
pub const CONFIG_FILE: &str = "devpg.toml";

/// Database created for seeding when no name is configured.
pub const DEFAULT_DATABASE: &str = "main";

/// Data directory (relative to the project root) used when neither the
/// settings nor `PGDATA` name one.
pub const DEFAULT_DATA_DIR: &str = ".devpg";

/// Superuser role created by `initdb`.
pub const SUPERUSER: &str = "postgres";

/// First port tried when allocating a port for a new server.
pub const DEFAULT_START_PORT: u16 = 8432;

/// Delay between readiness probes.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on waiting for a freshly spawned server to answer queries.
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 30;

/// Upper bound on waiting for another invocation to release the data
/// directory lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(60);

/// Liveness marker written by the postgres postmaster into its data directory.
pub const MARKER_FILE: &str = "postmaster.pid";

/// Environment variable holding the server port.
pub const PORT_ENV: &str = "PGPORT";

/// Environment variable holding the seeded database name.
pub const DATABASE_ENV: &str = "PGDATABASE";

/// Environment variable used as the default data directory.
pub const DATA_DIR_ENV: &str = "PGDATA";

/// Default command used to translate TypeScript seed scripts.
pub const DEFAULT_TRANSLATOR: &[&str] = &[
    "esbuild",
    "--loader=ts",
    "--format=cjs",
    "--log-level=error",
];
