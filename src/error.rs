//! Error types for server provisioning and seeding.
//!
//! Every failure the orchestrator can surface maps to one variant here.
//! Stale liveness markers and momentary "not ready" probes are recovered
//! locally and never show up as errors.

use std::path::PathBuf;

/// Result type for devpg operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Provisioning and seeding errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Data directory, role or database creation failed.
    #[error("failed to bootstrap {target}: {reason}")]
    Bootstrap { target: String, reason: String },

    /// Every port from the scan start up to 65535 is taken.
    #[error("no free port available (scanned {start}..=65535)")]
    PortExhausted { start: u16 },

    /// The server process could not be spawned, exited early, or never
    /// answered the readiness probe in time.
    #[error("server on port {port} failed to start: {reason}")]
    StartupFailure { port: u16, reason: String },

    /// A seed unit failed. Remaining units were not run.
    #[error("seed '{unit}' failed: {reason}")]
    Seed { unit: String, reason: String },

    /// An executable seed script could not be translated to JavaScript.
    #[error("failed to translate '{}': {reason}", path.display())]
    Compile { path: PathBuf, reason: String },

    /// Another invocation held the data directory lock for too long.
    #[error("timed out waiting for lock {} (held by pid {holder:?})", path.display())]
    LockTimeout { path: PathBuf, holder: Option<u32> },

    /// Invalid settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a bootstrap error.
    pub fn bootstrap(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::Bootstrap {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a startup failure.
    pub fn startup(port: u16, reason: impl ToString) -> Self {
        Self::StartupFailure {
            port,
            reason: reason.to_string(),
        }
    }

    /// Create a seed error.
    pub fn seed(unit: impl ToString, reason: impl ToString) -> Self {
        Self::Seed {
            unit: unit.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a compile error.
    pub fn compile(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Compile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
