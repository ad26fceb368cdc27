//! Readiness probing.
//!
//! A server is ready when it executes a trivial query. There is no health
//! endpoint: accepting TCP connections is not enough, since postgres accepts
//! connections during recovery and rejects queries.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::constants::{POLL_INTERVAL, SUPERUSER};
use crate::error::{Error, Result};
use crate::stdio::IoDisposition;
use crate::toolchain::{self, Toolchain};

/// Query used to probe readiness.
pub const PROBE_QUERY: &str = "SELECT version()";

/// A single readiness check against a port.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Returns `true` if the server on `port` answered a query.
    async fn probe(&self, port: u16) -> bool;
}

/// Probe that runs [`PROBE_QUERY`] through `psql` as the superuser.
#[derive(Debug, Clone, Default)]
pub struct PsqlProbe {
    toolchain: Toolchain,
}

impl PsqlProbe {
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }
}

#[async_trait]
impl ReadinessProbe for PsqlProbe {
    async fn probe(&self, port: u16) -> bool {
        let mut command = self.toolchain.psql(Some(SUPERUSER), SUPERUSER, port);
        command.args(["-c", PROBE_QUERY]);
        match toolchain::run_to_completion(command, &IoDisposition::Discard).await {
            Ok(()) => true,
            Err(e) => {
                trace!(port, error = %e, "probe failed");
                false
            },
        }
    }
}

/// How many probes to attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attempts {
    #[default]
    Unbounded,
    Limited(u32),
}

/// Probe `port` until it answers or the attempt budget runs out.
///
/// Waits [`POLL_INTERVAL`] between failed attempts while attempts remain.
pub async fn poll_ready(probe: &dyn ReadinessProbe, port: u16, attempts: Attempts) -> bool {
    let mut remaining = match attempts {
        Attempts::Limited(0) => return false,
        Attempts::Limited(n) => Some(n),
        Attempts::Unbounded => None,
    };

    loop {
        if probe.probe(port).await {
            return true;
        }
        if let Some(left) = remaining.as_mut() {
            *left -= 1;
            if *left == 0 {
                return false;
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Probe `port` until it answers, giving up after `timeout`.
///
/// `None` waits indefinitely.
pub async fn wait_ready(
    probe: &dyn ReadinessProbe,
    port: u16,
    timeout: Option<Duration>,
) -> Result<()> {
    let Some(timeout) = timeout else {
        poll_ready(probe, port, Attempts::Unbounded).await;
        return Ok(());
    };

    match tokio::time::timeout(timeout, poll_ready(probe, port, Attempts::Unbounded)).await {
        Ok(_) => {
            debug!(port, "server is ready");
            Ok(())
        },
        Err(_) => Err(Error::startup(
            port,
            format!("not ready after {}ms", timeout.as_millis()),
        )),
    }
}
