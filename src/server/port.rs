//! Port resolution for a data directory.
//!
//! Either a live server already owns the directory (recorded in its liveness
//! marker and answering queries), in which case its port is adopted, or a
//! free port is allocated for a new server.
//!
//! Stale markers are reclaimed by signalling the recorded pid and deleting the
//! file. The pid is not checked against the original postmaster, so a reused
//! pid may receive the signal.

use std::net::{Ipv4Addr, TcpListener};
use std::path::Path;

use tracing::{debug, info, warn};

use super::marker::{LivenessMarker, MarkerState};
use super::probe::{Attempts, ReadinessProbe, poll_ready};
use super::process;
use crate::error::{Error, Result};

/// Where the server for a data directory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortResolution {
    /// A live server owns the directory. It must never be stopped by us.
    Adopted { pid: u32, port: u16 },
    /// No live server; a new one should be started on `port`.
    Fresh { port: u16 },
}

impl PortResolution {
    pub const fn port(&self) -> u16 {
        match self {
            Self::Adopted { port, .. } | Self::Fresh { port } => *port,
        }
    }

    pub const fn pid(&self) -> Option<u32> {
        match self {
            Self::Adopted { pid, .. } => Some(*pid),
            Self::Fresh { .. } => None,
        }
    }
}

/// Resolve the port for `data_dir`, scanning for a free one from `start_port`.
pub async fn resolve_port(
    data_dir: &Path,
    probe: &dyn ReadinessProbe,
    start_port: u16,
) -> Result<PortResolution> {
    match LivenessMarker::read(data_dir) {
        MarkerState::Present(marker) => {
            if poll_ready(probe, marker.port, Attempts::Limited(1)).await {
                info!(pid = marker.pid, port = marker.port, "adopting running server");
                return Ok(PortResolution::Adopted {
                    pid: marker.pid,
                    port: marker.port,
                });
            }
            reclaim_stale_marker(data_dir, Some(marker));
        },
        MarkerState::Unreadable => reclaim_stale_marker(data_dir, None),
        MarkerState::Absent => {},
    }

    let port = find_free_port(start_port)?;
    debug!(port, "allocated port for new server");
    Ok(PortResolution::Fresh { port })
}

/// Signal the recorded process and delete the marker, ignoring failures:
/// the process is usually already gone.
fn reclaim_stale_marker(data_dir: &Path, marker: Option<LivenessMarker>) {
    warn!(
        data_dir = %data_dir.display(),
        pid = ?marker.map(|m| m.pid),
        port = ?marker.map(|m| m.port),
        "reclaiming stale liveness marker"
    );

    if let Some(marker) = marker
        && let Err(e) = process::terminate(marker.pid)
    {
        debug!(pid = marker.pid, error = %e, "stale server not signalled");
    }
    if let Err(e) = LivenessMarker::remove(data_dir) {
        debug!(error = %e, "stale marker not removed");
    }
}

/// First port at or above `start` that can be bound on the loopback
/// interface.
///
/// The port is released again before returning, so another process may
/// take it before the server binds it.
pub fn find_free_port(start: u16) -> Result<u16> {
    (start..=u16::MAX)
        .find(|&port| port != 0 && TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok())
        .ok_or(Error::PortExhausted { start })
}
