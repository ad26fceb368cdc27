//! The postmaster liveness marker (`postmaster.pid`).
//!
//! PostgreSQL writes this file into its data directory on start and removes
//! it on clean shutdown. Line 1 holds the postmaster pid and line 4 the port.

use std::io;
use std::path::{Path, PathBuf};

use crate::constants::MARKER_FILE;

const PID_LINE: usize = 0;
const PORT_LINE: usize = 3;

/// Pid and port recorded by a (possibly dead) server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessMarker {
    pub pid: u32,
    pub port: u16,
}

/// Outcome of looking for a marker in a data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerState {
    /// No marker file: no server owns the directory.
    Absent,
    /// A marker file exists but does not follow the postmaster layout.
    Unreadable,
    /// A well-formed marker.
    Present(LivenessMarker),
}

impl LivenessMarker {
    /// Path of the marker inside `data_dir`.
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(MARKER_FILE)
    }

    /// Parse marker contents; `None` if either field is missing or invalid.
    pub fn parse(contents: &str) -> Option<Self> {
        let lines: Vec<&str> = contents.lines().collect();
        let pid = lines.get(PID_LINE)?.trim().parse().ok()?;
        let port = lines.get(PORT_LINE)?.trim().parse().ok()?;
        (port != 0).then_some(Self { pid, port })
    }

    /// Read the marker of `data_dir`.
    pub fn read(data_dir: &Path) -> MarkerState {
        match std::fs::read_to_string(Self::path(data_dir)) {
            Ok(contents) => {
                Self::parse(&contents).map_or(MarkerState::Unreadable, MarkerState::Present)
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => MarkerState::Absent,
            Err(_) => MarkerState::Unreadable,
        }
    }

    /// Delete the marker of `data_dir`.
    pub fn remove(data_dir: &Path) -> io::Result<()> {
        std::fs::remove_file(Self::path(data_dir))
    }
}
