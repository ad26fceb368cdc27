//! Signalling and liveness checks for server processes.
//!
//! Pids come from files other processes wrote (the liveness marker and the
//! advisory lock), so they are checked before any signal is sent.

use std::io;

use sysinfo::{Pid, ProcessesToUpdate, System};

/// Checks if a process with the given PID is currently running.
///
/// Uses sysinfo to query the system's process table.
pub fn is_running(pid: u32) -> bool {
    let mut system = System::new();
    let target = Pid::from_u32(pid);
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);

    system.process(target).is_some()
}

/// Ask a server to shut down fast (SIGINT), as `pg_ctl stop -m fast` does.
pub fn interrupt(pid: u32) -> io::Result<()> {
    send(pid, Signal::Interrupt)
}

/// Ask a process to terminate (SIGTERM).
pub fn terminate(pid: u32) -> io::Result<()> {
    send(pid, Signal::Terminate)
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Interrupt,
    Terminate,
}

fn checked_pid(pid: u32) -> io::Result<i32> {
    match i32::try_from(pid) {
        Ok(raw) if raw > 0 && pid != std::process::id() => Ok(raw),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to signal pid {pid}"),
        )),
    }
}

#[cfg(unix)]
fn send(pid: u32, signal: Signal) -> io::Result<()> {
    use nix::sys::signal::{self, Signal as NixSignal};
    use nix::unistd::Pid as NixPid;

    let raw = checked_pid(pid)?;
    let signal = match signal {
        Signal::Interrupt => NixSignal::SIGINT,
        Signal::Terminate => NixSignal::SIGTERM,
    };
    signal::kill(NixPid::from_raw(raw), signal).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn send(pid: u32, _signal: Signal) -> io::Result<()> {
    checked_pid(pid)?;
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "signals are only supported on unix",
    ))
}
