//! I/O dispositions for spawned PostgreSQL processes.
//!
//! Every process devpg spawns (initdb, postgres, psql, createuser) takes one
//! of three dispositions: inherit the parent's streams, discard all output, or
//! hand each captured line to a callback.

use std::fmt;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Which stream a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Callback receiving captured output, one line at a time.
pub type OutputCallback = Arc<dyn Fn(OutputStream, &str) + Send + Sync>;

/// How a spawned process's stdout/stderr are handled.
#[derive(Clone, Default)]
pub enum IoDisposition {
    /// Share the parent's stdout and stderr.
    #[default]
    Inherit,
    /// Send all output to the null device.
    Discard,
    /// Capture output and forward it line by line.
    Callback(OutputCallback),
}

impl fmt::Debug for IoDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inherit => f.write_str("Inherit"),
            Self::Discard => f.write_str("Discard"),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl IoDisposition {
    /// Create a callback disposition from a closure.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(OutputStream, &str) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    /// Print stderr only; the equivalent of a "quiet" server.
    #[must_use]
    pub fn stderr_only() -> Self {
        Self::callback(|stream, line| {
            if stream == OutputStream::Stderr {
                eprintln!("{line}");
            }
        })
    }

    /// Configure the stdio of a command about to be spawned.
    ///
    /// Stdin is always closed: none of the PostgreSQL tools devpg drives
    /// read from it.
    pub(crate) fn apply(&self, command: &mut Command) {
        command.stdin(Stdio::null());
        match self {
            Self::Inherit => {
                command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            },
            Self::Discard => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            },
            Self::Callback(_) => {
                command.stdout(Stdio::piped()).stderr(Stdio::piped());
            },
        }
    }

    /// Start forwarding a spawned child's piped output to the callback.
    ///
    /// Returns the reader tasks so short-lived commands can wait for the
    /// last line before reporting completion. For the other dispositions
    /// nothing is piped and no task is started.
    pub(crate) fn forward(&self, child: &mut Child) -> Vec<JoinHandle<()>> {
        let Self::Callback(callback) = self else {
            return Vec::new();
        };

        let mut tasks = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            tasks.push(spawn_line_reader(stdout, OutputStream::Stdout, callback.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tasks.push(spawn_line_reader(stderr, OutputStream::Stderr, callback.clone()));
        }
        tasks
    }

    /// Emit a line produced in-process (e.g. `console.log` in a seed script).
    pub(crate) fn emit(&self, stream: OutputStream, line: &str) {
        match self {
            Self::Inherit => match stream {
                OutputStream::Stdout => println!("{line}"),
                OutputStream::Stderr => eprintln!("{line}"),
            },
            Self::Discard => {},
            Self::Callback(callback) => callback(stream, line),
        }
    }
}

fn spawn_line_reader<R>(reader: R, stream: OutputStream, callback: OutputCallback) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            callback(stream, &line);
        }
    })
}
