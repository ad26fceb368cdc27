//! Resolution and invocation of the external PostgreSQL binaries.
//!
//! devpg never links against libpq; it drives `initdb`, `postgres`,
//! `createuser` and `psql` as child processes. A [`Toolchain`] knows where
//! those binaries live (an explicit `bin_dir`, or `PATH`).

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::debug;

use crate::stdio::IoDisposition;

/// Failure running an external command to completion.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The program could not be started at all.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully.
    #[error("`{program}` exited with {status}{}", format_stderr(.stderr))]
    Exit {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Location of the PostgreSQL client and server binaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toolchain {
    bin_dir: Option<PathBuf>,
}

impl Toolchain {
    /// Create a toolchain rooted at `bin_dir`, or resolved through `PATH`
    /// when `None`.
    pub fn new(bin_dir: Option<PathBuf>) -> Self {
        Self { bin_dir }
    }

    /// Directory the binaries are taken from, if not `PATH`.
    pub fn bin_dir(&self) -> Option<&Path> {
        self.bin_dir.as_deref()
    }

    /// Full path (or bare name for `PATH` lookup) of a binary.
    pub fn program(&self, name: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// `initdb -D <dir> -U <superuser>`
    pub fn initdb(&self, data_dir: &Path, superuser: &str) -> Command {
        let mut command = Command::new(self.program("initdb"));
        command.arg("-D").arg(data_dir).args(["-U", superuser]);
        command
    }

    /// `postgres -D <dir> -p <port> <flags...>`
    pub fn postgres(&self, data_dir: &Path, port: u16, flags: &[String]) -> Command {
        let mut command = Command::new(self.program("postgres"));
        command
            .arg("-D")
            .arg(data_dir)
            .args(["-p", &port.to_string()])
            .args(flags);
        command
    }

    /// `createuser -U <superuser> -p <port> -s <username>`
    pub fn createuser(&self, superuser: &str, port: u16, username: &str) -> Command {
        let mut command = Command::new(self.program("createuser"));
        command.args(["-U", superuser, "-p", &port.to_string(), "-s", username]);
        command
    }

    /// `psql [-U <user>] -d <database> -p <port>`; the caller appends
    /// `-c <sql>` or `-f <file>`.
    pub fn psql(&self, user: Option<&str>, database: &str, port: u16) -> Command {
        let mut command = Command::new(self.program("psql"));
        if let Some(user) = user {
            command.args(["-U", user]);
        }
        command.args(["-d", database, "-p", &port.to_string()]);
        command
    }
}

/// Run a command to completion with the given disposition.
///
/// With a callback disposition, all captured lines have been delivered
/// before this returns.
pub async fn run_to_completion(
    mut command: Command,
    stdio: &IoDisposition,
) -> Result<(), CommandError> {
    let program = program_name(&command);
    stdio.apply(&mut command);
    debug!(program = %program, "running command");

    let mut child = command.spawn().map_err(|source| CommandError::Spawn {
        program: program.clone(),
        source,
    })?;
    let readers = stdio.forward(&mut child);

    let status = child.wait().await.map_err(|source| CommandError::Spawn {
        program: program.clone(),
        source,
    })?;
    for reader in readers {
        let _ = reader.await;
    }

    check_status(program, status, String::new())
}

/// Run a command to completion and return its stdout.
///
/// Stderr is kept for the error message when the command fails.
pub async fn capture_output(mut command: Command) -> Result<String, CommandError> {
    let program = program_name(&command);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    debug!(program = %program, "running command (captured)");

    let output = command.output().await.map_err(|source| CommandError::Spawn {
        program: program.clone(),
        source,
    })?;
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    check_status(program, output.status, stderr)?;

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn check_status(program: String, status: ExitStatus, stderr: String) -> Result<(), CommandError> {
    if status.success() {
        Ok(())
    } else {
        Err(CommandError::Exit {
            program,
            status,
            stderr,
        })
    }
}

fn program_name(command: &Command) -> String {
    Path::new(command.as_std().get_program())
        .file_name()
        .map_or_else(
            || command.as_std().get_program().to_string_lossy().into_owned(),
            |name| name.to_string_lossy().into_owned(),
        )
}
