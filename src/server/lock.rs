//! Advisory lock serializing startup against one data directory.
//!
//! Two invocations that both see "no marker" would otherwise both start a
//! server. The lock is an OS file lock on the sibling file `<data_dir>.lock`,
//! which also records the owner's pid for diagnostics. It is held across data
//! directory initialization, port resolution and server startup. The OS drops
//! the lock when its owner dies, so a leftover file from a crashed run never
//! blocks anyone.

use std::ffi::OsString;
use std::fs::{File, OpenOptions, TryLockError};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::retry::{RetryConfig, retry_async};

/// Guard for the data directory lock; releases it on drop.
#[derive(Debug)]
pub struct DataDirLock {
    path: PathBuf,
    file: File,
}

/// Why a single acquisition attempt did not succeed.
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error("lock held by pid {0:?}")]
    Busy(Option<u32>),
    #[error(transparent)]
    Failed(#[from] Error),
}

impl DataDirLock {
    /// Path of the lock file guarding `data_dir`.
    pub fn lock_path(data_dir: &Path) -> PathBuf {
        let mut name = data_dir
            .file_name()
            .map_or_else(|| OsString::from("data"), OsString::from);
        name.push(".lock");
        data_dir.with_file_name(name)
    }

    /// Path of the held lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the lock, waiting up to `timeout` for another holder.
    pub async fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self> {
        let path = Self::lock_path(data_dir);
        let result = retry_async(
            RetryConfig::for_lock(timeout),
            || async { Self::try_acquire_at(&path) },
            |e| matches!(e, AttemptError::Busy(_)),
        )
        .await;

        match result {
            Ok(lock) => Ok(lock),
            Err(AttemptError::Busy(holder)) => Err(Error::LockTimeout { path, holder }),
            Err(AttemptError::Failed(e)) => Err(e),
        }
    }

    /// Try once to acquire the lock for `data_dir`.
    ///
    /// Returns `Ok(None)` when another holder has it.
    pub fn try_acquire(data_dir: &Path) -> Result<Option<Self>> {
        match Self::try_acquire_at(&Self::lock_path(data_dir)) {
            Ok(lock) => Ok(Some(lock)),
            Err(AttemptError::Busy(_)) => Ok(None),
            Err(AttemptError::Failed(e)) => Err(e),
        }
    }

    fn try_acquire_at(path: &Path) -> std::result::Result<Self, AttemptError> {
        let io_error = |e| Error::io(format!("locking {}", path.display()), e);

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("creating {}", parent.display()), e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(io_error)?;

        match file.try_lock() {
            Ok(()) => {},
            Err(TryLockError::WouldBlock) => return Err(AttemptError::Busy(read_holder(&mut file))),
            Err(TryLockError::Error(e)) => return Err(io_error(e).into()),
        }

        // A previous holder unlinks the file before unlocking it, so the
        // locked file may no longer be the one at `path`.
        if !is_current_file(&file, path) {
            debug!(lock = %path.display(), "lock file replaced while locking, retrying");
            return Err(AttemptError::Busy(None));
        }

        file.set_len(0).map_err(io_error)?;
        writeln!(file, "{}", std::process::id()).map_err(io_error)?;
        debug!(lock = %path.display(), "acquired data directory lock");
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }
}

fn read_holder(file: &mut File) -> Option<u32> {
    let mut contents = String::new();
    file.rewind().ok()?;
    file.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

/// Whether `file` is still the file found at `path`.
#[cfg(unix)]
fn is_current_file(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), std::fs::metadata(path)) {
        (Ok(held), Ok(current)) => held.dev() == current.dev() && held.ino() == current.ino(),
        _ => false,
    }
}

/// Whether `file` is still the file found at `path`.
#[cfg(not(unix))]
fn is_current_file(_file: &File, path: &Path) -> bool {
    path.exists()
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        // Unlink while still locked; the lock goes with the file handle.
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(lock = %self.path.display(), error = %e, "failed to remove lock file");
        }
        if let Err(e) = self.file.unlock() {
            debug!(lock = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}
