//! Data directory bootstrap and default role/database creation.

use std::path::Path;

use tracing::{debug, info};

use crate::constants::SUPERUSER;
use crate::error::{Error, Result};
use crate::stdio::IoDisposition;
use crate::toolchain::{self, Toolchain};

/// Ensure `data_dir` exists, running `initdb` when it does not.
///
/// Returns `true` when the directory was created by this call and `false`
/// when it already existed. A failing `initdb` is fatal and not retried.
pub async fn init_data_dir(
    toolchain: &Toolchain,
    data_dir: &Path,
    stdio: &IoDisposition,
) -> Result<bool> {
    if data_dir.exists() {
        debug!(data_dir = %data_dir.display(), "data directory already initialized");
        return Ok(false);
    }

    info!(data_dir = %data_dir.display(), "initializing data directory");
    let command = toolchain.initdb(data_dir, SUPERUSER);
    toolchain::run_to_completion(command, stdio)
        .await
        .map_err(|e| Error::bootstrap(format!("data directory {}", data_dir.display()), e))?;

    Ok(true)
}

/// Create a superuser role named after `username`.
///
/// The `postgres` role already exists after `initdb`, so nothing is done
/// when the invoking user has that name.
pub async fn create_super_user(
    toolchain: &Toolchain,
    username: &str,
    port: u16,
    stdio: &IoDisposition,
) -> Result<()> {
    if username == SUPERUSER {
        debug!("invoking user is the bootstrap superuser, skipping createuser");
        return Ok(());
    }

    info!(role = %username, port, "creating superuser role");
    let command = toolchain.createuser(SUPERUSER, port, username);
    toolchain::run_to_completion(command, stdio)
        .await
        .map_err(|e| Error::bootstrap(format!("role {username}"), e))
}

/// Create the database seed scripts run against.
pub async fn create_database(
    toolchain: &Toolchain,
    name: &str,
    port: u16,
    stdio: &IoDisposition,
) -> Result<()> {
    info!(database = %name, port, "creating database");
    let mut command = toolchain.psql(Some(SUPERUSER), SUPERUSER, port);
    command.args(["-c", &format!("CREATE DATABASE {name}")]);
    toolchain::run_to_completion(command, stdio)
        .await
        .map_err(|e| Error::bootstrap(format!("database {name}"), e))
}

/// Remove a data directory and everything in it.
///
/// A directory that does not exist is not an error.
pub async fn remove_data_dir(data_dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(data_dir).await {
        Ok(()) => {
            info!(data_dir = %data_dir.display(), "removed data directory");
            Ok(())
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(
            format!("removing {}", data_dir.display()),
            e,
        )),
    }
}

/// Name of the operating-system user running devpg.
#[cfg(unix)]
pub fn current_username() -> Result<String> {
    use nix::unistd::{Uid, User};

    match User::from_uid(Uid::current()) {
        Ok(Some(user)) => Ok(user.name),
        _ => username_from_env(),
    }
}

/// Name of the operating-system user running devpg.
#[cfg(not(unix))]
pub fn current_username() -> Result<String> {
    username_from_env()
}

fn username_from_env() -> Result<String> {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .ok_or_else(|| Error::Config("cannot determine the current user name".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_existing_dir_is_not_reinitialized() {
        let temp_dir = TempDir::new().unwrap();
        // A bin_dir without initdb: spawning it would fail, so success proves
        // it was never invoked.
        let toolchain = Toolchain::new(Some(temp_dir.path().join("no-bin")));

        let created = init_data_dir(&toolchain, temp_dir.path(), &IoDisposition::Discard)
            .await
            .unwrap();
        assert!(!created);
    }

    #[tokio::test]
    async fn test_missing_initdb_is_bootstrap_error() {
        let temp_dir = TempDir::new().unwrap();
        let toolchain = Toolchain::new(Some(temp_dir.path().join("no-bin")));
        let data_dir = temp_dir.path().join("data");

        let err = init_data_dir(&toolchain, &data_dir, &IoDisposition::Discard)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Bootstrap { .. }));
    }

    #[tokio::test]
    async fn test_create_super_user_skips_postgres() {
        let temp_dir = TempDir::new().unwrap();
        let toolchain = Toolchain::new(Some(temp_dir.path().join("no-bin")));

        create_super_user(&toolchain, SUPERUSER, 8432, &IoDisposition::Discard)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_remove_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");
        std::fs::create_dir_all(data_dir.join("base")).unwrap();
        std::fs::write(data_dir.join("PG_VERSION"), "16\n").unwrap();

        remove_data_dir(&data_dir).await.unwrap();
        assert!(!data_dir.exists());
    }

    #[tokio::test]
    async fn test_remove_missing_data_dir_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        remove_data_dir(&temp_dir.path().join("never-created"))
            .await
            .unwrap();
    }

    #[test]
    fn test_current_username_is_not_empty() {
        // Minimal containers may have neither a passwd entry nor $USER.
        if let Ok(name) = current_username() {
            assert!(!name.is_empty());
        }
    }
}
