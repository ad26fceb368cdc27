//! Spawning the postgres server process.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use super::handle::ServerHandle;
use super::probe::{ReadinessProbe, wait_ready};
use crate::error::{Error, Result};
use crate::flags::{RuntimeConfigMap, config_flags};
use crate::stdio::IoDisposition;
use crate::toolchain::Toolchain;

/// Start `postgres` on `port` against `data_dir` and wait until it answers
/// queries.
///
/// With `startup_timeout` set to `None` this waits indefinitely. A process
/// that exits before becoming ready, or is still not ready at the deadline,
/// yields [`Error::StartupFailure`]. A process that merely timed out is left
/// running so its state can be inspected.
pub async fn launch(
    toolchain: &Toolchain,
    probe: &dyn ReadinessProbe,
    data_dir: &Path,
    server_config: &RuntimeConfigMap,
    port: u16,
    stdio: &IoDisposition,
    startup_timeout: Option<Duration>,
) -> Result<ServerHandle> {
    let flags = config_flags(server_config);
    let mut command = toolchain.postgres(data_dir, port, &flags);
    stdio.apply(&mut command);

    info!(data_dir = %data_dir.display(), port, flags = ?flags, "starting postgres");
    let mut child = command
        .spawn()
        .map_err(|e| Error::startup(port, format!("failed to run postgres: {e}")))?;
    // Output forwarding runs until the server closes its pipes.
    drop(stdio.forward(&mut child));

    tokio::select! {
        exited = child.wait() => {
            let reason = match exited {
                Ok(status) => format!("postgres exited with {status} before accepting queries"),
                Err(e) => format!("failed to wait for postgres: {e}"),
            };
            Err(Error::startup(port, reason))
        },
        ready = wait_ready(probe, port, startup_timeout) => {
            if let Err(e) = ready {
                warn!(pid = ?child.id(), port, "server not ready, leaving it running");
                return Err(e);
            }
            info!(pid = ?child.id(), port, "postgres is ready");
            Ok(ServerHandle::owned(child, port))
        },
    }
}
