//! Handle to a running or adopted server.

use tokio::process::Child;
use tracing::{debug, info, warn};

use super::process;
use crate::error::{Error, Result};

/// A server started or adopted by devpg.
///
/// Closing a started server sends it SIGINT and waits for it to exit.
/// Closing an adopted server does nothing: its lifecycle belongs to
/// whoever started it. Closing twice is a no-op.
#[derive(Debug)]
pub struct ServerHandle {
    port: u16,
    ownership: Ownership,
}

#[derive(Debug)]
enum Ownership {
    Adopted { pid: u32 },
    Owned(Option<Child>),
}

impl ServerHandle {
    pub(crate) fn adopted(pid: u32, port: u16) -> Self {
        Self {
            port,
            ownership: Ownership::Adopted { pid },
        }
    }

    pub(crate) fn owned(child: Child, port: u16) -> Self {
        Self {
            port,
            ownership: Ownership::Owned(Some(child)),
        }
    }

    /// Port the server listens on.
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Pid of the server process, while known.
    pub fn pid(&self) -> Option<u32> {
        match &self.ownership {
            Ownership::Adopted { pid } => Some(*pid),
            Ownership::Owned(child) => child.as_ref().and_then(Child::id),
        }
    }

    /// Whether the server was already running when devpg found it.
    pub const fn is_adopted(&self) -> bool {
        matches!(self.ownership, Ownership::Adopted { .. })
    }

    /// Whether close has already stopped the server.
    pub const fn is_closed(&self) -> bool {
        matches!(self.ownership, Ownership::Owned(None))
    }

    /// Stop the server if devpg started it.
    pub async fn close(&mut self) -> Result<()> {
        let child = match &mut self.ownership {
            Ownership::Adopted { pid } => {
                debug!(pid = *pid, port = self.port, "leaving adopted server running");
                return Ok(());
            },
            Ownership::Owned(child) => match child.take() {
                Some(child) => child,
                None => return Ok(()),
            },
        };
        shutdown(child, self.port).await
    }
}

async fn shutdown(mut child: Child, port: u16) -> Result<()> {
    // `id()` is `None` once the child has been reaped.
    if let Some(pid) = child.id() {
        debug!(pid, port, "stopping server");
        if let Err(e) = process::interrupt(pid) {
            warn!(pid, error = %e, "failed to signal server");
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| Error::io(format!("waiting for server on port {port} to exit"), e))?;
    info!(port, %status, "server stopped");
    Ok(())
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Ownership::Owned(Some(child)) = &self.ownership
            && let Some(pid) = child.id()
        {
            warn!(pid, port = self.port, "server handle dropped without close, interrupting");
            let _ = process::interrupt(pid);
        }
    }
}
