//! `devpg wipe`: remove the data directory.

use anyhow::Result;

use devpg::config::DevSettings;
use devpg::init::remove_data_dir;
use devpg::server::{LivenessMarker, MarkerState, process};
use devpg::ui;

/// Execute the wipe command.
pub async fn execute(settings: &DevSettings) -> Result<()> {
    remove(settings).await?;
    ui::success(&format!("Wiped {}", settings.data_dir.display()));
    Ok(())
}

/// Remove the data directory, refusing while a server still runs against it.
pub async fn remove(settings: &DevSettings) -> Result<()> {
    if let MarkerState::Present(marker) = LivenessMarker::read(&settings.data_dir)
        && process::is_running(marker.pid)
    {
        anyhow::bail!(
            "A server (pid {}) is running on port {} against {}\n  \
             Stop it before wiping the data directory",
            marker.pid,
            marker.port,
            settings.data_dir.display()
        );
    }

    remove_data_dir(&settings.data_dir).await?;
    Ok(())
}
