//! `devpg seed`: run seed scripts against the development database.

use anyhow::{Context, Result};
use std::path::PathBuf;

use devpg::config::DevSettings;
use devpg::seed::SeedUnit;
use devpg::ui;

use super::{absolute, wipe};

/// Execute the seed command.
///
/// Runs `scripts` when given, the configured seed scripts otherwise. With
/// `wipe`, the data directory is removed first.
pub async fn execute(settings: &DevSettings, scripts: &[PathBuf], wipe: bool) -> Result<()> {
    let units = if scripts.is_empty() {
        settings
            .seed
            .clone()
            .context("No seed script configured\n  Add seed_scripts to devpg.toml or pass a script")?
    } else {
        scripts
            .iter()
            .map(|path| absolute(path).map(SeedUnit::from_path))
            .collect::<Result<Vec<_>>>()?
    };

    if wipe {
        wipe::remove(settings).await?;
    }

    // The units run below, not as part of bootstrapping a fresh directory.
    let options = settings.dev_server_options().with_seed(Vec::new());
    let orchestrator = settings.orchestrator();
    let mut server = orchestrator.use_dev_server(&options).await?;

    let seeded = orchestrator
        .run_seeds(server.port(), &settings.name, &units, &options.server.stdio)
        .await;
    let closed = server.close().await;
    seeded?;
    closed.context("Failed to stop postgres")?;

    ui::success("Postgres is now seeded!");
    Ok(())
}
