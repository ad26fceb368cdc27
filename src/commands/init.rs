//! `devpg init`: bootstrap the database without seeding it.

use anyhow::Result;

use devpg::config::DevSettings;
use devpg::ui;

/// Execute the init command.
pub async fn execute(settings: &DevSettings) -> Result<()> {
    let created = settings
        .orchestrator()
        .init_database(&settings.dev_server_options())
        .await?;

    if created {
        ui::success("Initialized database");
    } else {
        ui::success("Database already initialized");
    }
    Ok(())
}
