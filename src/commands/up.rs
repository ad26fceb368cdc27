//! `devpg up`: start (or adopt) the development server and keep it running.
//!
//! - `devpg up` - serve until Ctrl+C
//! - `devpg up -- npm run dev` - serve while the command runs, with
//!   `PGPORT` and `PGDATABASE` set in its environment

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::info;

use devpg::config::DevSettings;
use devpg::server::ServerHandle;

use super::wipe;

/// Execute the up command.
pub async fn execute(settings: &DevSettings, command: &[String]) -> Result<()> {
    if settings.wipe_on_restart {
        info!(data_dir = %settings.data_dir.display(), "wiping data directory before start");
        wipe::remove(settings).await?;
    }

    let orchestrator = settings.orchestrator();
    let mut server = orchestrator
        .use_dev_server(&settings.dev_server_options())
        .await?;

    print_ready(settings, &server);

    let outcome = match command.split_first() {
        Some((program, args)) => run_command(settings, &server, program, args).await,
        None => wait_for_interrupt(&server).await,
    };

    let closed = server.close().await;
    outcome?;
    closed.context("Failed to stop postgres")?;
    Ok(())
}

fn print_ready(settings: &DevSettings, server: &ServerHandle) {
    if server.is_adopted() {
        println!("Postgres already running on port {}", server.port());
    } else {
        println!("Postgres ready on port {}", server.port());
    }
    println!("  PGPORT={}", server.port());
    println!("  PGDATABASE={}", settings.name);
}

async fn wait_for_interrupt(server: &ServerHandle) -> Result<()> {
    if !server.is_adopted() {
        println!("\nPress Ctrl+C to stop postgres\n");
    }
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    println!("\nShutting down...");
    Ok(())
}

async fn run_command(
    settings: &DevSettings,
    server: &ServerHandle,
    program: &str,
    args: &[String],
) -> Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .env("PGPORT", server.port().to_string())
        .env("PGDATABASE", &settings.name)
        .current_dir(&settings.root)
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to run '{program}'"))?;

    tokio::select! {
        status = child.wait() => {
            let status = status.with_context(|| format!("Failed to wait for '{program}'"))?;
            if !status.success() {
                anyhow::bail!("'{program}' exited with {status}");
            }
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
            let _ = child.kill().await;
            Ok(())
        }
    }
}
