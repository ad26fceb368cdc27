//! devpg CLI - a local PostgreSQL server for development.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "devpg")]
#[command(about = "Provision, reuse and seed a local PostgreSQL server for development")]
#[command(version)]
struct Cli {
    /// Project directory (defaults to the nearest directory with devpg.toml)
    #[arg(short = 'C', long = "dir", global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory, role and database
    Init,

    /// Run seed scripts against the database
    Seed {
        /// Seed scripts to run instead of the configured ones
        scripts: Vec<PathBuf>,

        /// Wipe the data directory before seeding
        #[arg(long)]
        wipe: bool,
    },

    /// Delete the data directory
    Wipe,

    /// Start postgres and keep it running
    Up {
        /// Command to run while postgres is up (after `--`)
        #[arg(last = true)]
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();

    let result = run(cli).await;

    if let Err(e) = result {
        report(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = commands::load_settings(cli.dir.as_deref())?;

    match cli.command {
        Commands::Init => commands::init::execute(&settings).await,
        Commands::Seed { scripts, wipe } => commands::seed::execute(&settings, &scripts, wipe).await,
        Commands::Wipe => commands::wipe::execute(&settings).await,
        Commands::Up { command } => commands::up::execute(&settings, &command).await,
    }
}

/// Logs go to stderr so stdout stays free for command output.
fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn report(error: &anyhow::Error) {
    match error.downcast_ref::<devpg::Error>() {
        Some(inner) => {
            let (title, hints) = devpg::ui::describe_error(inner);
            devpg::ui::print_error_box_with_hints(title, Some(&format!("{error:#}")), hints);
        },
        None => eprintln!("Error: {error:#}"),
    }
}
