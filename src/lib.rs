//! devpg - provision, reuse and seed a local PostgreSQL server for development.
//!
//! A development database lives in a data directory inside the project.
//! [`Orchestrator`] initializes that directory on first use, starts
//! `postgres` on a free port (or adopts the server already running against
//! the directory), waits until it accepts connections, and runs the seed
//! units against the freshly bootstrapped database.
//!
//! ```no_run
//! use devpg::{DevServerOptions, Orchestrator, ServerOptions, Toolchain};
//!
//! # async fn demo() -> devpg::Result<()> {
//! let orchestrator = Orchestrator::new(Toolchain::default());
//! let options = DevServerOptions::new(ServerOptions::new(".devpg")).with_database("app");
//! let mut server = orchestrator.use_dev_server(&options).await?;
//! println!("postgres on port {}", server.port());
//! server.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod flags;
pub mod init;
pub mod orchestrator;
pub mod retry;
pub mod seed;
pub mod server;
pub mod stdio;
pub mod toolchain;
pub mod ui;

pub use error::{Error, Result};
pub use flags::{ConfigValue, RuntimeConfigMap, config_flags};
pub use orchestrator::{DevServerOptions, Orchestrator, ServerOptions};
pub use seed::{CommandTranslator, ScriptTranslator, SeedRunner, SeedUnit};
pub use server::{ReadinessProbe, ServerHandle};
pub use stdio::{IoDisposition, OutputStream};
pub use toolchain::Toolchain;
