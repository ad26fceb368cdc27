//! Composes initialization, port resolution, launch and seeding.
//!
//! The orchestrator moves through these states, each logged at `debug`:
//!
//! ```text
//! Idle -> PortResolved -> Adopted | Started -> Ready -> Bootstrapping -> Seeded -> Closed
//! ```
//!
//! Bootstrapping and seeding only happen for a data directory created by the
//! same call. Startup runs under the data directory lock so two invocations
//! never start two servers against one directory.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::constants::{
    DEFAULT_DATABASE, DEFAULT_LOCK_TIMEOUT, DEFAULT_START_PORT, DEFAULT_STARTUP_TIMEOUT_SECS,
};
use crate::error::{Error, Result};
use crate::flags::RuntimeConfigMap;
use crate::init;
use crate::seed::{ScriptTranslator, SeedRunner, SeedUnit};
use crate::server::{
    DataDirLock, PortResolution, PsqlProbe, ReadinessProbe, ServerHandle, launch, resolve_port,
};
use crate::stdio::IoDisposition;
use crate::toolchain::Toolchain;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    PortResolved,
    Adopted,
    Started,
    Ready,
    Bootstrapping,
    Seeded,
    Closed,
}

fn enter(state: State, data_dir: &Path) {
    debug!(state = ?state, data_dir = %data_dir.display(), "orchestrator state");
}

/// How to get a server for one data directory.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub data_dir: PathBuf,
    pub server_config: RuntimeConfigMap,
    pub stdio: IoDisposition,
    /// `None` waits for readiness indefinitely.
    pub startup_timeout: Option<Duration>,
    pub lock_timeout: Duration,
}

impl ServerOptions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            server_config: RuntimeConfigMap::new(),
            stdio: IoDisposition::Inherit,
            startup_timeout: Some(Duration::from_secs(DEFAULT_STARTUP_TIMEOUT_SECS)),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_server_config(mut self, server_config: RuntimeConfigMap) -> Self {
        self.server_config = server_config;
        self
    }

    #[must_use]
    pub fn with_stdio(mut self, stdio: IoDisposition) -> Self {
        self.stdio = stdio;
        self
    }

    #[must_use]
    pub fn with_startup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.startup_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

/// A server plus the database and seed units for a fresh data directory.
#[derive(Debug, Clone)]
pub struct DevServerOptions {
    pub server: ServerOptions,
    pub database: String,
    pub seed: Vec<SeedUnit>,
}

impl DevServerOptions {
    pub fn new(server: ServerOptions) -> Self {
        Self {
            server,
            database: DEFAULT_DATABASE.to_string(),
            seed: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: Vec<SeedUnit>) -> Self {
        self.seed = seed;
        self
    }
}

/// Gets, starts and seeds development servers.
#[derive(Clone)]
pub struct Orchestrator {
    toolchain: Toolchain,
    probe: Arc<dyn ReadinessProbe>,
    seeder: SeedRunner,
    start_port: u16,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("toolchain", &self.toolchain)
            .field("start_port", &self.start_port)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(toolchain: Toolchain) -> Self {
        Self {
            probe: Arc::new(PsqlProbe::new(toolchain.clone())),
            seeder: SeedRunner::new(toolchain.clone()),
            toolchain,
            start_port: DEFAULT_START_PORT,
        }
    }

    /// Replace the readiness probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn ReadinessProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Replace the translator used for TypeScript seed scripts.
    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn ScriptTranslator>) -> Self {
        self.seeder = self.seeder.with_translator(translator);
        self
    }

    /// First port tried for a new server.
    #[must_use]
    pub fn with_start_port(mut self, port: u16) -> Self {
        self.start_port = port;
        self
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Adopt the server running against the data directory, or start one.
    pub async fn use_server(&self, options: &ServerOptions) -> Result<ServerHandle> {
        let _lock = DataDirLock::acquire(&options.data_dir, options.lock_timeout).await?;
        self.start_locked(options).await
    }

    /// Run `f` with the port of a server, closing the server afterwards.
    ///
    /// The server is closed whether `f` succeeds or fails; an error from `f`
    /// takes precedence over one from closing.
    pub async fn with_server<F, Fut, T, E>(
        &self,
        options: &ServerOptions,
        f: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce(u16) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<Error>,
    {
        let mut handle = self.use_server(options).await?;
        let result = f(handle.port()).await;
        let closed = handle.close().await;
        enter(State::Closed, &options.data_dir);

        let value = result?;
        closed?;
        Ok(value)
    }

    /// Get a server for development: initialize the data directory if
    /// needed, adopt or start the server, and when the directory is new,
    /// create the role, the database and run the seed units.
    ///
    /// When bootstrapping or seeding fails the started server is closed
    /// before the error is returned.
    pub async fn use_dev_server(&self, options: &DevServerOptions) -> Result<ServerHandle> {
        let server = &options.server;
        let lock = DataDirLock::acquire(&server.data_dir, server.lock_timeout).await?;
        let created = init::init_data_dir(&self.toolchain, &server.data_dir, &server.stdio).await?;
        let mut handle = self.start_locked(server).await?;
        drop(lock);

        if !created {
            return Ok(handle);
        }

        if let Err(e) = self.bootstrap_and_seed(handle.port(), options).await {
            warn!(port = handle.port(), error = %e, "seeding failed, stopping server");
            if let Err(close_error) = handle.close().await {
                warn!(error = %close_error, "failed to stop server after seeding failure");
            }
            enter(State::Closed, &server.data_dir);
            return Err(e);
        }
        Ok(handle)
    }

    /// Initialize the data directory with its role and database, without
    /// seeding. Returns `false` when it already existed.
    pub async fn init_database(&self, options: &DevServerOptions) -> Result<bool> {
        let server = &options.server;
        let created = {
            let _lock = DataDirLock::acquire(&server.data_dir, server.lock_timeout).await?;
            init::init_data_dir(&self.toolchain, &server.data_dir, &server.stdio).await?
        };
        if !created {
            return Ok(false);
        }

        let database = options.clone().with_seed(Vec::new());
        self.with_server(server, |port| async move {
            self.bootstrap_and_seed(port, &database).await
        })
        .await?;
        Ok(true)
    }

    /// Run seed units in order against `database` on `port`.
    pub async fn run_seeds(
        &self,
        port: u16,
        database: &str,
        units: &[SeedUnit],
        stdio: &IoDisposition,
    ) -> Result<()> {
        self.seeder.run_all(units, port, database, stdio).await
    }

    async fn start_locked(&self, options: &ServerOptions) -> Result<ServerHandle> {
        let data_dir = &options.data_dir;
        enter(State::Idle, data_dir);

        let resolution = resolve_port(data_dir, self.probe.as_ref(), self.start_port).await?;
        enter(State::PortResolved, data_dir);

        match resolution {
            PortResolution::Adopted { pid, port } => {
                enter(State::Adopted, data_dir);
                Ok(ServerHandle::adopted(pid, port))
            },
            PortResolution::Fresh { port } => {
                enter(State::Started, data_dir);
                let handle = launch(
                    &self.toolchain,
                    self.probe.as_ref(),
                    data_dir,
                    &options.server_config,
                    port,
                    &options.stdio,
                    options.startup_timeout,
                )
                .await?;
                enter(State::Ready, data_dir);
                Ok(handle)
            },
        }
    }

    async fn bootstrap_and_seed(&self, port: u16, options: &DevServerOptions) -> Result<()> {
        let data_dir = &options.server.data_dir;
        let stdio = &options.server.stdio;
        enter(State::Bootstrapping, data_dir);

        let username = init::current_username()?;
        init::create_super_user(&self.toolchain, &username, port, stdio).await?;
        init::create_database(&self.toolchain, &options.database, port, stdio).await?;

        self.run_seeds(port, &options.database, &options.seed, stdio).await?;
        enter(State::Seeded, data_dir);
        info!(database = %options.database, port, units = options.seed.len(), "database ready");
        Ok(())
    }
}
