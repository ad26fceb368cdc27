//! Seed units and the runner that applies them to a database.
//!
//! ## Module Structure
//!
//! - [`script`]: Executable scripts in an embedded JavaScript engine
//! - [`translate`]: TypeScript to JavaScript translation

mod script;
pub mod translate;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::constants::SUPERUSER;
use crate::error::{Error, Result};
use crate::stdio::IoDisposition;
use crate::toolchain::{Toolchain, run_to_completion};

pub use translate::{CommandTranslator, ScriptTranslator};

/// One piece of data-loading work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedUnit {
    /// SQL text run with `psql -c`.
    Inline(String),
    /// A `.sql` file run with `psql -f`.
    SqlFile(PathBuf),
    /// Any other file, executed as a script.
    Script(PathBuf),
}

impl SeedUnit {
    pub fn inline(sql: impl Into<String>) -> Self {
        Self::Inline(sql.into())
    }

    /// Classify a file by its extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_sql = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("sql"));
        if is_sql {
            Self::SqlFile(path)
        } else {
            Self::Script(path)
        }
    }

    /// Resolve a relative file path against `root`.
    #[must_use]
    pub fn relative_to(self, root: &Path) -> Self {
        match self {
            Self::SqlFile(path) if path.is_relative() => Self::SqlFile(root.join(path)),
            Self::Script(path) if path.is_relative() => Self::Script(root.join(path)),
            other => other,
        }
    }
}

impl fmt::Display for SeedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(sql) => {
                let sql = sql.trim();
                match sql.char_indices().nth(48) {
                    Some((end, _)) => write!(f, "inline: {}...", &sql[..end]),
                    None => write!(f, "inline: {sql}"),
                }
            },
            Self::SqlFile(path) | Self::Script(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Applies seed units to a running server.
#[derive(Clone)]
pub struct SeedRunner {
    toolchain: Toolchain,
    translator: Arc<dyn ScriptTranslator>,
}

impl fmt::Debug for SeedRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedRunner")
            .field("toolchain", &self.toolchain)
            .finish_non_exhaustive()
    }
}

impl SeedRunner {
    pub fn new(toolchain: Toolchain) -> Self {
        Self {
            toolchain,
            translator: Arc::new(CommandTranslator::default()),
        }
    }

    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn ScriptTranslator>) -> Self {
        self.translator = translator;
        self
    }

    /// Apply one unit to `database` on `port`.
    pub async fn run(
        &self,
        unit: &SeedUnit,
        port: u16,
        database: &str,
        stdio: &IoDisposition,
    ) -> Result<()> {
        debug!(unit = %unit, port, database, "running seed unit");
        match unit {
            SeedUnit::Inline(sql) => {
                let mut command = self.toolchain.psql(Some(SUPERUSER), database, port);
                command.args(["-c", sql]);
                run_to_completion(command, stdio)
                    .await
                    .map_err(|e| Error::seed(unit, e))
            },
            SeedUnit::SqlFile(path) => {
                let mut command = self.toolchain.psql(None, database, port);
                command.args(["-v", "ON_ERROR_STOP=1", "-f"]).arg(path);
                run_to_completion(command, stdio)
                    .await
                    .map_err(|e| Error::seed(unit, e))
            },
            SeedUnit::Script(path) => {
                script::run_script(
                    path,
                    port,
                    database,
                    &self.toolchain,
                    self.translator.clone(),
                    stdio,
                )
                .await
            },
        }
    }

    /// Apply units in order, stopping at the first failure.
    pub async fn run_all(
        &self,
        units: &[SeedUnit],
        port: u16,
        database: &str,
        stdio: &IoDisposition,
    ) -> Result<()> {
        for (index, unit) in units.iter().enumerate() {
            self.run(unit, port, database, stdio).await?;
            info!(unit = %unit, step = index + 1, total = units.len(), "seeded");
        }
        Ok(())
    }
}
