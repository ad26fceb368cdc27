//! Project settings loaded from `devpg.toml`.
//!
//! - [`Settings`] - the file as written, with defaults for missing keys
//! - [`DevSettings`] - settings resolved against the project root and the
//!   environment, ready to build an [`Orchestrator`]
//!
//! A project without `devpg.toml` gets the defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{
    CONFIG_FILE, DATA_DIR_ENV, DEFAULT_DATA_DIR, DEFAULT_DATABASE, DEFAULT_STARTUP_TIMEOUT_SECS,
};
use crate::flags::{ConfigValue, RuntimeConfigMap};
use crate::orchestrator::{DevServerOptions, Orchestrator, ServerOptions};
use crate::seed::{CommandTranslator, SeedUnit};
use crate::stdio::IoDisposition;
use crate::toolchain::Toolchain;

/// Result of settings validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// One entry of `seed_scripts`: a path, or an inline `{ sql = "..." }` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SeedEntry {
    Path(PathBuf),
    Inline { sql: String },
}

impl SeedEntry {
    /// Turn the entry into a seed unit, resolving paths against `root`.
    pub fn into_unit(self, root: &Path) -> SeedUnit {
        match self {
            Self::Path(path) => SeedUnit::from_path(path).relative_to(root),
            Self::Inline { sql } => SeedUnit::Inline(sql),
        }
    }
}

/// `devpg.toml` configuration structure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Database the seed units run against.
    #[serde(default = "default_name")]
    pub name: String,
    /// Data directory, relative to the project root.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Hide server output except stderr.
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub seed_scripts: Option<Vec<SeedEntry>>,
    /// Values passed to `postgres` as `--key=value` flags.
    #[serde(default)]
    pub server_config: RuntimeConfigMap,
    /// Remove the data directory every time `devpg up` starts.
    #[serde(default)]
    pub wipe_on_restart: bool,
    /// Directory holding the PostgreSQL binaries; `PATH` when unset.
    #[serde(default)]
    pub bin_dir: Option<PathBuf>,
    /// Seconds to wait for a new server to answer queries; 0 waits forever.
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
    /// Command translating TypeScript seed scripts.
    #[serde(default)]
    pub translator: Option<String>,
}

fn default_name() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_startup_timeout_secs() -> u64 {
    DEFAULT_STARTUP_TIMEOUT_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: None,
            quiet: false,
            seed_scripts: None,
            server_config: RuntimeConfigMap::new(),
            wipe_on_restart: false,
            bin_dir: None,
            startup_timeout_secs: default_startup_timeout_secs(),
            translator: None,
        }
    }
}

impl Settings {
    /// Load `devpg.toml` from `root`, or the defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Load settings from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Keys are unknown or have invalid types
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    /// Validate settings.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails with one or more errors:
    /// - Database name that is not a plain SQL identifier
    /// - Server config keys that cannot form a `--key=value` flag
    /// - An empty translator command
    pub fn validate(&self, root: &Path) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Database name is interpolated into CREATE DATABASE unquoted
        if !is_identifier(&self.name) {
            errors.push(format!(
                "name must be a plain SQL identifier (letters, digits, underscores; \
                 not starting with a digit), got: '{}'",
                self.name
            ));
        }

        // 2. Server config flags
        for (key, value) in &self.server_config {
            if key.is_empty() || key.contains('=') || key.contains(char::is_whitespace) {
                errors.push(format!("server_config key '{key}' cannot be passed as a flag"));
            }
            if let ConfigValue::Float(f) = value
                && !f.is_finite()
            {
                errors.push(format!("server_config.{key} must be a finite number"));
            }
        }

        // 3. Translator
        if let Some(translator) = &self.translator
            && translator.trim().is_empty()
        {
            errors.push("translator cannot be empty".to_string());
        }

        // 4. Startup timeout
        if self.startup_timeout_secs == 0 {
            warnings.push(
                "startup_timeout_secs = 0 waits for the server indefinitely\n  \
                 A server that never becomes ready will hang devpg"
                    .to_string(),
            );
        }

        // 5. Paths that should exist
        if let Some(bin_dir) = &self.bin_dir {
            let bin_dir = root.join(bin_dir);
            if !bin_dir.is_dir() {
                warnings.push(format!(
                    "bin_dir does not exist: {}\n  \
                     The PostgreSQL binaries (initdb, postgres, psql, createuser) are expected there",
                    bin_dir.display()
                ));
            }
        }

        if let Some(data_dir) = &self.data_dir {
            let data_dir = root.join(data_dir);
            if data_dir.exists() && !data_dir.is_dir() {
                errors.push(format!("data_dir is not a directory: {}", data_dir.display()));
            }
        }

        for entry in self.seed_scripts.iter().flatten() {
            if let SeedEntry::Path(path) = entry {
                let path = root.join(path);
                if !path.is_file() {
                    warnings.push(format!("seed script does not exist: {}", path.display()));
                }
            }
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }

    /// Resolve paths against `root`, taking the default data directory from
    /// `PGDATA` when set.
    ///
    /// # Errors
    ///
    /// Returns an error if the translator command is empty.
    pub fn resolve(self, root: &Path) -> Result<DevSettings> {
        self.resolve_with_env(root, std::env::var_os(DATA_DIR_ENV))
    }

    fn resolve_with_env(self, root: &Path, pgdata: Option<OsString>) -> Result<DevSettings> {
        let data_dir = self
            .data_dir
            .or_else(|| pgdata.filter(|v| !v.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let translator = match &self.translator {
            Some(line) => CommandTranslator::from_command_line(line)?,
            None => CommandTranslator::default(),
        };

        Ok(DevSettings {
            root: root.to_path_buf(),
            name: self.name,
            data_dir: root.join(data_dir),
            quiet: self.quiet,
            seed: self.seed_scripts.map(|entries| {
                entries
                    .into_iter()
                    .map(|entry| entry.into_unit(root))
                    .collect()
            }),
            server_config: self.server_config,
            wipe_on_restart: self.wipe_on_restart,
            toolchain: Toolchain::new(self.bin_dir.map(|dir| root.join(dir))),
            startup_timeout: (self.startup_timeout_secs > 0)
                .then(|| Duration::from_secs(self.startup_timeout_secs)),
            translator,
        })
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Settings resolved for one project.
#[derive(Debug, Clone)]
pub struct DevSettings {
    pub root: PathBuf,
    pub name: String,
    pub data_dir: PathBuf,
    pub quiet: bool,
    /// `None` when no seed scripts are configured at all.
    pub seed: Option<Vec<SeedUnit>>,
    pub server_config: RuntimeConfigMap,
    pub wipe_on_restart: bool,
    pub toolchain: Toolchain,
    pub startup_timeout: Option<Duration>,
    pub translator: CommandTranslator,
}

impl DevSettings {
    /// Output handling for spawned processes: everything, or stderr only
    /// when quiet.
    pub fn stdio(&self) -> IoDisposition {
        if self.quiet {
            IoDisposition::stderr_only()
        } else {
            IoDisposition::Inherit
        }
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.toolchain.clone()).with_translator(Arc::new(self.translator.clone()))
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions::new(&self.data_dir)
            .with_server_config(self.server_config.clone())
            .with_stdio(self.stdio())
            .with_startup_timeout(self.startup_timeout)
    }

    pub fn dev_server_options(&self) -> DevServerOptions {
        DevServerOptions::new(self.server_options())
            .with_database(&self.name)
            .with_seed(self.seed.clone().unwrap_or_default())
    }
}

/// Closest directory at or above `start` holding `devpg.toml`, or `start`
/// itself when there is none.
pub fn find_project_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file())
        .unwrap_or(start)
        .to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_empty_settings() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.name, "main");
        assert_eq!(settings.startup_timeout_secs, DEFAULT_STARTUP_TIMEOUT_SECS);
        assert!(settings.seed_scripts.is_none());
    }

    #[test]
    fn test_parse_full_settings() {
        let toml_str = r#"
name = "shop"
data_dir = "tmp/pg"
quiet = true
wipe_on_restart = true
bin_dir = "/usr/lib/postgresql/16/bin"
startup_timeout_secs = 5
translator = "sucrase-node"
seed_scripts = [
    "db/schema.sql",
    { sql = "INSERT INTO items VALUES (1)" },
    "db/seed.ts",
]

[server_config]
fsync = false
max_connections = 20
log_min_messages = "fatal"
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.name, "shop");
        assert!(settings.quiet);
        assert_eq!(
            settings.seed_scripts.as_deref().unwrap(),
            [
                SeedEntry::Path(PathBuf::from("db/schema.sql")),
                SeedEntry::Inline {
                    sql: "INSERT INTO items VALUES (1)".to_string()
                },
                SeedEntry::Path(PathBuf::from("db/seed.ts")),
            ]
        );
        assert_eq!(settings.server_config["fsync"], ConfigValue::Bool(false));
        assert_eq!(settings.server_config["max_connections"], ConfigValue::Integer(20));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(toml::from_str::<Settings>("dataDir = \"x\"").is_err());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        assert_eq!(Settings::load(dir.path()).unwrap(), Settings::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "name = ").unwrap();
        let err = Settings::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_resolve_paths_against_root() {
        let settings: Settings = toml::from_str(
            r#"
seed_scripts = ["seed.sql", "/abs/seed.js", { sql = "SELECT 1" }]
bin_dir = "pg/bin"
"#,
        )
        .unwrap();
        let root = Path::new("/project");
        let resolved = settings.resolve_with_env(root, None).unwrap();

        assert_eq!(resolved.data_dir, PathBuf::from("/project/.devpg"));
        assert_eq!(resolved.toolchain.bin_dir(), Some(Path::new("/project/pg/bin")));
        assert_eq!(
            resolved.seed.unwrap(),
            [
                SeedUnit::SqlFile(PathBuf::from("/project/seed.sql")),
                SeedUnit::Script(PathBuf::from("/abs/seed.js")),
                SeedUnit::inline("SELECT 1"),
            ]
        );
        assert_eq!(
            resolved.startup_timeout,
            Some(Duration::from_secs(DEFAULT_STARTUP_TIMEOUT_SECS))
        );
    }

    #[test]
    fn test_data_dir_precedence() {
        let root = Path::new("/project");

        let from_env = Settings::default()
            .resolve_with_env(root, Some(OsString::from("/var/pgdata")))
            .unwrap();
        assert_eq!(from_env.data_dir, PathBuf::from("/var/pgdata"));

        let explicit = Settings {
            data_dir: Some(PathBuf::from("db")),
            ..Settings::default()
        }
        .resolve_with_env(root, Some(OsString::from("/var/pgdata")))
        .unwrap();
        assert_eq!(explicit.data_dir, PathBuf::from("/project/db"));

        let empty_env = Settings::default()
            .resolve_with_env(root, Some(OsString::new()))
            .unwrap();
        assert_eq!(empty_env.data_dir, PathBuf::from("/project/.devpg"));
    }

    #[test]
    fn test_zero_timeout_waits_forever() {
        let settings = Settings {
            startup_timeout_secs: 0,
            ..Settings::default()
        };
        let resolved = settings.resolve_with_env(Path::new("/p"), None).unwrap();
        assert!(resolved.startup_timeout.is_none());
        assert!(resolved.server_options().startup_timeout.is_none());
    }

    #[test]
    fn test_quiet_uses_stderr_only() {
        let settings = Settings {
            quiet: true,
            ..Settings::default()
        };
        let resolved = settings.resolve_with_env(Path::new("/p"), None).unwrap();
        assert!(matches!(resolved.stdio(), IoDisposition::Callback(_)));
    }

    #[test]
    fn test_validate_default_settings() {
        let dir = tempdir().unwrap();
        let result = Settings::default().validate(dir.path()).unwrap();
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_validate_rejects_bad_name() {
        let dir = tempdir().unwrap();
        for name in ["", "1db", "my-db", "db; DROP TABLE x"] {
            let settings = Settings {
                name: name.to_string(),
                ..Settings::default()
            };
            let err = settings.validate(dir.path()).unwrap_err().to_string();
            assert!(err.contains("plain SQL identifier"), "{name}: {err}");
        }
    }

    #[test]
    fn test_validate_rejects_bad_flag_key() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings
            .server_config
            .insert("bad key".to_string(), ConfigValue::Bool(true));
        let err = settings.validate(dir.path()).unwrap_err().to_string();
        assert!(err.contains("cannot be passed as a flag"));
    }

    #[test]
    fn test_validate_warns_on_missing_paths() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            bin_dir: Some(PathBuf::from("missing/bin")),
            seed_scripts: Some(vec![SeedEntry::Path(PathBuf::from("missing.sql"))]),
            startup_timeout_secs: 0,
            ..Settings::default()
        };
        let result = settings.validate(dir.path()).unwrap();
        assert_eq!(result.warnings.len(), 3);
    }

    #[test]
    fn test_validate_data_dir_not_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("file"), "x").unwrap();
        let settings = Settings {
            data_dir: Some(PathBuf::from("file")),
            ..Settings::default()
        };
        let err = settings.validate(dir.path()).unwrap_err().to_string();
        assert!(err.contains("not a directory"));
    }

    #[test]
    fn test_find_project_root() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        std::fs::write(dir.path().join(CONFIG_FILE), "").unwrap();
        assert_eq!(find_project_root(&nested), dir.path());
    }
}
