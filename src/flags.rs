//! Translation of runtime configuration into `postgres` command-line flags.
//!
//! Any `postgresql.conf` setting can be passed on the `postgres` command line
//! as `--<key>=<value>`. Keys are not validated; unknown keys are handed to
//! the server unchanged and rejected there.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// A single runtime configuration value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("on"),
            Self::Bool(false) => f.write_str("off"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Runtime configuration keyed by setting name.
///
/// A `BTreeMap` keeps flag generation deterministic for a given set of
/// settings.
pub type RuntimeConfigMap = BTreeMap<String, ConfigValue>;

/// Render one flag per key, in key order.
pub fn config_flags(values: &RuntimeConfigMap) -> Vec<String> {
    values
        .iter()
        .map(|(key, value)| format!("--{key}={value}"))
        .collect()
}
