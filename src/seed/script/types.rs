//! Types shared between the script thread and the async seed runner.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::stdio::OutputStream;

/// Message from the script thread to the async side.
#[derive(Debug)]
pub(crate) enum HostMessage {
    /// `devpg.sql(text)`: run a statement and reply with its output.
    Sql {
        statement: String,
        response_tx: std::sync::mpsc::Sender<SqlReply>,
    },
    /// `console.*` output.
    Log { stream: OutputStream, text: String },
}

/// Output of a statement, or the reason it failed.
pub(crate) type SqlReply = Result<String, String>;

/// Values exposed to the script as `devpg` and `process`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ScriptContext {
    pub port: u16,
    pub database: String,
    pub env: BTreeMap<String, String>,
    pub cwd: String,
    pub platform: &'static str,
}

/// A module located by `require`, ready to evaluate.
#[derive(Debug, Serialize)]
pub(crate) struct LoadedModule {
    pub path: PathBuf,
    pub dir: PathBuf,
    pub json: bool,
    pub source: String,
}

/// Reply to a native call, unwrapped (or thrown) by the JS prelude.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum NativeReply<T> {
    Ok(T),
    Error(String),
}

impl<T: Serialize> NativeReply<T> {
    pub fn from_result(result: Result<T, String>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(reason) => Self::Error(reason),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"unserializable reply: {e}"}}"#))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_native_reply_shapes() {
        let ok = NativeReply::Ok("1".to_string()).to_json();
        assert_eq!(serde_json::from_str::<serde_json::Value>(&ok).unwrap(), json!({"ok": "1"}));

        let err = NativeReply::<String>::Error("boom".to_string()).to_json();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&err).unwrap(),
            json!({"error": "boom"})
        );
    }

    #[test]
    fn test_loaded_module_serialization() {
        let module = LoadedModule {
            path: PathBuf::from("/seed/data.json"),
            dir: PathBuf::from("/seed"),
            json: true,
            source: "[]".to_string(),
        };
        let value = serde_json::to_value(NativeReply::Ok(module)).unwrap();
        assert_eq!(value["ok"]["path"], "/seed/data.json");
        assert_eq!(value["ok"]["json"], true);
    }

    #[test]
    fn test_context_serialization() {
        let context = ScriptContext {
            port: 8432,
            database: "main".to_string(),
            env: BTreeMap::from([("PGPORT".to_string(), "8432".to_string())]),
            cwd: "/work".to_string(),
            platform: "linux",
        };
        let value = serde_json::to_value(&context).unwrap();
        assert_eq!(value["port"], 8432);
        assert_eq!(value["env"]["PGPORT"], "8432");
    }
}
