//! Source translation for executable seed scripts.
//!
//! The embedded engine runs plain JavaScript. TypeScript sources are handed
//! to an external translator (esbuild by default) which reads the source on
//! stdin and writes CommonJS on stdout.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::constants::DEFAULT_TRANSLATOR;
use crate::error::{Error, Result};

/// Extensions whose sources need translation before execution.
const TRANSLATED_EXTENSIONS: &[&str] = &["ts", "mts", "cts"];

/// Turns script sources into JavaScript the engine can run.
///
/// Called from the script thread, so implementations may block.
pub trait ScriptTranslator: Send + Sync {
    /// Whether `path` needs translating before it can run.
    fn needs_translation(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| TRANSLATED_EXTENSIONS.iter().any(|t| e.eq_ignore_ascii_case(t)))
    }

    /// Translate `source`, read from `path`, to JavaScript.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compile`] when the source cannot be translated.
    fn translate(&self, source: &str, path: &Path) -> Result<String>;

    /// Translate `source` only if `path` needs it.
    fn prepare(&self, source: String, path: &Path) -> Result<String> {
        if self.needs_translation(path) {
            self.translate(&source, path)
        } else {
            Ok(source)
        }
    }
}

/// Translator that pipes the source through an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTranslator {
    program: String,
    args: Vec<String>,
}

impl Default for CommandTranslator {
    fn default() -> Self {
        Self {
            program: DEFAULT_TRANSLATOR[0].to_string(),
            args: DEFAULT_TRANSLATOR[1..].iter().map(ToString::to_string).collect(),
        }
    }
}

impl CommandTranslator {
    /// Build a translator from a whitespace-separated command line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty command line.
    pub fn from_command_line(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace().map(ToString::to_string);
        let program = parts
            .next()
            .ok_or_else(|| Error::Config("translator command is empty".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl ScriptTranslator for CommandTranslator {
    fn translate(&self, source: &str, path: &Path) -> Result<String> {
        debug!(path = %path.display(), translator = %self.program, "translating script");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::compile(path, format!("failed to run `{}`: {e}", self.program)))?;

        // Feed stdin from a separate thread so a translator that streams
        // output before reading all input cannot deadlock on full pipes.
        let mut stdin = child.stdin.take();
        let input = source.to_string();
        let writer = std::thread::spawn(move || {
            if let Some(stdin) = stdin.as_mut() {
                let _ = stdin.write_all(input.as_bytes());
            }
        });

        let output = child
            .wait_with_output()
            .map_err(|e| Error::compile(path, format!("failed to run `{}`: {e}", self.program)))?;
        let _ = writer.join();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::compile(
                path,
                format!("`{}` exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| Error::compile(path, format!("translator produced invalid UTF-8: {e}")))
    }
}
