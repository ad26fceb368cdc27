//! Executable seed scripts, run in an embedded QuickJS engine.
//!
//! The engine lives on a blocking worker thread. Calls that need the async
//! side (`devpg.sql()`, `console.*`) are sent over a channel and, for SQL,
//! block the script thread until the reply arrives.
//!
//! # Script environment
//!
//! Scripts have access to:
//! - `require` for relative `.js`/`.json`/`.ts` files and the `devpg` builtin
//! - `__filename` and `__dirname`
//! - `process.env`: a copy of the ambient environment plus `PGPORT` and
//!   `PGDATABASE`. Writes stay inside the script.
//! - `devpg.port`, `devpg.database`, `devpg.sql(text)`
//! - `console.log/info/debug` (stdout) and `console.warn/error` (stderr)
//!
//! The entry body runs first. If it leaves a function in `exports.default`
//! (what `export default` compiles to), that function is then awaited with the
//! `devpg` context. Any other export is left alone.
//!
//! Scripts do NOT have network access, timers, or package resolution for bare
//! module names.

mod types;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rquickjs::{Context as JsContext, Ctx, Function, Object, Runtime};
use tokio::sync::mpsc;
use tracing::debug;

use self::types::{HostMessage, LoadedModule, NativeReply, ScriptContext, SqlReply};
use super::translate::ScriptTranslator;
use crate::constants::{DATABASE_ENV, PORT_ENV};
use crate::error::{Error, Result};
use crate::stdio::{IoDisposition, OutputStream};
use crate::toolchain::{Toolchain, capture_output};

const PRELUDE: &str = include_str!("script/prelude.js");

/// Extensions tried, in order, when a required path has none.
const MODULE_EXTENSIONS: &[&str] = &["js", "cjs", "json", "ts", "cts", "mts"];

// =============================================================================
// Host bridge
// =============================================================================

/// State the native functions reach from the script thread.
struct HostBridge {
    tx: mpsc::UnboundedSender<HostMessage>,
    translator: Arc<dyn ScriptTranslator>,
    /// First translation failure inside `require`, reported in preference
    /// to the JS error it caused.
    compile_error: Option<Error>,
}

thread_local! {
    static HOST_BRIDGE: RefCell<Option<HostBridge>> = const { RefCell::new(None) };
}

/// Clears the thread-local bridge on drop, even if the script thread panics.
struct HostBridgeGuard;

impl HostBridgeGuard {
    fn set(bridge: HostBridge) -> Self {
        HOST_BRIDGE.with(|cell| {
            *cell.borrow_mut() = Some(bridge);
        });
        Self
    }

    fn take_compile_error(&self) -> Option<Error> {
        HOST_BRIDGE.with(|cell| {
            cell.borrow_mut()
                .as_mut()
                .and_then(|bridge| bridge.compile_error.take())
        })
    }
}

impl Drop for HostBridgeGuard {
    fn drop(&mut self) {
        HOST_BRIDGE.with(|cell| {
            *cell.borrow_mut() = None;
        });
    }
}

// =============================================================================
// Async side
// =============================================================================

/// Run the script at `path` against `database` on `port`.
///
/// Uncaught errors and rejected promises become [`Error::Seed`]; failing
/// translation of the script or anything it requires becomes
/// [`Error::Compile`].
pub(crate) async fn run_script(
    path: &Path,
    port: u16,
    database: &str,
    toolchain: &Toolchain,
    translator: Arc<dyn ScriptTranslator>,
    stdio: &IoDisposition,
) -> Result<()> {
    let unit = path.display().to_string();
    let path = tokio::fs::canonicalize(path)
        .await
        .map_err(|e| Error::seed(&unit, format!("cannot read script: {e}")))?;
    let context = script_context(port, database);

    let (tx, mut rx) = mpsc::unbounded_channel::<HostMessage>();
    let bridge = HostBridge {
        tx,
        translator: translator.clone(),
        compile_error: None,
    };

    debug!(script = %path.display(), port, database, "running seed script");
    let js_unit = unit.clone();
    let js_handle =
        tokio::task::spawn_blocking(move || run_js(&path, &js_unit, &context, translator, bridge));

    // The sender lives in the bridge, so the channel closes exactly when the
    // script thread is done and every message it sent has been handled.
    while let Some(message) = rx.recv().await {
        match message {
            HostMessage::Sql {
                statement,
                response_tx,
            } => {
                let reply = run_sql(toolchain, database, port, &statement).await;
                let _ = response_tx.send(reply);
            },
            HostMessage::Log { stream, text } => {
                for line in text.split('\n') {
                    stdio.emit(stream, line);
                }
            },
        }
    }

    match js_handle.await {
        Ok(result) => result,
        Err(e) => Err(Error::seed(unit, format!("script thread panicked: {e}"))),
    }
}

async fn run_sql(toolchain: &Toolchain, database: &str, port: u16, statement: &str) -> SqlReply {
    debug!(port, database, statement, "script query");
    let mut command = toolchain.psql(None, database, port);
    command.args(["-X", "-A", "-t", "-q", "-v", "ON_ERROR_STOP=1", "-c", statement]);
    capture_output(command)
        .await
        .map(|output| query_result(&output))
        .map_err(|e| e.to_string())
}

/// Rows of unaligned, tuples-only output as the script sees them: only the
/// final line breaks are dropped, values keep their own whitespace.
fn query_result(output: &str) -> String {
    output.trim_end_matches(['\n', '\r']).to_string()
}

fn script_context(port: u16, database: &str) -> ScriptContext {
    let mut env: BTreeMap<String, String> = std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect();
    env.insert(PORT_ENV.to_string(), port.to_string());
    env.insert(DATABASE_ENV.to_string(), database.to_string());

    ScriptContext {
        port,
        database: database.to_string(),
        env,
        cwd: std::env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default(),
        platform: std::env::consts::OS,
    }
}

// =============================================================================
// Script thread
// =============================================================================

/// Outcome of the script's driver promise.
enum Progress {
    Pending,
    Done,
    Failed(String),
}

fn run_js(
    path: &Path,
    unit: &str,
    context: &ScriptContext,
    translator: Arc<dyn ScriptTranslator>,
    bridge: HostBridge,
) -> Result<()> {
    let guard = HostBridgeGuard::set(bridge);
    let result = evaluate(path, unit, context, translator.as_ref());

    match (result, guard.take_compile_error()) {
        (Err(_), Some(compile_error)) => Err(compile_error),
        (result, _) => result,
    }
    // guard dropped here, closing the channel
}

fn evaluate(
    path: &Path,
    unit: &str,
    context: &ScriptContext,
    translator: &dyn ScriptTranslator,
) -> Result<()> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| Error::seed(unit, format!("cannot read script: {e}")))?;
    let source = translator.prepare(source, path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("/"));

    let context_json = serde_json::to_string(context)
        .map_err(|e| Error::seed(unit, format!("failed to serialize script context: {e}")))?;

    let runtime =
        Runtime::new().map_err(|e| Error::seed(unit, format!("failed to create JS runtime: {e}")))?;
    let js = JsContext::full(&runtime)
        .map_err(|e| Error::seed(unit, format!("failed to create JS context: {e}")))?;

    js.with(|ctx| start(&ctx, &context_json, &source, path, dir))
        .map_err(|reason| Error::seed(unit, reason))?;
    drive(&runtime, &js).map_err(|reason| Error::seed(unit, reason))
}

/// Install the globals, evaluate the wrapped entry and start its driver.
fn start(
    ctx: &Ctx<'_>,
    context_json: &str,
    source: &str,
    path: &Path,
    dir: &Path,
) -> std::result::Result<(), String> {
    let globals = ctx.globals();
    let install = |name: &str, result: rquickjs::Result<()>| {
        result.map_err(|e| format!("failed to install {name}: {}", describe(ctx, e)))
    };

    install(
        "__devpg_sql__",
        Function::new(ctx.clone(), native_sql).and_then(|f| globals.set("__devpg_sql__", f)),
    )?;
    install(
        "__devpg_log__",
        Function::new(ctx.clone(), native_log).and_then(|f| globals.set("__devpg_log__", f)),
    )?;
    install(
        "__devpg_load__",
        Function::new(ctx.clone(), native_load).and_then(|f| globals.set("__devpg_load__", f)),
    )?;
    install("__devpg_context__", globals.set("__devpg_context__", context_json))?;
    install("prelude", ctx.eval::<(), _>(PRELUDE))?;

    ctx.eval::<(), _>(wrap_entry(source))
        .map_err(|e| describe(ctx, e))?;

    let run: Function<'_> = globals
        .get("__devpg_run__")
        .map_err(|e| describe(ctx, e))?;
    let entry: Function<'_> = globals
        .get("__devpg_entry__")
        .map_err(|e| describe(ctx, e))?;
    let state: Object<'_> = run
        .call((
            entry,
            path.display().to_string(),
            dir.display().to_string(),
        ))
        .map_err(|e| describe(ctx, e))?;
    globals
        .set("__devpg_state__", state)
        .map_err(|e| describe(ctx, e))
}

/// Run pending jobs until the driver promise settles.
///
/// Scripts have no timers and `sql()` is synchronous, so once the job queue
/// is empty nothing else can settle the promise.
fn drive(runtime: &Runtime, js: &JsContext) -> std::result::Result<(), String> {
    loop {
        match js.with(|ctx| progress(&ctx))? {
            Progress::Done => return Ok(()),
            Progress::Failed(reason) => return Err(reason),
            Progress::Pending => {},
        }

        match runtime.execute_pending_job() {
            Ok(true) => {},
            Ok(false) => {
                return Err("script awaited a promise that can never settle".to_string());
            },
            Err(e) => return Err(format!("JS job execution error: {e:?}")),
        }
    }
}

fn progress(ctx: &Ctx<'_>) -> std::result::Result<Progress, String> {
    let state: Object<'_> = ctx
        .globals()
        .get("__devpg_state__")
        .map_err(|e| describe(ctx, e))?;
    if !state.get::<_, bool>("settled").unwrap_or(false) {
        return Ok(Progress::Pending);
    }
    let error: Option<String> = state.get("error").map_err(|e| describe(ctx, e))?;
    Ok(error.map_or(Progress::Done, Progress::Failed))
}

/// Wrap the entry source into an async function so top-level `await` works.
fn wrap_entry(source: &str) -> String {
    format!(
        "var __devpg_entry__ = (async function (require, __filename, __dirname, exports, module) {{\n\
         {source}\n}});"
    )
}

/// Turn an engine error into a message, taking the pending exception if any.
fn describe(ctx: &Ctx<'_>, error: rquickjs::Error) -> String {
    if !matches!(error, rquickjs::Error::Exception) {
        return error.to_string();
    }
    let caught = ctx.catch();
    if let Some(exception) = caught.as_exception() {
        let message = exception
            .message()
            .unwrap_or_else(|| "uncaught exception".to_string());
        return match exception.stack() {
            Some(stack) if !stack.trim().is_empty() => format!("{message}\n{stack}"),
            _ => message,
        };
    }
    caught
        .as_string()
        .and_then(|s| s.to_string().ok())
        .unwrap_or_else(|| "uncaught exception".to_string())
}

// =============================================================================
// Natives
// =============================================================================

/// Native `__devpg_sql__(text)`: returns a JSON reply with the output.
#[allow(clippy::needless_pass_by_value)] // Required for rquickjs FFI
fn native_sql(statement: String) -> rquickjs::Result<String> {
    HOST_BRIDGE.with(|cell| {
        let bridge = cell.borrow();
        let bridge = bridge.as_ref().ok_or(rquickjs::Error::Exception)?;

        let (response_tx, response_rx) = std::sync::mpsc::channel();
        let reply = bridge
            .tx
            .send(HostMessage::Sql {
                statement,
                response_tx,
            })
            .map_err(|_| "seed runner is gone".to_string())
            .and_then(|()| {
                response_rx
                    .recv()
                    .map_err(|_| "seed runner dropped the query".to_string())?
            });

        Ok(NativeReply::from_result(reply).to_json())
    })
}

/// Native `__devpg_log__(stream, text)`.
#[allow(clippy::needless_pass_by_value)] // Required for rquickjs FFI
fn native_log(stream: String, text: String) -> rquickjs::Result<()> {
    HOST_BRIDGE.with(|cell| {
        let bridge = cell.borrow();
        let bridge = bridge.as_ref().ok_or(rquickjs::Error::Exception)?;
        let stream = if stream == "stderr" {
            OutputStream::Stderr
        } else {
            OutputStream::Stdout
        };
        // A closed channel means the runner is gone; the output has nowhere to go.
        let _ = bridge.tx.send(HostMessage::Log { stream, text });
        Ok(())
    })
}

/// Native `__devpg_load__(dir, specifier)`: resolves, reads and translates a
/// required module.
#[allow(clippy::needless_pass_by_value)] // Required for rquickjs FFI
fn native_load(dir: String, specifier: String) -> rquickjs::Result<String> {
    HOST_BRIDGE.with(|cell| {
        let mut bridge = cell.borrow_mut();
        let bridge = bridge.as_mut().ok_or(rquickjs::Error::Exception)?;

        let loaded = load_module(bridge.translator.as_ref(), Path::new(&dir), &specifier)
            .map_err(|e| match e {
                Error::Compile { .. } => {
                    let message = e.to_string();
                    bridge.compile_error.get_or_insert(e);
                    message
                },
                other => other.to_string(),
            });
        Ok(NativeReply::from_result(loaded).to_json())
    })
}

fn load_module(
    translator: &dyn ScriptTranslator,
    dir: &Path,
    specifier: &str,
) -> Result<LoadedModule> {
    let path = resolve_module(dir, specifier)?;
    let source = std::fs::read_to_string(&path)
        .map_err(|e| Error::io(format!("reading module {}", path.display()), e))?;
    let json = path.extension().is_some_and(|e| e == "json");
    let source = if json {
        source
    } else {
        translator.prepare(source, &path)?
    };

    Ok(LoadedModule {
        dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        path,
        json,
        source,
    })
}

/// Resolve a `require` specifier relative to `dir`.
///
/// Tries the exact path, then each known extension, then an `index` file in
/// a directory of that name.
fn resolve_module(dir: &Path, specifier: &str) -> Result<PathBuf> {
    let relative = specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../");
    if !relative && !Path::new(specifier).is_absolute() {
        return Err(Error::Config(format!(
            "cannot find module '{specifier}': only relative paths and \"devpg\" can be required"
        )));
    }

    let base = dir.join(specifier);
    let with_extension = MODULE_EXTENSIONS.iter().map(|ext| {
        let mut candidate = base.clone().into_os_string();
        candidate.push(".");
        candidate.push(ext);
        PathBuf::from(candidate)
    });
    let index = MODULE_EXTENSIONS
        .iter()
        .map(|ext| base.join(format!("index.{ext}")));

    std::iter::once(base.clone())
        .chain(with_extension)
        .chain(index)
        .find(|candidate| candidate.is_file())
        .and_then(|found| std::fs::canonicalize(found).ok())
        .ok_or_else(|| {
            Error::Config(format!(
                "cannot find module '{specifier}' from {}",
                dir.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Strips `: number` annotations; enough TypeScript for these tests.
    struct StripAnnotations;

    impl ScriptTranslator for StripAnnotations {
        fn translate(&self, source: &str, _path: &Path) -> Result<String> {
            Ok(source.replace(": number", ""))
        }
    }

    /// Fails every translation.
    struct Rejecting;

    impl ScriptTranslator for Rejecting {
        fn translate(&self, _source: &str, path: &Path) -> Result<String> {
            Err(Error::compile(path, "Expected \";\" but found \"x\""))
        }
    }

    type Lines = Arc<Mutex<Vec<(OutputStream, String)>>>;

    fn capturing() -> (IoDisposition, Lines) {
        let lines: Lines = Arc::default();
        let sink = lines.clone();
        let stdio = IoDisposition::callback(move |stream, line| {
            sink.lock().unwrap().push((stream, line.to_string()));
        });
        (stdio, lines)
    }

    fn stdout(lines: &Lines) -> Vec<String> {
        lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(stream, _)| *stream == OutputStream::Stdout)
            .map(|(_, line)| line.clone())
            .collect()
    }

    fn write(dir: &TempDir, name: &str, source: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, source).unwrap();
        path
    }

    /// Toolchain whose binaries do not exist; `sql()` calls fail.
    fn missing_toolchain() -> Toolchain {
        Toolchain::new(Some(PathBuf::from("/nonexistent/devpg-test/bin")))
    }

    async fn run(path: &Path, translator: Arc<dyn ScriptTranslator>) -> (Result<()>, Lines) {
        let (stdio, lines) = capturing();
        let result = run_script(path, 8432, "main", &missing_toolchain(), translator, &stdio).await;
        (result, lines)
    }

    #[tokio::test]
    async fn test_script_sees_context_and_env() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "seed.js",
            "console.log(devpg.port, devpg.database);\n\
             console.log(process.env.PGPORT + '/' + process.env.PGDATABASE);\n\
             console.log(require('devpg') === devpg);",
        );

        let (result, lines) = run(&path, Arc::new(StripAnnotations)).await;
        result.unwrap();
        assert_eq!(stdout(&lines), ["8432 main", "8432/main", "true"]);
    }

    #[tokio::test]
    async fn test_filename_and_dirname() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "seed.js", "console.log(__filename); console.log(__dirname);");
        let canonical = std::fs::canonicalize(&path).unwrap();

        let (result, lines) = run(&path, Arc::new(StripAnnotations)).await;
        result.unwrap();
        assert_eq!(
            stdout(&lines),
            [
                canonical.display().to_string(),
                canonical.parent().unwrap().display().to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_env_writes_stay_in_script() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "seed.js", "process.env.DEVPG_SCRIPT_ONLY = 'set';");

        let (result, _) = run(&path, Arc::new(StripAnnotations)).await;
        result.unwrap();
        assert!(std::env::var_os("DEVPG_SCRIPT_ONLY").is_none());
    }

    #[tokio::test]
    async fn test_require_relative_modules() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        write(&dir, "lib/index.js", "exports.rows = require('./rows.json').length;");
        write(&dir, "lib/rows.json", "[1, 2, 3]");
        write(&dir, "counter.ts", "let n: number = 0; module.exports = () => ++n;");
        let path = write(
            &dir,
            "seed.js",
            "const lib = require('./lib');\n\
             const a = require('./counter');\n\
             const b = require('./counter.ts');\n\
             a(); b();\n\
             console.log(lib.rows, a === b, a());",
        );

        let (result, lines) = run(&path, Arc::new(StripAnnotations)).await;
        result.unwrap();
        assert_eq!(stdout(&lines), ["3 true 3"]);
    }

    #[tokio::test]
    async fn test_bare_specifier_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "seed.js", "require('left-pad');");

        let (result, _) = run(&path, Arc::new(StripAnnotations)).await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Seed { .. }));
        assert!(err.to_string().contains("left-pad"));
    }

    #[tokio::test]
    async fn test_top_level_await_and_default_export() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "seed.js",
            "const value = await Promise.resolve(41);\n\
             exports.default = async function (db) { console.log(value + 1, db.database); };",
        );

        let (result, lines) = run(&path, Arc::new(StripAnnotations)).await;
        result.unwrap();
        assert_eq!(stdout(&lines), ["42 main"]);
    }

    #[tokio::test]
    async fn test_exported_helper_is_not_called() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "seed.js",
            "console.log('body');\n\
             module.exports = function () { console.log('helper'); };\n\
             module.exports.named = function () { console.log('named'); };",
        );

        let (result, lines) = run(&path, Arc::new(StripAnnotations)).await;
        result.unwrap();
        assert_eq!(stdout(&lines), ["body"]);
    }

    #[tokio::test]
    async fn test_thrown_error_is_seed_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "seed.js", "console.log('before'); throw new Error('bad seed');");

        let (result, lines) = run(&path, Arc::new(StripAnnotations)).await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Seed { .. }));
        assert!(err.to_string().contains("bad seed"));
        assert_eq!(stdout(&lines), ["before"]);
    }

    #[tokio::test]
    async fn test_rejected_promise_is_seed_error() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "seed.js",
            "await null; await Promise.reject(new TypeError('late failure'));",
        );

        let (result, _) = run(&path, Arc::new(StripAnnotations)).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("late failure"));
    }

    #[tokio::test]
    async fn test_never_settling_promise_fails() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "seed.js", "await new Promise(function () {});");

        let (result, _) = run(&path, Arc::new(StripAnnotations)).await;
        assert!(result.unwrap_err().to_string().contains("never settle"));
    }

    #[tokio::test]
    async fn test_syntax_error_is_seed_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "seed.js", "let = = 1;");

        let (result, _) = run(&path, Arc::new(StripAnnotations)).await;
        assert!(matches!(result.unwrap_err(), Error::Seed { .. }));
    }

    #[tokio::test]
    async fn test_sql_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "seed.js", "devpg.sql('SELECT 1');");

        let (result, _) = run(&path, Arc::new(StripAnnotations)).await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Seed { .. }));
        assert!(err.to_string().contains("psql"));
    }

    #[tokio::test]
    async fn test_sql_failure_can_be_caught() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "seed.js",
            "try { devpg.sql('SELECT 1'); } catch (e) { console.error('handled'); }",
        );

        let (result, lines) = run(&path, Arc::new(StripAnnotations)).await;
        result.unwrap();
        assert!(
            lines
                .lock()
                .unwrap()
                .contains(&(OutputStream::Stderr, "handled".to_string()))
        );
    }

    #[tokio::test]
    async fn test_entry_translation_failure_is_compile_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "seed.ts", "let x: number = ;");

        let (result, _) = run(&path, Arc::new(Rejecting)).await;
        assert!(matches!(result.unwrap_err(), Error::Compile { .. }));
    }

    #[tokio::test]
    async fn test_required_translation_failure_is_compile_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "helper.ts", "export const x: number = ;");
        let path = write(&dir, "seed.js", "require('./helper');");

        let (result, _) = run(&path, Arc::new(Rejecting)).await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Compile { .. }));
        assert!(err.to_string().contains("helper.ts"));
    }

    #[tokio::test]
    async fn test_missing_script() {
        let dir = TempDir::new().unwrap();
        let (result, _) = run(&dir.path().join("nope.js"), Arc::new(StripAnnotations)).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("cannot read script"));
    }

    #[test]
    fn test_query_result_drops_only_final_line_breaks() {
        assert_eq!(query_result("42\n"), "42");
        assert_eq!(query_result("1|alice\n2|bob\n"), "1|alice\n2|bob");
        assert_eq!(query_result("  padded  \r\n"), "  padded  ");
        assert_eq!(query_result(""), "");
    }

    #[test]
    fn test_resolve_module_candidates() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.ts", "");
        std::fs::create_dir(dir.path().join("pkg")).unwrap();
        write(&dir, "pkg/index.js", "");
        let root = std::fs::canonicalize(dir.path()).unwrap();

        assert_eq!(resolve_module(dir.path(), "./a").unwrap(), root.join("a.ts"));
        assert_eq!(resolve_module(dir.path(), "./pkg").unwrap(), root.join("pkg/index.js"));
        assert!(resolve_module(dir.path(), "./missing").is_err());
        assert!(resolve_module(dir.path(), "pkg").is_err());
    }

    #[test]
    fn test_wrap_entry_keeps_trailing_comment_inside() {
        let wrapped = wrap_entry("run() // trailing");
        assert!(wrapped.ends_with("// trailing\n});"));
    }
}
