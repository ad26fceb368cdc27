//! Fake PostgreSQL toolchain for integration tests.
//!
//! Each binary is a small shell script that appends its invocation to a call
//! log. The fake `postgres` writes a liveness marker and stays up until it
//! receives SIGINT or SIGTERM; the fake `psql` only answers while a server is
//! up on the requested port and fails any statement containing `FAIL`.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use devpg::{DevServerOptions, IoDisposition, Orchestrator, ServerOptions, Toolchain};
use tempfile::TempDir;

/// Port range used by the tests, away from the default scan start.
pub const TEST_START_PORT: u16 = 18432;

pub struct FakeToolchain {
    root: TempDir,
}

impl FakeToolchain {
    /// Write every fake binary. All scripts exist before any of them runs.
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let fake = Self { root };
        fs::create_dir_all(fake.bin_dir()).unwrap();
        fs::create_dir_all(fake.state_dir()).unwrap();

        let log = fake.log_path();
        let state = fake.state_dir();
        fake.write_bin("initdb", &initdb_script(&log));
        fake.write_bin("createuser", &logging_script("createuser", &log));
        fake.write_bin("postgres", &postgres_script(&log, &state));
        fake.write_bin("psql", &psql_script(&log, &state));
        fake
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.path().join("bin")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.path().join("state")
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.path().join("calls.log")
    }

    /// A data directory path inside the project; not created.
    pub fn data_dir(&self) -> PathBuf {
        self.root.path().join("project").join(".devpg")
    }

    pub fn project_dir(&self) -> PathBuf {
        let dir = self.root.path().join("project");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain::new(Some(self.bin_dir()))
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.toolchain()).with_start_port(TEST_START_PORT)
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions::new(self.data_dir())
            .with_stdio(IoDisposition::Discard)
            .with_startup_timeout(Some(Duration::from_secs(10)))
            .with_lock_timeout(Duration::from_secs(10))
    }

    pub fn dev_options(&self) -> DevServerOptions {
        DevServerOptions::new(self.server_options()).with_database("app")
    }

    /// Invocations recorded so far, one per line.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn calls_of(&self, program: &str) -> Vec<String> {
        let prefix = format!("{program} ");
        self.calls()
            .into_iter()
            .filter(|line| line.starts_with(&prefix))
            .collect()
    }

    fn write_bin(&self, name: &str, script: &str) {
        let path = self.bin_dir().join(name);
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
}

fn logging_script(name: &str, log: &Path) -> String {
    format!(
        "#!/bin/sh\necho \"{name} $*\" >> '{log}'\nexit 0\n",
        log = log.display()
    )
}

fn initdb_script(log: &Path) -> String {
    format!(
        r#"#!/bin/sh
echo "initdb $*" >> '{log}'
while [ $# -gt 0 ]; do
  case "$1" in
    -D) dir="$2"; shift 2;;
    *) shift;;
  esac
done
mkdir -p "$dir" && echo 16 > "$dir/PG_VERSION"
"#,
        log = log.display()
    )
}

fn postgres_script(log: &Path, state: &Path) -> String {
    format!(
        r#"#!/bin/sh
echo "postgres $*" >> '{log}'
while [ $# -gt 0 ]; do
  case "$1" in
    -D) dir="$2"; shift 2;;
    -p) port="$2"; shift 2;;
    *) shift;;
  esac
done
stop() {{
  rm -f "$dir/postmaster.pid" '{state}'/up-"$port"
  exit 0
}}
trap stop INT TERM
printf '%s\n%s\n1718000000\n%s\n' "$$" "$dir" "$port" > "$dir/postmaster.pid"
touch '{state}'/up-"$port"
while :; do
  sleep 0.1 &
  wait $!
done
"#,
        log = log.display(),
        state = state.display()
    )
}

fn psql_script(log: &Path, state: &Path) -> String {
    format!(
        r#"#!/bin/sh
echo "psql $*" >> '{log}'
port=""
file=""
prev=""
for arg in "$@"; do
  [ "$prev" = "-p" ] && port="$arg"
  [ "$prev" = "-f" ] && file="$arg"
  prev="$arg"
done
if [ ! -f '{state}'/up-"$port" ]; then
  echo "psql: could not connect to server on port $port" >&2
  exit 2
fi
if [ -n "$file" ]; then
  contents=$(cat "$file") || exit 1
  echo "file $contents" >> '{log}'
  case "$contents" in
    *FAIL*) echo "ERROR: failure requested" >&2; exit 3;;
  esac
fi
case "$*" in
  *FAIL*) echo "ERROR: failure requested" >&2; exit 3;;
  *"SELECT 42"*) echo "42";;
esac
exit 0
"#,
        log = log.display(),
        state = state.display()
    )
}
