//! Server lifecycle: discovery, port allocation, launch and shutdown.
//!
//! Each data directory is served by at most one postgres process. Before
//! starting a server, the liveness marker in the directory is checked and a
//! live server is adopted instead of started twice.
//!
//! ## Module Structure
//!
//! - [`marker`]: Parsing the postmaster liveness marker
//! - [`lock`]: Advisory lock serializing startup per data directory
//! - [`probe`]: Readiness probing
//! - [`port`]: Adopting a live server or allocating a free port
//! - [`launcher`]: Spawning postgres
//! - [`handle`]: Closing started servers, ignoring adopted ones
//! - [`process`]: Signals and pid liveness

pub mod handle;
pub mod launcher;
pub mod lock;
pub mod marker;
pub mod port;
pub mod probe;
pub mod process;

pub use handle::ServerHandle;
pub use launcher::launch;
pub use lock::DataDirLock;
pub use marker::{LivenessMarker, MarkerState};
pub use port::{PortResolution, find_free_port, resolve_port};
pub use probe::{Attempts, PsqlProbe, ReadinessProbe, poll_ready, wait_ready};
