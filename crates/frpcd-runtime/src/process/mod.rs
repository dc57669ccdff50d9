//! OS process concerns: table scan, detached spawn, signal-based termination.

mod scan;
mod shutdown;
mod spawn;

pub use scan::{ProcessMatcher, find_matching, find_running, process_alive};
pub use shutdown::{FORCE_KILL_WAIT, terminate_pid};
pub use spawn::{ensure_executable, spawn_detached};
