//! Terminate a managed process by PID with SIGTERM → SIGKILL escalation.
//!
//! No `Child` handle is assumed: the process may have been launched by a
//! previous supervisor instance.

use std::time::Duration;

use frpcd_core::SupervisorError;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use super::scan::process_alive;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long a process may survive SIGKILL before giving up.
pub const FORCE_KILL_WAIT: Duration = Duration::from_secs(2);

/// Poll until `pid` disappears or `limit` elapses. Returns `true` if it exited.
async fn wait_for_exit(pid: u32, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        if !process_alive(pid) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Terminate `pid`.
///
/// # Strategy
/// 1. Send SIGTERM
/// 2. Poll for up to `graceful` to verify exit
/// 3. If still alive, send SIGKILL
/// 4. Poll for up to [`FORCE_KILL_WAIT`] again
///
/// A process that is already gone counts as terminated.
pub async fn terminate_pid(pid: u32, graceful: Duration) -> Result<(), SupervisorError> {
    #[cfg(unix)]
    {
        terminate_unix(pid, graceful).await
    }

    #[cfg(not(unix))]
    {
        let _ = graceful;
        Err(SupervisorError::TerminateFailure {
            pid,
            reason: "signals are not supported on this platform".to_string(),
        })
    }
}

#[cfg(unix)]
async fn terminate_unix(pid: u32, graceful: Duration) -> Result<(), SupervisorError> {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| SupervisorError::TerminateFailure {
        pid,
        reason: "PID out of range".to_string(),
    })?;
    let nix_pid = Pid::from_raw(raw);

    let send = |sig: Signal| -> Result<bool, SupervisorError> {
        match signal::kill(nix_pid, sig) {
            Ok(()) => Ok(true),
            // Already gone
            Err(Errno::ESRCH) => Ok(false),
            Err(e) => Err(SupervisorError::TerminateFailure {
                pid,
                reason: format!("{sig}: {e}"),
            }),
        }
    };

    // Phase 1: SIGTERM
    if !send(Signal::SIGTERM)? {
        return Ok(());
    }
    debug!(pid = %pid, "Sent SIGTERM");
    if wait_for_exit(pid, graceful).await {
        return Ok(());
    }

    // Phase 2: SIGKILL
    warn!(pid = %pid, "Process ignored SIGTERM, sending SIGKILL");
    if !send(Signal::SIGKILL)? {
        return Ok(());
    }
    if wait_for_exit(pid, FORCE_KILL_WAIT).await {
        return Ok(());
    }

    Err(SupervisorError::TerminateFailure {
        pid,
        reason: "process did not exit after SIGKILL".to_string(),
    })
}
