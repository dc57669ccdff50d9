//! Detached launch of the managed process.

use std::path::Path;
use std::process::Stdio;

use frpcd_core::SupervisorError;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::logfile::LogFile;

fn spawn_failure(path: &Path, reason: impl Into<String>) -> SupervisorError {
    SupervisorError::SpawnFailure {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Check the executable exists and carries execute permission, adding it if missing.
pub fn ensure_executable(path: &Path) -> Result<(), SupervisorError> {
    let metadata = std::fs::metadata(path).map_err(|e| spawn_failure(path, e.to_string()))?;
    if !metadata.is_file() {
        return Err(spawn_failure(path, "not a regular file"));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = metadata.permissions();
        if permissions.mode() & 0o111 == 0 {
            permissions.set_mode(0o755);
            std::fs::set_permissions(path, permissions)
                .map_err(|e| spawn_failure(path, format!("chmod failed: {e}")))?;
            debug!(path = %path.display(), "Added execute permission");
        }
    }

    Ok(())
}

/// Launch `<executable> -c <config>` in its own process group with the log as stdout/stderr.
///
/// The child is not killed on drop; a reaper task waits on it so an exit
/// never leaves a zombie behind. Must be called within a Tokio runtime.
pub fn spawn_detached(
    executable: &Path,
    config: &Path,
    log: &LogFile,
) -> Result<u32, SupervisorError> {
    let stdout = log.open_append()?;
    let stderr = stdout
        .try_clone()
        .map_err(|e| spawn_failure(executable, format!("log handle: {e}")))?;

    let mut cmd = Command::new(executable);
    cmd.arg("-c")
        .arg(config)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .kill_on_drop(false);

    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd
        .spawn()
        .map_err(|e| spawn_failure(executable, e.to_string()))?;
    let Some(pid) = child.id() else {
        return Err(spawn_failure(executable, "process exited before a PID was assigned"));
    };

    info!(pid = %pid, executable = %executable.display(), "Spawned managed process");

    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => info!(pid = %pid, %status, "Managed process exited"),
            Err(e) => warn!(pid = %pid, error = %e, "Failed to reap managed process"),
        }
    });

    Ok(pid)
}
