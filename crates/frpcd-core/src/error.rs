//! Supervisor error taxonomy.
//!
//! These errors never cross the operation boundary as faults. The runtime
//! converts them into [`OperationOutcome`](crate::OperationOutcome) values, so
//! every variant renders a message fit for end users.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while supervising the managed process.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A live match already exists in the process table.
    #[error("service is already running (PID {pid})")]
    AlreadyRunning { pid: u32 },

    /// No live match exists in the process table.
    #[error("service is not running")]
    NotRunning,

    /// The process vanished from the process table within the grace period.
    #[error("{0}")]
    StartTimeout(String),

    /// The error classifier flagged early output during the grace period.
    #[error("start failed: {0}")]
    StartRejected(String),

    /// The executable is missing, not executable, or the OS refused to spawn it.
    #[error("failed to launch {path}: {reason}")]
    SpawnFailure { path: PathBuf, reason: String },

    /// The tail loop could not open or read the log file.
    #[error("log read failed for {path}: {reason}")]
    LogReadFailure { path: PathBuf, reason: String },

    /// Truncating or annotating the log file failed.
    #[error("log write failed for {path}: {reason}")]
    LogWrite { path: PathBuf, reason: String },

    /// The log directory cannot be created; the supervisor cannot operate.
    #[error("log directory {path} is unusable: {reason}")]
    LogDirectory { path: PathBuf, reason: String },

    /// Signalling the process failed or it survived a force-kill.
    #[error("failed to stop PID {pid}: {reason}")]
    TerminateFailure { pid: u32, reason: String },

    /// Delivery to an observer failed. Local to the broadcast hub.
    #[error("send to observer failed: {0}")]
    SendFailure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        let err = SupervisorError::AlreadyRunning { pid: 42 };
        assert_eq!(err.to_string(), "service is already running (PID 42)");

        let err = SupervisorError::StartRejected("connection refused".to_string());
        assert_eq!(err.to_string(), "start failed: connection refused");

        let err = SupervisorError::SpawnFailure {
            path: PathBuf::from("/opt/frpc"),
            reason: "executable not found".to_string(),
        };
        assert!(err.to_string().contains("/opt/frpc"));
    }
}
