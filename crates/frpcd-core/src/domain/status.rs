//! Service state and operation results.
//!
//! These values cross the operation boundary to the outer layers (HTTP
//! handlers, CLI). They carry no behaviour beyond construction helpers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SupervisorError;

/// Lifecycle state of the managed process.
///
/// The state is recomputed from the process table on every query; it is
/// never stored as the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// No matching process is alive
    Stopped,
    /// A start is inside its verification grace window
    Starting,
    /// A matching process is alive
    Running,
    /// No process is alive and a sticky error is recorded
    Error,
}

impl ServiceState {
    /// Wire name used in `service_status` messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time status of the managed process.
///
/// Equality is used by status pushers to suppress unchanged updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Current lifecycle state
    pub state: ServiceState,
    /// PID of the live match, if any
    pub pid: Option<u32>,
    /// Sticky error message, empty when no error is recorded
    pub error_message: String,
}

impl StatusSnapshot {
    /// Snapshot for a live process.
    pub fn running(pid: u32, error_message: impl Into<String>) -> Self {
        Self {
            state: ServiceState::Running,
            pid: Some(pid),
            error_message: error_message.into(),
        }
    }

    /// Snapshot for a process that is not alive.
    pub const fn stopped() -> Self {
        Self {
            state: ServiceState::Stopped,
            pid: None,
            error_message: String::new(),
        }
    }

    /// Whether a live match was found.
    pub const fn is_running(&self) -> bool {
        matches!(self.state, ServiceState::Running)
    }
}

/// Plain result of a supervisor operation.
///
/// Every operation on the public surface returns one of these; failures are
/// never raised across the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub success: bool,
    pub message: String,
}

impl OperationOutcome {
    /// A successful outcome.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// A failed outcome.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<Result<String, SupervisorError>> for OperationOutcome {
    fn from(result: Result<String, SupervisorError>) -> Self {
        match result {
            Ok(message) => Self::ok(message),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_wire_names() {
        assert_eq!(ServiceState::Running.as_str(), "running");
        assert_eq!(ServiceState::Stopped.as_str(), "stopped");
        assert_eq!(ServiceState::Error.as_str(), "error");
        assert_eq!(
            serde_json::to_string(&ServiceState::Starting).unwrap(),
            "\"starting\""
        );
    }

    #[test]
    fn test_outcome_from_error() {
        let outcome: OperationOutcome = Err(SupervisorError::NotRunning).into();
        assert!(!outcome.success);
        assert!(outcome.message.contains("not running"));
    }

    #[test]
    fn test_outcome_from_ok() {
        let outcome: OperationOutcome = Ok("frpc stopped".to_string()).into();
        assert!(outcome.success);
        assert_eq!(outcome.message, "frpc stopped");
    }
}
