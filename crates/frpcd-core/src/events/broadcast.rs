//! Outbound messages delivered to observers.

use serde::{Deserialize, Serialize};

use super::download::DownloadProgress;
use crate::domain::{ServiceState, StatusSnapshot};

/// Message fanned out by the broadcast hub.
///
/// Serialized to a JSON object with a `type` discriminator only at the hub
/// boundary; everything inside the process passes the typed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BroadcastMessage {
    /// One tailed line, or a newline-joined snapshot.
    Log { content: String },

    /// Current service status.
    ServiceStatus {
        status: ServiceState,
        pid: Option<u32>,
        error_message: String,
    },

    /// Download workflow progress.
    DownloadProgress {
        message: String,
        completed: bool,
        error: bool,
        error_message: String,
    },
}

impl BroadcastMessage {
    /// Create a log message.
    pub fn log(content: impl Into<String>) -> Self {
        Self::Log {
            content: content.into(),
        }
    }

    /// Create a log message from a snapshot of lines.
    pub fn log_snapshot(lines: &[String]) -> Self {
        Self::Log {
            content: lines.join("\n"),
        }
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<StatusSnapshot> for BroadcastMessage {
    fn from(snapshot: StatusSnapshot) -> Self {
        Self::ServiceStatus {
            status: snapshot.state,
            pid: snapshot.pid,
            error_message: snapshot.error_message,
        }
    }
}

impl From<DownloadProgress> for BroadcastMessage {
    fn from(progress: DownloadProgress) -> Self {
        Self::DownloadProgress {
            message: progress.message,
            completed: progress.completed,
            error: progress.error,
            error_message: progress.error_message,
        }
    }
}
