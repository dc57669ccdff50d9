//! Download progress reported by the install workflow.

use serde::{Deserialize, Serialize};

/// Progress of the external download/install workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Human-readable progress text (e.g. "downloading: 42.0%")
    pub message: String,
    /// The workflow finished, successfully or not
    pub completed: bool,
    /// The workflow failed
    pub error: bool,
    /// Failure description, empty unless `error`
    pub error_message: String,
}

impl DownloadProgress {
    /// An in-flight progress report.
    pub fn in_progress(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// A successful completion report.
    pub fn finished(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            completed: true,
            ..Self::default()
        }
    }

    /// A failed completion report.
    pub fn failed(error_message: impl Into<String>) -> Self {
        let error_message = error_message.into();
        Self {
            message: format!("download failed: {error_message}"),
            completed: true,
            error: true,
            error_message,
        }
    }
}
