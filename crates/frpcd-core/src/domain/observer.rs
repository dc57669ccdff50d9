//! Observer identity and subscription kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier assigned by the hub when an observer connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObserverId(u64);

impl ObserverId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Event streams an observer can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subscription {
    /// Tailed log lines (every observer is subscribed on connect)
    Logs,
    /// Periodic `service_status` pushes
    Status,
    /// Download progress reports
    DownloadProgress,
}
