//! Service port consumed by the broadcast hub.
//!
//! The hub depends on the supervisor only through this read-mostly surface,
//! which keeps observer handling testable without a real process.

use crate::domain::StatusSnapshot;

/// Status and log access the hub needs from the supervisor.
///
/// All methods are synchronous and bounded: a process-table scan or a single
/// read/truncate of the log file.
pub trait ServicePort: Send + Sync {
    /// Fresh status computed from the process table.
    fn status(&self) -> StatusSnapshot;

    /// Last `lines` non-empty, ANSI-stripped log lines in file order.
    fn recent_logs(&self, lines: usize) -> Vec<String>;

    /// Truncate the log and drain pending deliveries. Returns `true` on success.
    fn clear_logs(&self) -> bool;
}
