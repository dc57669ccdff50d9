//! Download progress port.
//!
//! The download/install workflow lives outside this workspace. It reports
//! progress through this port; the broadcast hub is the production
//! implementation.

use async_trait::async_trait;

use crate::events::DownloadProgress;

/// Sink for download progress reports.
#[async_trait]
pub trait DownloadProgressPort: Send + Sync {
    /// Publish the latest progress to everyone subscribed to it.
    async fn publish(&self, progress: DownloadProgress);
}

/// A progress sink that discards every report.
///
/// Useful for running the download workflow where no observer can exist.
#[derive(Debug, Clone, Default)]
pub struct NoopProgress;

#[async_trait]
impl DownloadProgressPort for NoopProgress {
    async fn publish(&self, _progress: DownloadProgress) {
        // Intentionally do nothing
    }
}
