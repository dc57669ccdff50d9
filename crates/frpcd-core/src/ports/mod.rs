//! Port definitions (traits) implemented by the runtime and its adapters.

mod download_progress;
mod observer;
mod service;

pub use download_progress::{DownloadProgressPort, NoopProgress};
pub use observer::{ConnectionError, ObserverConnection};
pub use service::ServicePort;
