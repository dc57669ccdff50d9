//! Domain types shared by the runtime and its adapters.

mod log;
mod observer;
mod status;

pub use log::LogLine;
pub use observer::{ObserverId, Subscription};
pub use status::{OperationOutcome, ServiceState, StatusSnapshot};
