//! Runtime for frpcd: supervision of the managed `frpc` process, log
//! tailing and classification, and the observer broadcast hub.
//!
//! All background work runs on Tokio tasks with cooperative cancellation.
//! Constructors that spawn tasks must be called within a Tokio runtime.

#![deny(unused_crate_dependencies)]

pub mod classifier;
pub mod error_state;
pub mod hub;
pub mod logfile;
pub mod network;
pub mod process;
pub mod queue;
pub mod supervisor;
pub mod tailer;

pub use classifier::{FailureKind, classify};
pub use hub::{BroadcastHub, HubSettings};
pub use logfile::LogFile;
pub use network::{Connectivity, ConnectivityProbe, NetworkMonitor, PingProbe};
pub use queue::LogQueue;
pub use supervisor::ProcessSupervisor;
pub use tailer::LogTailer;

#[cfg(test)]
use tokio_test as _;
