//! Core types for frpcd, the supervisor of a single `frpc` client process.
//!
//! This crate is free of I/O runtimes. It defines the domain model, the
//! observer message schema, configuration, and the ports the runtime and
//! transport adapters implement.

#![deny(unused_crate_dependencies)]

pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod paths;
pub mod ports;

pub use config::{ConfigError, LOG_FILE_NAME, NetworkConfig, SupervisorConfig, app_log_file};
pub use domain::{
    LogLine, ObserverId, OperationOutcome, ServiceState, StatusSnapshot, Subscription,
};
pub use error::SupervisorError;
pub use events::{BroadcastMessage, DownloadProgress, ObserverRequest};
pub use paths::{PathError, current_dir, ensure_directory, verify_writable};
pub use ports::{
    ConnectionError, DownloadProgressPort, NoopProgress, ObserverConnection, ServicePort,
};
