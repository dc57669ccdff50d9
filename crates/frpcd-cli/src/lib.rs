//! frpcd command-line interface.
//!
//! `main.rs` is the composition root. This library holds the parser,
//! bootstrap and handlers so they can be tested without a binary.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;

// Used by main.rs binary
use dotenvy as _;

pub mod bootstrap;
pub mod commands;
pub mod handlers;
pub mod logging;
pub mod parser;
pub mod stdio;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use logging::init_tracing;
pub use parser::Cli;
pub use stdio::{LineObserver, StdioObserver};
