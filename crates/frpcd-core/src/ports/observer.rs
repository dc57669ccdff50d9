//! Observer connection port.
//!
//! Abstracts the transport that carries messages to one connected observer
//! (a WebSocket in the web layer, stdio in the CLI, a channel in tests).

use async_trait::async_trait;
use thiserror::Error;

/// Failure to deliver a frame to an observer.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The peer has gone away.
    #[error("connection closed")]
    Closed,

    /// The transport rejected the frame.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Outbound half of a live observer connection.
///
/// The hub serializes every message before calling [`send`](Self::send), so
/// implementations only move text frames. The hub never calls `send`
/// concurrently for the same connection.
#[async_trait]
pub trait ObserverConnection: Send + Sync {
    /// Deliver one text frame.
    async fn send(&self, frame: String) -> Result<(), ConnectionError>;
}
