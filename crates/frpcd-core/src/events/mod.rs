//! Observer-facing message schema.
//!
//! Outbound messages ([`BroadcastMessage`]) and inbound requests
//! ([`ObserverRequest`]) are closed enums tagged by a `type` field on the
//! wire. Transport adapters only ever see the serialized JSON text.

mod broadcast;
mod download;
mod request;

pub use broadcast::BroadcastMessage;
pub use download::DownloadProgress;
pub use request::ObserverRequest;
