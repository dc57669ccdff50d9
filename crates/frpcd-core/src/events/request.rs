//! Inbound observer requests.
//!
//! Requests are parsed once at the hub boundary into a closed enum. Unknown
//! request types deserialize to [`ObserverRequest::Unknown`] and are ignored.

use serde::Deserialize;

/// A request sent by an observer over its connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObserverRequest {
    /// Reply with the last N log lines as a single `log` message.
    GetLog {
        #[serde(default)]
        lines: Option<usize>,
    },
    /// Truncate the log and reply with an empty `log` message.
    ClearLog,
    /// Subscribe to periodic `service_status` pushes.
    GetStatus,
    /// Reply once with the current `service_status`.
    GetServiceStatus,
    /// Subscribe to `download_progress` messages.
    StartDownloadProgress,
    /// Any other request type.
    #[serde(other)]
    Unknown,
}

impl ObserverRequest {
    /// Parse a request from its JSON text.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_requests() {
        assert_eq!(
            ObserverRequest::parse(r#"{"type":"get_log"}"#).unwrap(),
            ObserverRequest::GetLog { lines: None }
        );
        assert_eq!(
            ObserverRequest::parse(r#"{"type":"get_log","lines":20}"#).unwrap(),
            ObserverRequest::GetLog { lines: Some(20) }
        );
        assert_eq!(
            ObserverRequest::parse(r#"{"type":"clear_log"}"#).unwrap(),
            ObserverRequest::ClearLog
        );
        assert_eq!(
            ObserverRequest::parse(r#"{"type":"get_status"}"#).unwrap(),
            ObserverRequest::GetStatus
        );
        assert_eq!(
            ObserverRequest::parse(r#"{"type":"start_download_progress"}"#).unwrap(),
            ObserverRequest::StartDownloadProgress
        );
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        assert_eq!(
            ObserverRequest::parse(r#"{"type":"reboot_host"}"#).unwrap(),
            ObserverRequest::Unknown
        );
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(ObserverRequest::parse("get_log").is_err());
        assert!(ObserverRequest::parse(r#"{"kind":"get_log"}"#).is_err());
    }
}
