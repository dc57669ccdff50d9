//! Failure classification over free-text log lines.
//!
//! The pattern table is compiled once and scanned in order; the first
//! matching pattern wins.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Category of a recognised failure line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    AddressUnavailable,
    ConnectionRefused,
    ConnectionReset,
    ConnectionTimeout,
    MissingFile,
    PermissionDenied,
    AddressInUse,
    ProxyStartFailed,
    ServerConnectFailed,
    ServerLoginFailed,
}

impl FailureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddressUnavailable => "address_unavailable",
            Self::ConnectionRefused => "connection_refused",
            Self::ConnectionReset => "connection_reset",
            Self::ConnectionTimeout => "connection_timeout",
            Self::MissingFile => "missing_file",
            Self::PermissionDenied => "permission_denied",
            Self::AddressInUse => "address_in_use",
            Self::ProxyStartFailed => "proxy_start_failed",
            Self::ServerConnectFailed => "server_connect_failed",
            Self::ServerLoginFailed => "server_login_failed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct ErrorPattern {
    regex: Regex,
    kind: FailureKind,
}

const PATTERNS: &[(&str, FailureKind)] = &[
    (
        r"bind: cannot assign requested address",
        FailureKind::AddressUnavailable,
    ),
    (r"connection refused", FailureKind::ConnectionRefused),
    (r"connection reset", FailureKind::ConnectionReset),
    (r"connection timeout", FailureKind::ConnectionTimeout),
    (r"no such file or directory", FailureKind::MissingFile),
    (r"permission denied", FailureKind::PermissionDenied),
    (r"address already in use", FailureKind::AddressInUse),
    (r"failed to start proxy", FailureKind::ProxyStartFailed),
    (r"failed to connect to server", FailureKind::ServerConnectFailed),
    (r"failed to login to server", FailureKind::ServerLoginFailed),
];

static ERROR_PATTERNS: LazyLock<Vec<ErrorPattern>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .filter_map(|(pattern, kind)| {
            Regex::new(&format!("(?i){pattern}"))
                .ok()
                .map(|regex| ErrorPattern { regex, kind: *kind })
        })
        .collect()
});

/// Classify a sanitized log line. Returns the kind of the first matching pattern.
pub fn classify(line: &str) -> Option<FailureKind> {
    ERROR_PATTERNS
        .iter()
        .find(|p| p.regex.is_match(line))
        .map(|p| p.kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(ERROR_PATTERNS.len(), PATTERNS.len());
    }

    #[test]
    fn test_bind_failure() {
        let line = "2024/05/01 10:00:00 [E] bind: cannot assign requested address";
        assert_eq!(classify(line), Some(FailureKind::AddressUnavailable));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            classify("dial tcp 1.2.3.4:7000: Connection Refused"),
            Some(FailureKind::ConnectionRefused)
        );
        assert_eq!(
            classify("LOGIN: FAILED TO LOGIN TO SERVER"),
            Some(FailureKind::ServerLoginFailed)
        );
    }

    #[test]
    fn test_first_pattern_wins() {
        let line = "connection refused; failed to connect to server";
        assert_eq!(classify(line), Some(FailureKind::ConnectionRefused));
    }

    #[test]
    fn test_benign_lines() {
        assert_eq!(classify("[I] [service.go:301] login to server success"), None);
        assert_eq!(classify("start proxy success"), None);
        assert_eq!(classify(""), None);
    }
}
