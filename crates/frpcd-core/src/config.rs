//! Supervisor and connectivity configuration.
//!
//! Configuration is environment-driven. The binary loads `.env` with
//! `dotenvy` before calling [`SupervisorConfig::from_env`]; tests use
//! [`SupervisorConfig::from_lookup`] with a closure so no process-wide
//! environment mutation is needed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::paths::{PathError, current_dir};

/// File name of the managed process log inside the log directory.
pub const LOG_FILE_NAME: &str = "frpc.log";

/// Application log file used when `LOG_FILE` is unset.
pub const DEFAULT_APP_LOG_FILE: &str = "/var/log/frpc-web/app.log";

pub const DEFAULT_STATUS_PUSH_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_TAIL_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_START_GRACE_PERIOD: Duration = Duration::from_millis(2000);
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_LOG_SNAPSHOT_LINES: usize = 100;

pub const DEFAULT_NETWORK_CHECK_INTERVAL: Duration = Duration::from_secs(1800);
pub const DEFAULT_NETWORK_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_NETWORK_CHECK_HOSTS: &str = "8.8.8.8,114.114.114.114";

/// Configuration error naming the offending variable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Everything the supervisor, tailer and hub need to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Path of the `frpc` executable
    pub executable_path: PathBuf,
    /// Path passed to the executable as `-c <config>`
    pub config_path: PathBuf,
    /// Directory holding the managed log file
    pub log_dir: PathBuf,
    /// Interval between status polls of each pusher
    pub status_push_interval: Duration,
    /// Sleep between tail reads when no new line is available
    pub tail_poll_interval: Duration,
    /// Wait after launch before verifying the process is alive
    pub start_grace_period: Duration,
    /// Wait after SIGTERM before escalating to SIGKILL
    pub terminate_timeout: Duration,
    /// Upper bound for a single observer send
    pub send_timeout: Duration,
    /// Default line count for log snapshots
    pub log_snapshot_lines: usize,
}

impl SupervisorConfig {
    /// Create a configuration with default timings.
    pub fn new(
        executable_path: impl Into<PathBuf>,
        config_path: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executable_path: executable_path.into(),
            config_path: config_path.into(),
            log_dir: log_dir.into(),
            status_push_interval: DEFAULT_STATUS_PUSH_INTERVAL,
            tail_poll_interval: DEFAULT_TAIL_POLL_INTERVAL,
            start_grace_period: DEFAULT_START_GRACE_PERIOD,
            terminate_timeout: DEFAULT_TERMINATE_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            log_snapshot_lines: DEFAULT_LOG_SNAPSHOT_LINES,
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cwd = current_dir()?;
        Self::from_lookup(&cwd, |key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup, resolving defaults against `cwd`.
    pub fn from_lookup<F>(cwd: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let executable_path = lookup("FRPC_PATH")
            .filter(|v| !v.is_empty())
            .map_or_else(|| cwd.join("frpc"), PathBuf::from);
        let config_path = lookup("FRPC_CONFIG")
            .filter(|v| !v.is_empty())
            .map_or_else(|| cwd.join("frpc.json"), PathBuf::from);

        let log_dir = match lookup("FRPC_LOG_DIR").filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => app_log_file(&lookup)
                .and_then(|file| file.parent().map(Path::to_path_buf))
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| cwd.join("logs")),
        };

        let mut config = Self::new(executable_path, config_path, log_dir);
        if let Some(d) = duration_ms(&lookup, "FRPCD_STATUS_PUSH_INTERVAL_MS")? {
            config.status_push_interval = d;
        }
        if let Some(d) = duration_ms(&lookup, "FRPCD_TAIL_POLL_INTERVAL_MS")? {
            config.tail_poll_interval = d;
        }
        if let Some(d) = duration_ms(&lookup, "FRPCD_START_GRACE_MS")? {
            config.start_grace_period = d;
        }
        if let Some(d) = duration_ms(&lookup, "FRPCD_STOP_TIMEOUT_MS")? {
            config.terminate_timeout = d;
        }
        if let Some(d) = duration_ms(&lookup, "FRPCD_SEND_TIMEOUT_MS")? {
            config.send_timeout = d;
        }
        if let Some(n) = positive(&lookup, "FRPCD_LOG_SNAPSHOT_LINES")? {
            config.log_snapshot_lines = usize::try_from(n).unwrap_or(usize::MAX);
        }
        Ok(config)
    }

    /// Path of the managed log file.
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_NAME)
    }

    /// File name of the executable, used in log annotations and process matching.
    pub fn executable_name(&self) -> String {
        self.executable_path
            .file_name()
            .map_or_else(|| "frpc".to_string(), |n| n.to_string_lossy().into_owned())
    }

    #[must_use]
    pub const fn with_status_push_interval(mut self, interval: Duration) -> Self {
        self.status_push_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_tail_poll_interval(mut self, interval: Duration) -> Self {
        self.tail_poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_start_grace_period(mut self, grace: Duration) -> Self {
        self.start_grace_period = grace;
        self
    }

    #[must_use]
    pub const fn with_terminate_timeout(mut self, timeout: Duration) -> Self {
        self.terminate_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}

/// Connectivity monitor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Interval between connectivity checks
    pub check_interval: Duration,
    /// Hosts probed in order; any answer means online
    pub hosts: Vec<String>,
    /// Per-probe timeout
    pub timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_NETWORK_CHECK_INTERVAL,
            hosts: split_hosts(DEFAULT_NETWORK_CHECK_HOSTS),
            timeout: DEFAULT_NETWORK_CHECK_TIMEOUT,
        }
    }
}

impl NetworkConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(secs) = positive(&lookup, "NETWORK_CHECK_INTERVAL")? {
            config.check_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = positive(&lookup, "NETWORK_CHECK_TIMEOUT")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(hosts) = lookup("NETWORK_CHECK_HOSTS") {
            let hosts = split_hosts(&hosts);
            if hosts.is_empty() {
                return Err(ConfigError::InvalidValue {
                    var: "NETWORK_CHECK_HOSTS",
                    value: String::new(),
                    reason: "at least one host is required".to_string(),
                });
            }
            config.hosts = hosts;
        }
        Ok(config)
    }
}

/// Application log file from `LOG_FILE`, or the default. An empty value
/// disables the application file log.
pub fn app_log_file<F>(lookup: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup("LOG_FILE") {
        Some(v) if v.is_empty() => None,
        Some(v) => Some(PathBuf::from(v)),
        None => Some(PathBuf::from(DEFAULT_APP_LOG_FILE)),
    }
}

fn split_hosts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

fn positive<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        })?;
    if value == 0 {
        return Err(ConfigError::Zero { var });
    }
    Ok(Some(value))
}

fn duration_ms<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(positive(lookup, var)?.map(Duration::from_millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_resolve_against_cwd() {
        let cwd = Path::new("/srv/frpc-web");
        let config = SupervisorConfig::from_lookup(cwd, lookup_from(&[])).unwrap();

        assert_eq!(config.executable_path, cwd.join("frpc"));
        assert_eq!(config.config_path, cwd.join("frpc.json"));
        assert_eq!(config.log_dir, PathBuf::from("/var/log/frpc-web"));
        assert_eq!(config.log_path(), PathBuf::from("/var/log/frpc-web/frpc.log"));
        assert_eq!(config.status_push_interval, Duration::from_millis(2000));
        assert_eq!(config.tail_poll_interval, Duration::from_millis(100));
        assert_eq!(config.start_grace_period, Duration::from_millis(2000));
        assert_eq!(config.terminate_timeout, Duration::from_millis(5000));
        assert_eq!(config.log_snapshot_lines, 100);
    }

    #[test]
    fn test_log_dir_precedence() {
        let cwd = Path::new("/srv");
        let explicit = SupervisorConfig::from_lookup(
            cwd,
            lookup_from(&[("FRPC_LOG_DIR", "/tmp/frpc"), ("LOG_FILE", "/data/app.log")]),
        )
        .unwrap();
        assert_eq!(explicit.log_dir, PathBuf::from("/tmp/frpc"));

        let from_app_log =
            SupervisorConfig::from_lookup(cwd, lookup_from(&[("LOG_FILE", "/data/app.log")]))
                .unwrap();
        assert_eq!(from_app_log.log_dir, PathBuf::from("/data"));

        let disabled =
            SupervisorConfig::from_lookup(cwd, lookup_from(&[("LOG_FILE", "")])).unwrap();
        assert_eq!(disabled.log_dir, cwd.join("logs"));
    }

    #[test]
    fn test_timing_overrides() {
        let config = SupervisorConfig::from_lookup(
            Path::new("/srv"),
            lookup_from(&[
                ("FRPCD_START_GRACE_MS", "250"),
                ("FRPCD_TAIL_POLL_INTERVAL_MS", "20"),
                ("FRPCD_LOG_SNAPSHOT_LINES", "10"),
            ]),
        )
        .unwrap();
        assert_eq!(config.start_grace_period, Duration::from_millis(250));
        assert_eq!(config.tail_poll_interval, Duration::from_millis(20));
        assert_eq!(config.log_snapshot_lines, 10);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = SupervisorConfig::from_lookup(
            Path::new("/srv"),
            lookup_from(&[("FRPCD_STOP_TIMEOUT_MS", "soon")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("FRPCD_STOP_TIMEOUT_MS"));

        let err = SupervisorConfig::from_lookup(
            Path::new("/srv"),
            lookup_from(&[("FRPCD_TAIL_POLL_INTERVAL_MS", "0")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Zero { .. }));
    }

    #[test]
    fn test_network_config() {
        let config = NetworkConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.hosts, vec!["8.8.8.8", "114.114.114.114"]);
        assert_eq!(config.check_interval, Duration::from_secs(1800));

        let config = NetworkConfig::from_lookup(lookup_from(&[
            ("NETWORK_CHECK_HOSTS", " 1.1.1.1 , ,9.9.9.9"),
            ("NETWORK_CHECK_TIMEOUT", "2"),
        ]))
        .unwrap();
        assert_eq!(config.hosts, vec!["1.1.1.1", "9.9.9.9"]);
        assert_eq!(config.timeout, Duration::from_secs(2));

        assert!(NetworkConfig::from_lookup(lookup_from(&[("NETWORK_CHECK_HOSTS", ",")])).is_err());
    }

    #[test]
    fn test_executable_name() {
        let config = SupervisorConfig::new("/opt/frp/frpc", "/etc/frpc.json", "/tmp");
        assert_eq!(config.executable_name(), "frpc");
    }
}
