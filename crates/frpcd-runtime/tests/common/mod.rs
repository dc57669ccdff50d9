//! Shared fixtures: fake `frpc` shell scripts and short-timed configs.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use frpcd_core::SupervisorConfig;

/// Runs until signalled, echoing its arguments first.
///
/// Waits on a backgrounded `sleep` so the shell forks rarely; a fork briefly
/// duplicates the script's command line in the process table.
pub const LONG_RUNNING: &str = "trap 'kill $! 2>/dev/null; exit 0' TERM\n\
     echo \"frpc started with $*\"\n\
     while :; do sleep 30 & wait $!; done";

/// Exits during the start grace period.
pub const EXITS_IMMEDIATELY: &str = "echo \"fatal: cannot read config\"\nexit 1";

/// Stays up but reports a bind failure straight away.
pub const BIND_FAILURE: &str = "trap 'kill $! 2>/dev/null; exit 0' TERM\n\
     echo \"[E] bind: cannot assign requested address\"\n\
     while :; do sleep 30 & wait $!; done";

/// Write an executable `frpc` script into `dir`.
pub fn fake_frpc(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("frpc");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Config rooted in `dir` with timings short enough for tests.
pub fn test_config(dir: &Path, body: &str) -> SupervisorConfig {
    let executable = fake_frpc(dir, body);
    let config_path = dir.join("frpc.json");
    fs::write(&config_path, "{}").unwrap();

    SupervisorConfig::new(executable, config_path, dir.join("logs"))
        .with_tail_poll_interval(Duration::from_millis(20))
        .with_start_grace_period(Duration::from_millis(400))
        .with_terminate_timeout(Duration::from_secs(1))
        .with_status_push_interval(Duration::from_millis(100))
        .with_send_timeout(Duration::from_millis(500))
}

/// Poll `check` every 20ms until it holds or `limit` elapses.
pub async fn wait_until(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

/// Kill `pid` with SIGKILL behind the supervisor's back.
pub fn kill_out_of_band(pid: u32) {
    let status = std::process::Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .status()
        .unwrap();
    assert!(status.success());
}

pub fn log_contents(config: &SupervisorConfig) -> String {
    fs::read_to_string(config.log_path()).unwrap_or_default()
}
