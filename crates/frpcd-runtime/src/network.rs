//! Connectivity monitoring.
//!
//! The monitor only probes and reports transitions. Reacting to them
//! (restarting the managed process after an outage) is left to the caller.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use frpcd_core::NetworkConfig;
use futures_util::Stream;
use tokio::process::Command;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Result of one connectivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    /// Whether moving from `previous` to `self` is a recovery from an outage.
    pub const fn is_recovery_from(self, previous: Option<Self>) -> bool {
        matches!((previous, self), (Some(Self::Offline), Self::Online))
    }
}

/// Single-host reachability check.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self, host: &str, timeout: Duration) -> bool;
}

/// Probe using one ICMP echo via the system `ping`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingProbe;

#[async_trait]
impl ConnectivityProbe for PingProbe {
    async fn probe(&self, host: &str, limit: Duration) -> bool {
        let wait = limit.as_secs().max(1).to_string();
        let status = Command::new("ping")
            .args(["-c", "1", "-W", &wait, host])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        // ping enforces -W itself; the outer bound covers DNS stalls
        match timeout(limit + Duration::from_secs(1), status).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                debug!(host, error = %e, "ping could not be run");
                false
            }
            Err(_) => false,
        }
    }
}

/// Periodic connectivity monitor.
pub struct NetworkMonitor {
    config: NetworkConfig,
    probe: Arc<dyn ConnectivityProbe>,
    cancel_token: CancellationToken,
}

impl NetworkMonitor {
    pub fn new(
        config: NetworkConfig,
        probe: Arc<dyn ConnectivityProbe>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            probe,
            cancel_token,
        }
    }

    /// Online if any configured host answers. Hosts are tried in order.
    pub async fn check_once(&self) -> Connectivity {
        for host in &self.config.hosts {
            if self.probe.probe(host, self.config.timeout).await {
                debug!(host = %host, "Connectivity check succeeded");
                return Connectivity::Online;
            }
        }
        Connectivity::Offline
    }

    /// Stream of connectivity transitions.
    ///
    /// The first check always yields. Completes when the cancellation token
    /// is triggered.
    pub fn monitor(self) -> impl Stream<Item = Connectivity> {
        stream! {
            let mut ticker = interval(self.config.check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut last: Option<Connectivity> = None;

            debug!(
                hosts = ?self.config.hosts,
                interval = ?self.config.check_interval,
                "Starting network monitor"
            );

            loop {
                tokio::select! {
                    () = self.cancel_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let current = tokio::select! {
                    () = self.cancel_token.cancelled() => break,
                    current = self.check_once() => current,
                };

                if last != Some(current) {
                    last = Some(current);
                    yield current;
                }
            }

            debug!("Network monitor stopped");
        }
    }
}
