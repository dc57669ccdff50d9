//! Foreground supervision: `frpcd run`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use frpcd_core::NetworkConfig;
use frpcd_runtime::{Connectivity, NetworkMonitor, PingProbe, ProcessSupervisor};
use futures_util::StreamExt;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bootstrap::CliContext;

const MONITOR_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub auto_start: bool,
    pub network_check: bool,
}

pub async fn execute(ctx: &CliContext, options: RunOptions) -> Result<bool> {
    ctx.hub.spawn_log_drain(ctx.supervisor.log_queue());

    if options.auto_start {
        if ctx.supervisor.auto_start().await.is_none() {
            info!("Auto-start skipped");
        }
    }

    let cancel = CancellationToken::new();
    let monitor = options.network_check.then(|| {
        tokio::spawn(watch_connectivity(
            Arc::clone(&ctx.supervisor),
            ctx.network.clone(),
            cancel.clone(),
        ))
    });

    info!("frpcd running, press Ctrl-C to exit");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down; frpc keeps running");

    cancel.cancel();
    if let Some(monitor) = monitor {
        if timeout(MONITOR_JOIN_TIMEOUT, monitor).await.is_err() {
            warn!("Network monitor did not stop within {:?}", MONITOR_JOIN_TIMEOUT);
        }
    }
    Ok(true)
}

/// Start frpc when connectivity comes back after an outage and it is not running.
async fn watch_connectivity(
    supervisor: Arc<ProcessSupervisor>,
    config: NetworkConfig,
    cancel: CancellationToken,
) {
    let stream = NetworkMonitor::new(config, Arc::new(PingProbe), cancel).monitor();
    tokio::pin!(stream);

    let mut previous: Option<Connectivity> = None;
    while let Some(current) = stream.next().await {
        match current {
            Connectivity::Offline => warn!("Network is offline"),
            Connectivity::Online if current.is_recovery_from(previous) => {
                info!("Network recovered");
                if supervisor.is_running() {
                    info!("frpc still running after network recovery");
                } else {
                    let outcome = supervisor.start().await;
                    if outcome.success {
                        info!("Restarted after network recovery: {}", outcome.message);
                    } else {
                        warn!("Restart after network recovery failed: {}", outcome.message);
                    }
                }
            }
            Connectivity::Online => info!("Network is online"),
        }
        previous = Some(current);
    }
}
