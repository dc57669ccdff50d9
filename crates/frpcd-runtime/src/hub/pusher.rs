//! Per-observer status push loop.

use std::sync::{Arc, Weak};
use std::time::Duration;

use frpcd_core::{BroadcastMessage, ServicePort, StatusSnapshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::HubInner;
use super::registry::ObserverHandle;

/// Running pusher: its stop flag and task.
pub struct PusherHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PusherHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait up to `limit` for the loop to exit.
    pub async fn stop(self, limit: Duration) {
        self.cancel.cancel();
        if timeout(limit, self.task).await.is_err() {
            debug!("Status pusher did not stop within {:?}", limit);
        }
    }
}

/// Take a status snapshot off the async workers; the process scan blocks.
pub async fn poll_status(
    service: &Arc<dyn ServicePort>,
) -> Result<StatusSnapshot, JoinError> {
    let service = Arc::clone(service);
    tokio::task::spawn_blocking(move || service.status()).await
}

pub struct PusherSettings {
    pub period: Duration,
    pub send_timeout: Duration,
}

/// Spawn a change-aware status loop for one observer.
///
/// The first poll always sends. Later polls send only when the snapshot
/// differs from the last one delivered. A send failure removes the observer
/// from the hub and ends the loop.
pub fn spawn_status_pusher(
    handle: Arc<ObserverHandle>,
    service: Arc<dyn ServicePort>,
    hub: Weak<HubInner>,
    settings: PusherSettings,
    cancel: CancellationToken,
) -> PusherHandle {
    let token = cancel.clone();
    let task = tokio::spawn(async move {
        let id = handle.id();
        let mut ticker = interval(settings.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_sent: Option<StatusSnapshot> = None;

        debug!(observer = %id, "Status pusher started");

        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let snapshot = match poll_status(&service).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(observer = %id, error = %e, "Status poll failed");
                    continue;
                }
            };

            if last_sent.as_ref() == Some(&snapshot) {
                continue;
            }
            if token.is_cancelled() {
                break;
            }

            let frame = match BroadcastMessage::from(snapshot.clone()).to_json() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize status");
                    continue;
                }
            };

            if let Err(e) = handle.send(frame, settings.send_timeout).await {
                debug!(observer = %id, error = %e, "Status push failed, removing observer");
                if let Some(hub) = hub.upgrade() {
                    hub.remove_observer(id);
                }
                break;
            }
            last_sent = Some(snapshot);
        }

        debug!(observer = %id, "Status pusher exiting");
    });

    PusherHandle { cancel, task }
}
