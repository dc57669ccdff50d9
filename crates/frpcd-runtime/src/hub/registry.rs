//! Observer bookkeeping owned by the hub.
//!
//! Two sets live here: every connected observer with its subscriptions, and
//! the separate download-progress subscriber set. Both are mutex-guarded;
//! when both are taken, `observers` is locked first.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use frpcd_core::{ObserverConnection, ObserverId, Subscription, SupervisorError};
use tokio::time::timeout;

use super::pusher::PusherHandle;

/// One connected observer's outbound side.
pub struct ObserverHandle {
    id: ObserverId,
    connection: Arc<dyn ObserverConnection>,
    /// Serializes sends so frames never interleave.
    gate: tokio::sync::Mutex<()>,
    closed: AtomicBool,
}

impl ObserverHandle {
    pub const fn id(&self) -> ObserverId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Deliver one frame within `limit`. A closed handle never sends.
    pub async fn send(&self, frame: String, limit: Duration) -> Result<(), SupervisorError> {
        if self.is_closed() {
            return Err(SupervisorError::SendFailure(format!("{} removed", self.id)));
        }
        let _gate = self.gate.lock().await;
        if self.is_closed() {
            return Err(SupervisorError::SendFailure(format!("{} removed", self.id)));
        }
        match timeout(limit, self.connection.send(frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SupervisorError::SendFailure(e.to_string())),
            Err(_) => Err(SupervisorError::SendFailure(format!(
                "send timed out after {limit:?}"
            ))),
        }
    }
}

struct ObserverEntry {
    handle: Arc<ObserverHandle>,
    subscriptions: HashSet<Subscription>,
    pusher: Option<PusherHandle>,
}

#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    observers: Mutex<HashMap<ObserverId, ObserverEntry>>,
    progress_subscribers: Mutex<HashSet<ObserverId>>,
}

impl ObserverRegistry {
    fn observers(&self) -> MutexGuard<'_, HashMap<ObserverId, ObserverEntry>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn progress(&self) -> MutexGuard<'_, HashSet<ObserverId>> {
        self.progress_subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a connection with the given initial subscriptions.
    pub fn insert(
        &self,
        connection: Arc<dyn ObserverConnection>,
        initial: &[Subscription],
    ) -> Arc<ObserverHandle> {
        let id = ObserverId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let handle = Arc::new(ObserverHandle {
            id,
            connection,
            gate: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
        });
        self.observers().insert(
            id,
            ObserverEntry {
                handle: Arc::clone(&handle),
                subscriptions: initial.iter().copied().collect(),
                pusher: None,
            },
        );
        handle
    }

    pub fn get(&self, id: ObserverId) -> Option<Arc<ObserverHandle>> {
        self.observers().get(&id).map(|e| Arc::clone(&e.handle))
    }

    pub fn is_subscribed(&self, id: ObserverId, subscription: Subscription) -> bool {
        match subscription {
            Subscription::DownloadProgress => self.progress().contains(&id),
            _ => self
                .observers()
                .get(&id)
                .is_some_and(|e| e.subscriptions.contains(&subscription)),
        }
    }

    /// Add a subscription. Returns `false` if the observer is gone.
    pub fn subscribe(&self, id: ObserverId, subscription: Subscription) -> bool {
        let mut observers = self.observers();
        let Some(entry) = observers.get_mut(&id) else {
            return false;
        };
        entry.subscriptions.insert(subscription);
        if subscription == Subscription::DownloadProgress {
            self.progress().insert(id);
        }
        true
    }

    /// Handles subscribed to `subscription`, in no particular order.
    pub fn handles_with(&self, subscription: Subscription) -> Vec<Arc<ObserverHandle>> {
        if subscription == Subscription::DownloadProgress {
            let ids: Vec<ObserverId> = self.progress().iter().copied().collect();
            let observers = self.observers();
            return ids
                .iter()
                .filter_map(|id| observers.get(id).map(|e| Arc::clone(&e.handle)))
                .collect();
        }
        self.observers()
            .values()
            .filter(|e| e.subscriptions.contains(&subscription))
            .map(|e| Arc::clone(&e.handle))
            .collect()
    }

    /// Whether the observer has a pusher that is still running.
    pub fn has_live_pusher(&self, id: ObserverId) -> bool {
        self.observers()
            .get(&id)
            .and_then(|e| e.pusher.as_ref())
            .is_some_and(|p| !p.is_finished())
    }

    /// Attach a pusher. Hands it back if the observer is gone.
    pub fn set_pusher(&self, id: ObserverId, pusher: PusherHandle) -> Result<(), PusherHandle> {
        let mut observers = self.observers();
        match observers.get_mut(&id) {
            Some(entry) => {
                if let Some(old) = entry.pusher.replace(pusher) {
                    old.cancel();
                }
                Ok(())
            }
            None => Err(pusher),
        }
    }

    /// Remove from every set and close the handle. Idempotent.
    ///
    /// Returns the observer's pusher, already cancelled, for the caller to join.
    pub fn remove(&self, id: ObserverId) -> Option<PusherHandle> {
        let entry = self.observers().remove(&id);
        self.progress().remove(&id);
        let entry = entry?;
        entry.handle.close();
        let pusher = entry.pusher?;
        pusher.cancel();
        Some(pusher)
    }

    /// Remove everything. Returns every cancelled pusher.
    pub fn remove_all(&self) -> Vec<PusherHandle> {
        let entries: Vec<ObserverEntry> = self.observers().drain().map(|(_, e)| e).collect();
        self.progress().clear();
        entries
            .into_iter()
            .filter_map(|entry| {
                entry.handle.close();
                let pusher = entry.pusher?;
                pusher.cancel();
                Some(pusher)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.observers().len()
    }

    pub fn progress_len(&self) -> usize {
        self.progress().len()
    }
}
