//! Broadcast hub: fan-out of log, status and download progress to observers.
//!
//! The hub is the single owner of observer state. Transport adapters hand it
//! an [`ObserverConnection`] on connect, forward raw inbound text to
//! [`BroadcastHub::handle_message`], and call [`BroadcastHub::disconnect`]
//! when the peer goes away. A failed send removes the observer as well, so
//! disconnect racing with delivery is harmless.

mod pusher;
mod registry;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use frpcd_core::{
    BroadcastMessage, DownloadProgress, DownloadProgressPort, ObserverConnection, ObserverId,
    ObserverRequest, ServicePort, Subscription, SupervisorConfig,
};
use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::queue::LogQueue;
use pusher::{PusherSettings, poll_status, spawn_status_pusher};
use registry::{ObserverHandle, ObserverRegistry};

const PUSHER_JOIN_TIMEOUT: Duration = Duration::from_millis(500);
const DRAIN_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Hub timings and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubSettings {
    pub status_push_interval: Duration,
    pub send_timeout: Duration,
    pub log_snapshot_lines: usize,
}

impl HubSettings {
    pub const fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            status_push_interval: config.status_push_interval,
            send_timeout: config.send_timeout,
            log_snapshot_lines: config.log_snapshot_lines,
        }
    }
}

pub(crate) struct HubInner {
    service: Arc<dyn ServicePort>,
    registry: ObserverRegistry,
    latest_progress: Mutex<Option<DownloadProgress>>,
    settings: HubSettings,
    shutdown: CancellationToken,
    drain_task: Mutex<Option<JoinHandle<()>>>,
}

impl HubInner {
    /// Remove without joining the pusher; safe to call from the pusher itself.
    pub(crate) fn remove_observer(&self, id: ObserverId) {
        drop(self.registry.remove(id));
        debug!(observer = %id, "Observer removed");
    }

    /// Send one frame to each handle concurrently; remove everyone that failed.
    async fn deliver(&self, handles: Vec<Arc<ObserverHandle>>, frame: String) {
        if handles.is_empty() {
            return;
        }
        let limit = self.settings.send_timeout;
        let results = join_all(handles.iter().map(|handle| {
            let frame = frame.clone();
            async move { (handle.id(), handle.send(frame, limit).await) }
        }))
        .await;

        for (id, result) in results {
            if let Err(e) = result {
                debug!(observer = %id, error = %e, "Delivery failed, removing observer");
                self.remove_observer(id);
            }
        }
    }

    async fn send_to(&self, id: ObserverId, message: &BroadcastMessage) {
        let Some(handle) = self.registry.get(id) else {
            return;
        };
        match message.to_json() {
            Ok(frame) => self.deliver(vec![handle], frame).await,
            Err(e) => warn!(error = %e, "Failed to serialize message"),
        }
    }

    async fn broadcast(&self, subscription: Subscription, message: &BroadcastMessage) {
        let handles = self.registry.handles_with(subscription);
        match message.to_json() {
            Ok(frame) => self.deliver(handles, frame).await,
            Err(e) => warn!(error = %e, "Failed to serialize message"),
        }
    }
}

/// Concurrent fan-out to connected observers. Cheap to clone.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    pub fn new(service: Arc<dyn ServicePort>, settings: HubSettings) -> Self {
        Self {
            inner: Arc::new(HubInner {
                service,
                registry: ObserverRegistry::default(),
                latest_progress: Mutex::new(None),
                settings,
                shutdown: CancellationToken::new(),
                drain_task: Mutex::new(None),
            }),
        }
    }

    /// Register a new observer. It is subscribed to log lines from the start.
    pub fn connect(&self, connection: Arc<dyn ObserverConnection>) -> ObserverId {
        let handle = self.inner.registry.insert(connection, &[Subscription::Logs]);
        info!(observer = %handle.id(), total = self.observer_count(), "Observer connected");
        handle.id()
    }

    /// Remove the observer and join its pusher with a short timeout. Idempotent.
    pub async fn disconnect(&self, id: ObserverId) {
        if let Some(pusher) = self.inner.registry.remove(id) {
            pusher.stop(PUSHER_JOIN_TIMEOUT).await;
        }
        debug!(observer = %id, total = self.observer_count(), "Observer disconnected");
    }

    /// Parse and dispatch one inbound request. Malformed input is logged and ignored.
    pub async fn handle_message(&self, id: ObserverId, raw: &str) {
        match ObserverRequest::parse(raw) {
            Ok(request) => self.handle_request(id, request).await,
            Err(e) => warn!(observer = %id, error = %e, "Ignoring malformed observer request"),
        }
    }

    pub async fn handle_request(&self, id: ObserverId, request: ObserverRequest) {
        let inner = &self.inner;
        match request {
            ObserverRequest::GetLog { lines } => {
                let lines = lines.unwrap_or(inner.settings.log_snapshot_lines);
                let snapshot = inner.service.recent_logs(lines);
                inner
                    .send_to(id, &BroadcastMessage::log_snapshot(&snapshot))
                    .await;
            }
            ObserverRequest::ClearLog => {
                if !inner.service.clear_logs() {
                    warn!(observer = %id, "Clear log request failed");
                }
                inner.send_to(id, &BroadcastMessage::log("")).await;
            }
            ObserverRequest::GetStatus => self.subscribe_status(id),
            ObserverRequest::GetServiceStatus => match poll_status(&inner.service).await {
                Ok(snapshot) => inner.send_to(id, &snapshot.into()).await,
                Err(e) => warn!(observer = %id, error = %e, "Status poll failed"),
            },
            ObserverRequest::StartDownloadProgress => {
                if !inner.registry.subscribe(id, Subscription::DownloadProgress) {
                    return;
                }
                let latest = inner
                    .latest_progress
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                if let Some(progress) = latest {
                    inner.send_to(id, &progress.into()).await;
                }
            }
            ObserverRequest::Unknown => {
                debug!(observer = %id, "Ignoring unknown request type");
            }
        }
    }

    /// Start a status pusher for the observer unless one is already running.
    fn subscribe_status(&self, id: ObserverId) {
        let inner = &self.inner;
        if !inner.registry.subscribe(id, Subscription::Status) {
            return;
        }
        if inner.registry.has_live_pusher(id) {
            return;
        }
        let Some(handle) = inner.registry.get(id) else {
            return;
        };
        let pusher = spawn_status_pusher(
            handle,
            Arc::clone(&inner.service),
            Arc::downgrade(&self.inner),
            PusherSettings {
                period: inner.settings.status_push_interval,
                send_timeout: inner.settings.send_timeout,
            },
            inner.shutdown.child_token(),
        );
        if let Err(orphan) = inner.registry.set_pusher(id, pusher) {
            orphan.cancel();
        }
    }

    /// Deliver one log line to every log subscriber.
    pub async fn broadcast_log(&self, line: &str) {
        self.inner
            .broadcast(Subscription::Logs, &BroadcastMessage::log(line))
            .await;
    }

    /// Spawn the loop that moves tailed lines from `queue` to observers in file order.
    pub fn spawn_log_drain(&self, queue: Arc<LogQueue>) {
        let hub = self.clone();
        let token = self.inner.shutdown.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    () = queue.notified() => {}
                }
                for line in queue.drain() {
                    if token.is_cancelled() {
                        break;
                    }
                    hub.broadcast_log(line.text()).await;
                }
            }
            debug!("Log drain exiting");
        });

        let previous = self
            .inner
            .drain_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn progress_subscriber_count(&self) -> usize {
        self.inner.registry.progress_len()
    }

    pub fn is_subscribed(&self, id: ObserverId, subscription: Subscription) -> bool {
        self.inner.registry.is_subscribed(id, subscription)
    }

    /// Cancel the drain loop and every pusher, and drop all observers.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();

        let drain = self
            .inner
            .drain_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(drain) = drain {
            if timeout(DRAIN_JOIN_TIMEOUT, drain).await.is_err() {
                warn!("Log drain did not stop within {:?}", DRAIN_JOIN_TIMEOUT);
            }
        }

        let pushers = self.inner.registry.remove_all();
        join_all(pushers.into_iter().map(|p| p.stop(PUSHER_JOIN_TIMEOUT))).await;
        info!("Broadcast hub shut down");
    }
}

#[async_trait]
impl DownloadProgressPort for BroadcastHub {
    async fn publish(&self, progress: DownloadProgress) {
        {
            let mut latest = self
                .inner
                .latest_progress
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if latest.as_ref() == Some(&progress) {
                return;
            }
            *latest = Some(progress.clone());
        }
        self.inner
            .broadcast(Subscription::DownloadProgress, &progress.into())
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frpcd_core::{ConnectionError, StatusSnapshot};
    use mockall::mock;
    use tokio::sync::mpsc;

    mock! {
        Service {}
        impl ServicePort for Service {
            fn status(&self) -> StatusSnapshot;
            fn recent_logs(&self, lines: usize) -> Vec<String>;
            fn clear_logs(&self) -> bool;
        }
    }

    struct ChannelConnection {
        tx: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl ObserverConnection for ChannelConnection {
        async fn send(&self, frame: String) -> Result<(), ConnectionError> {
            self.tx.send(frame).map_err(|_| ConnectionError::Closed)
        }
    }

    fn channel() -> (Arc<dyn ObserverConnection>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(ChannelConnection { tx }), rx)
    }

    fn settings() -> HubSettings {
        HubSettings {
            status_push_interval: Duration::from_millis(20),
            send_timeout: Duration::from_millis(200),
            log_snapshot_lines: 100,
        }
    }

    fn json(frame: &str) -> serde_json::Value {
        serde_json::from_str(frame).unwrap()
    }

    #[tokio::test]
    async fn test_get_log_uses_requested_line_count() {
        let mut service = MockService::new();
        service
            .expect_recent_logs()
            .withf(|n| *n == 2)
            .returning(|_| vec!["a".to_string(), "b".to_string()]);
        let hub = BroadcastHub::new(Arc::new(service), settings());
        let (conn, mut rx) = channel();
        let id = hub.connect(conn);

        hub.handle_message(id, r#"{"type":"get_log","lines":2}"#).await;

        let frame = json(&rx.recv().await.unwrap());
        assert_eq!(frame["type"], "log");
        assert_eq!(frame["content"], "a\nb");
    }

    #[tokio::test]
    async fn test_clear_log_replies_empty() {
        let mut service = MockService::new();
        service.expect_clear_logs().times(1).returning(|| true);
        let hub = BroadcastHub::new(Arc::new(service), settings());
        let (conn, mut rx) = channel();
        let id = hub.connect(conn);

        hub.handle_message(id, r#"{"type":"clear_log"}"#).await;

        let frame = json(&rx.recv().await.unwrap());
        assert_eq!(frame["content"], "");
    }

    #[tokio::test]
    async fn test_get_service_status_is_one_shot() {
        let mut service = MockService::new();
        service
            .expect_status()
            .times(1)
            .returning(|| StatusSnapshot::running(42, ""));
        let hub = BroadcastHub::new(Arc::new(service), settings());
        let (conn, mut rx) = channel();
        let id = hub.connect(conn);

        hub.handle_message(id, r#"{"type":"get_service_status"}"#).await;

        let frame = json(&rx.recv().await.unwrap());
        assert_eq!(frame["type"], "service_status");
        assert_eq!(frame["status"], "running");
        assert_eq!(frame["pid"], 42);
        assert!(!hub.is_subscribed(id, Subscription::Status));
    }

    #[tokio::test]
    async fn test_get_service_status_scan_does_not_block_runtime() {
        let mut service = MockService::new();
        service.expect_status().times(1).returning(|| {
            std::thread::sleep(Duration::from_millis(300));
            StatusSnapshot::stopped()
        });
        let hub = BroadcastHub::new(Arc::new(service), settings());
        let (conn, mut rx) = channel();
        let id = hub.connect(conn);

        let started = tokio::time::Instant::now();
        let request = {
            let hub = hub.clone();
            tokio::spawn(async move {
                hub.handle_message(id, r#"{"type":"get_service_status"}"#)
                    .await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(started.elapsed() < Duration::from_millis(200));

        request.await.unwrap();
        assert_eq!(json(&rx.recv().await.unwrap())["status"], "stopped");
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_requests_are_ignored() {
        let hub = BroadcastHub::new(Arc::new(MockService::new()), settings());
        let (conn, mut rx) = channel();
        let id = hub.connect(conn);

        hub.handle_message(id, "not json").await;
        hub.handle_message(id, r#"{"type":"reboot"}"#).await;

        assert!(rx.try_recv().is_err());
        assert_eq!(hub.observer_count(), 1);
    }

    #[tokio::test]
    async fn test_status_pusher_is_change_aware() {
        let mut service = MockService::new();
        service.expect_status().returning(StatusSnapshot::stopped);
        let hub = BroadcastHub::new(Arc::new(service), settings());
        let (conn, mut rx) = channel();
        let id = hub.connect(conn);

        hub.handle_message(id, r#"{"type":"get_status"}"#).await;
        hub.handle_message(id, r#"{"type":"get_status"}"#).await;

        let frame = json(&rx.recv().await.unwrap());
        assert_eq!(frame["status"], "stopped");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(rx.try_recv().is_err());
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_send_removes_observer() {
        let hub = BroadcastHub::new(Arc::new(MockService::new()), settings());
        let (conn, rx) = channel();
        let id = hub.connect(conn);
        let (live, mut live_rx) = channel();
        hub.connect(live);
        drop(rx);

        hub.broadcast_log("line").await;

        assert_eq!(hub.observer_count(), 1);
        assert!(!hub.is_subscribed(id, Subscription::Logs));
        assert_eq!(json(&live_rx.recv().await.unwrap())["content"], "line");

        // Removal is idempotent
        hub.disconnect(id).await;
        hub.disconnect(id).await;
        assert_eq!(hub.observer_count(), 1);
    }

    #[tokio::test]
    async fn test_download_progress_snapshot_and_dedup() {
        let hub = BroadcastHub::new(Arc::new(MockService::new()), settings());
        let (conn, mut rx) = channel();
        let id = hub.connect(conn);

        hub.publish(DownloadProgress::in_progress("downloading: 10%"))
            .await;
        hub.handle_message(id, r#"{"type":"start_download_progress"}"#)
            .await;
        assert_eq!(hub.progress_subscriber_count(), 1);

        let frame = json(&rx.recv().await.unwrap());
        assert_eq!(frame["type"], "download_progress");
        assert_eq!(frame["message"], "downloading: 10%");

        hub.publish(DownloadProgress::in_progress("downloading: 10%"))
            .await;
        assert!(rx.try_recv().is_err());

        hub.publish(DownloadProgress::finished("done")).await;
        let frame = json(&rx.recv().await.unwrap());
        assert_eq!(frame["completed"], true);
    }

    #[tokio::test]
    async fn test_log_drain_preserves_order() {
        let hub = BroadcastHub::new(Arc::new(MockService::new()), settings());
        let (conn, mut rx) = channel();
        hub.connect(conn);
        let queue = Arc::new(LogQueue::new());
        hub.spawn_log_drain(Arc::clone(&queue));

        for text in ["one", "two", "three"] {
            queue.push(frpcd_core::LogLine::new(text).unwrap());
        }

        let mut received = Vec::new();
        for _ in 0..3 {
            let frame = timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            received.push(json(&frame)["content"].as_str().unwrap().to_string());
        }
        assert_eq!(received, vec!["one", "two", "three"]);
        hub.shutdown().await;
        assert_eq!(hub.observer_count(), 0);
    }
}
