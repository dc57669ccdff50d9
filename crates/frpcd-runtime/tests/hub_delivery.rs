//! Hub delivery against a real supervisor and fake `frpc` script.

#![cfg(target_os = "linux")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{LONG_RUNNING, kill_out_of_band, test_config};
use frpcd_core::{ConnectionError, ObserverConnection, ServicePort};
use frpcd_runtime::{BroadcastHub, HubSettings, ProcessSupervisor};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::timeout;

struct ChannelConnection {
    tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl ObserverConnection for ChannelConnection {
    async fn send(&self, frame: String) -> Result<(), ConnectionError> {
        self.tx.send(frame).map_err(|_| ConnectionError::Closed)
    }
}

fn observer() -> (Arc<dyn ObserverConnection>, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelConnection { tx }), rx)
}

/// Receive until a `service_status` frame with `status` arrives.
async fn expect_status(rx: &mut mpsc::UnboundedReceiver<String>, status: &str, limit: Duration) {
    let result = timeout(limit, async {
        while let Some(frame) = rx.recv().await {
            let value: Value = serde_json::from_str(&frame).unwrap();
            if value["type"] == "service_status" && value["status"] == status {
                return value;
            }
        }
        panic!("observer channel closed");
    })
    .await;
    assert!(result.is_ok(), "no {status} status within {limit:?}");
}

fn setup(dir: &std::path::Path) -> (Arc<ProcessSupervisor>, BroadcastHub) {
    let config = test_config(dir, LONG_RUNNING);
    let settings = HubSettings::from_config(&config);
    let supervisor = Arc::new(ProcessSupervisor::new(config).unwrap());
    let hub = BroadcastHub::new(Arc::clone(&supervisor) as Arc<dyn ServicePort>, settings);
    (supervisor, hub)
}

#[tokio::test]
async fn both_status_observers_see_out_of_band_kill() {
    let dir = tempfile::tempdir().unwrap();
    let (supervisor, hub) = setup(dir.path());
    assert!(supervisor.start().await.success);

    let (conn_a, mut rx_a) = observer();
    let (conn_b, mut rx_b) = observer();
    let a = hub.connect(conn_a);
    let b = hub.connect(conn_b);
    hub.handle_message(a, r#"{"type":"get_status"}"#).await;
    hub.handle_message(b, r#"{"type":"get_status"}"#).await;

    expect_status(&mut rx_a, "running", Duration::from_secs(2)).await;
    expect_status(&mut rx_b, "running", Duration::from_secs(2)).await;

    kill_out_of_band(supervisor.get_status().pid.unwrap());

    expect_status(&mut rx_a, "stopped", Duration::from_secs(2)).await;
    expect_status(&mut rx_b, "stopped", Duration::from_secs(2)).await;

    hub.shutdown().await;
    supervisor.shutdown().await;
}

#[tokio::test]
async fn disconnect_mid_push_does_not_affect_other_observer() {
    let dir = tempfile::tempdir().unwrap();
    let (supervisor, hub) = setup(dir.path());

    let (conn_a, mut rx_a) = observer();
    let (conn_b, rx_b) = observer();
    let a = hub.connect(conn_a);
    let b = hub.connect(conn_b);
    hub.handle_message(a, r#"{"type":"get_status"}"#).await;
    hub.handle_message(b, r#"{"type":"get_status"}"#).await;
    expect_status(&mut rx_a, "stopped", Duration::from_secs(2)).await;

    // B's transport goes away while its pusher is live, then the adapter disconnects it
    drop(rx_b);
    assert!(supervisor.start().await.success);
    hub.disconnect(b).await;

    expect_status(&mut rx_a, "running", Duration::from_secs(2)).await;
    assert_eq!(hub.observer_count(), 1);

    assert!(supervisor.stop().await.success);
    expect_status(&mut rx_a, "stopped", Duration::from_secs(2)).await;

    hub.shutdown().await;
    supervisor.shutdown().await;
}

#[tokio::test]
async fn tailed_lines_reach_every_observer_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (supervisor, hub) = setup(dir.path());
    hub.spawn_log_drain(supervisor.log_queue());

    let (conn_a, mut rx_a) = observer();
    let (conn_b, mut rx_b) = observer();
    hub.connect(conn_a);
    hub.connect(conn_b);
    tokio::time::sleep(Duration::from_millis(100)).await;

    for line in ["alpha", "\x1b[33mbeta\x1b[0m", "gamma"] {
        supervisor.log_file().append_line(line).unwrap();
    }

    for rx in [&mut rx_a, &mut rx_b] {
        let mut contents = Vec::new();
        while contents.len() < 3 {
            let frame = timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            let value: Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(value["type"], "log");
            contents.push(value["content"].as_str().unwrap().to_string());
        }
        assert_eq!(contents, vec!["alpha", "beta", "gamma"]);
    }

    hub.shutdown().await;
    supervisor.shutdown().await;
}

#[tokio::test]
async fn get_log_snapshot_reads_the_managed_log() {
    let dir = tempfile::tempdir().unwrap();
    let (supervisor, hub) = setup(dir.path());
    for line in ["one", "two", "three"] {
        supervisor.log_file().append_line(line).unwrap();
    }

    let (conn, mut rx) = observer();
    let id = hub.connect(conn);
    hub.handle_message(id, r#"{"type":"get_log","lines":2}"#).await;

    // Live tail frames may arrive too; find the snapshot
    let snapshot = timeout(Duration::from_secs(2), async {
        loop {
            let frame = rx.recv().await.unwrap();
            let value: Value = serde_json::from_str(&frame).unwrap();
            if value["content"] == "two\nthree" {
                return value;
            }
        }
    })
    .await;
    assert!(snapshot.is_ok());

    hub.shutdown().await;
    supervisor.shutdown().await;
}
