#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use rover_teleop::telemetry::{ingest::ObservedTelemetry, store::MemoryStore, TelemetryChannel};
use serde_json::Value;
use tokio::{
    sync::{broadcast, watch},
    time::timeout,
};

pub const WAIT: Duration = Duration::from_secs(2);

pub fn memory_channel() -> (TelemetryChannel, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new(64));
    (TelemetryChannel::new(store.clone()), store)
}

/// Everything published to `path` from now on
pub async fn record(store: &MemoryStore, path: &str) -> broadcast::Receiver<Value> {
    use rover_teleop::telemetry::store::StoreBackend;
    store.watch(path).await.unwrap().updates
}

pub async fn next(rx: &mut broadcast::Receiver<Value>) -> Value {
    timeout(WAIT, rx.recv()).await.expect("timed out waiting for a publish").unwrap()
}

/// Waits until the observed telemetry satisfies `done`
pub async fn wait_for(
    rx: &mut watch::Receiver<ObservedTelemetry>,
    done: impl Fn(&ObservedTelemetry) -> bool,
) -> ObservedTelemetry {
    timeout(WAIT, async {
        loop {
            if done(&*rx.borrow()) {
                return rx.borrow().clone();
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("timed out waiting for telemetry")
}

/// Lets spawned listeners drain what they have been sent
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
