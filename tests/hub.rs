mod common;

use std::{sync::Arc, time::Duration};

use common::WAIT;
use rover_teleop::{
    messages::Position,
    telemetry::{
        hub::TelemetryHub,
        ingest::TelemetryIngest,
        remote::RemoteStore,
        store::MemoryStore,
        TelemetryChannel, TelemetryPaths,
    },
    TeleopError,
};
use serde_json::json;
use tokio::{net::TcpListener, sync::mpsc, time::timeout};

async fn start_hub() -> (std::net::SocketAddr, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new(64));
    let hub = TelemetryHub::bind("127.0.0.1:0", store.clone()).await.unwrap();
    let (addr, _task) = hub.spawn().unwrap();
    (addr, store)
}

#[tokio::test]
async fn publishes_land_in_the_hub_store() {
    let (addr, hub_store) = start_hub().await;
    let remote = RemoteStore::connect(addr, 64).await.unwrap();
    let channel = TelemetryChannel::new(remote.clone());

    channel.publish("controller/steeringAngle", &80u16).await.unwrap();
    assert_eq!(hub_store.get("controller/steeringAngle").await, Some(json!(80)));
    assert!(remote.is_connected());
}

#[tokio::test]
async fn remote_subscribers_see_snapshot_and_updates_from_other_clients() {
    let (addr, _hub_store) = start_hub().await;
    let controller = TelemetryChannel::new(RemoteStore::connect(addr, 64).await.unwrap());
    let vehicle = TelemetryChannel::new(RemoteStore::connect(addr, 64).await.unwrap());

    vehicle.publish_value("vehicle/proximityDistance", json!(90)).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _sub = controller
        .subscribe("vehicle/proximityDistance", move |v| {
            let _ = tx.send(v);
        })
        .await
        .unwrap();

    assert_eq!(timeout(WAIT, rx.recv()).await.unwrap(), Some(json!(90)));
    vehicle.publish_value("vehicle/proximityDistance", json!(42)).await.unwrap();
    vehicle.publish_value("vehicle/proximityDistance", json!(42)).await.unwrap();
    assert_eq!(timeout(WAIT, rx.recv()).await.unwrap(), Some(json!(42)));
    assert_eq!(timeout(WAIT, rx.recv()).await.unwrap(), Some(json!(42)));
}

#[tokio::test]
async fn ingest_works_over_the_hub() {
    let (addr, _hub_store) = start_hub().await;
    let paths = TelemetryPaths::default();
    let controller = TelemetryChannel::new(RemoteStore::connect(addr, 64).await.unwrap());
    let vehicle = TelemetryChannel::new(RemoteStore::connect(addr, 64).await.unwrap());

    let ingest = TelemetryIngest::start(&controller, &paths).await.unwrap();
    let mut observed = ingest.watch();
    // Give the hub a moment to register both watches.
    common::settle().await;

    vehicle.publish(&paths.vehicle_position, &Position::new(48.1, 11.5)).await.unwrap();
    let seen = common::wait_for(&mut observed, |o| o.vehicle_position.is_some()).await;
    assert_eq!(seen.vehicle_position, Some(Position::new(48.1, 11.5)));
}

#[tokio::test]
async fn hub_side_failures_are_reported_to_the_publisher() {
    let (addr, hub_store) = start_hub().await;
    let channel = TelemetryChannel::new(RemoteStore::connect(addr, 64).await.unwrap());

    hub_store.set_offline(true);
    assert!(matches!(
        channel.publish_value("a", json!(1)).await,
        Err(TeleopError::ChannelUnavailable(_))
    ));
    hub_store.set_offline(false);
    assert!(channel.publish_value("a", json!(1)).await.is_ok());
}

#[tokio::test]
async fn a_dropped_connection_makes_the_channel_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hang_up = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let remote = RemoteStore::connect(addr, 16).await.unwrap();
    hang_up.await.unwrap();

    timeout(WAIT, async {
        while remote.is_connected() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let channel = TelemetryChannel::new(remote);
    assert!(matches!(
        channel.publish_value("a", json!(1)).await,
        Err(TeleopError::ChannelUnavailable(_))
    ));
    assert!(channel.subscribe("a", |_| {}).await.is_err());
}

#[tokio::test]
async fn connecting_to_nothing_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    assert!(matches!(
        RemoteStore::connect(addr, 16).await,
        Err(TeleopError::ChannelUnavailable(_))
    ));
}
