//! The telemetry channel is a path addressed publish/subscribe layer over a shared key-value store.
//!
//! Every path holds one JSON document. Publishing replaces the document and wakes every subscriber
//! of that path with the whole new value. Paths are independent of each other: there is no ordering
//! or atomicity across two publishes to different paths.

use std::sync::Arc;

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};

use crate::error::{Result, TeleopError};

/// Backing stores and the watch primitive the channel is built on.
pub mod store;

/// Client side of the telemetry hub protocol.
pub mod remote;

/// The TCP server that shares one store between a controller and a vehicle.
pub mod hub;

/// Keeps the controller's view of vehicle reported state up to date.
pub mod ingest;

use self::store::{PathWatch, StoreBackend};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Logical store paths shared by the controller and the vehicle
pub struct TelemetryPaths {
    pub vehicle_position: String,
    pub proximity_distance: String,
    pub current_command: String,
    pub steering_angle: String,
    /// Prefix of the marker entries and the device location entry
    pub waypoints: String,
    pub nearest_route: String,
}

impl Default for TelemetryPaths {
    fn default() -> Self {
        TelemetryPaths {
            vehicle_position: "vehicle/position".to_string(),
            proximity_distance: "vehicle/proximityDistance".to_string(),
            current_command: "controller/currentCommand".to_string(),
            steering_angle: "controller/steeringAngle".to_string(),
            waypoints: "controller/waypoints".to_string(),
            nearest_route: "controller/nearestRoute".to_string(),
        }
    }
}

impl TelemetryPaths {
    /// Path of a single marker, e.g. `controller/waypoints/marker3`
    pub fn waypoint(&self, label: &str) -> String {
        format!("{}/{}", self.waypoints, label)
    }

    /// Path the controller's own location is published to
    pub fn current_location(&self) -> String {
        format!("{}/current", self.waypoints)
    }
}

/// Cloneable handle to a telemetry store.
#[derive(Clone)]
pub struct TelemetryChannel {
    backend: Arc<dyn StoreBackend>,
}

impl TelemetryChannel {
    pub fn new(backend: Arc<dyn StoreBackend>) -> TelemetryChannel {
        TelemetryChannel { backend }
    }

    /// Serializes `value` and publishes it at `path`.
    pub async fn publish<T: Serialize + ?Sized>(&self, path: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| TeleopError::malformed(path, e))?;
        self.publish_value(path, value).await
    }

    /// Publishes an already encoded document. The outcome is returned, never retried.
    pub async fn publish_value(&self, path: &str, value: Value) -> Result<()> {
        trace!("Publishing {} = {}", path, value);
        match self.backend.set(path, value).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Publish to {} failed: {}", path, e);
                Err(e)
            }
        }
    }

    /// Registers `on_update` for every value stored at `path`, starting with the current one.
    ///
    /// The listener lives until the returned [Subscription] is unsubscribed or dropped.
    pub async fn subscribe<F>(&self, path: &str, mut on_update: F) -> Result<Subscription>
    where
        F: FnMut(Value) + Send + 'static,
    {
        let PathWatch {
            snapshot,
            mut updates,
        } = self.backend.watch(path).await?;

        let listen_path = path.to_string();
        let task = tokio::spawn(async move {
            if let Some(value) = snapshot {
                on_update(value);
            }
            loop {
                match updates.recv().await {
                    Ok(value) => on_update(value),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Subscriber of {} fell behind, {} updates skipped", listen_path, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Update stream for {} closed", listen_path);
        });

        info!("Subscribed to {}", path);
        Ok(Subscription {
            path: path.to_string(),
            task,
        })
    }
}

/// Handle to a live listener. Dropping it releases the listener.
pub struct Subscription {
    path: String,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// False once the underlying stream has closed or the handle was released
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn unsubscribe(self) {
        info!("Unsubscribed from {}", self.path);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
