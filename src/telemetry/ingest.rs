use std::sync::Arc;

use log::{info, trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::{
    error::{Result, TeleopError},
    messages::Position,
};

use super::{Subscription, TelemetryChannel, TelemetryPaths};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// What the vehicle last told us about itself
pub struct ObservedTelemetry {
    pub vehicle_position: Option<Position>,
    pub proximity_distance_cm: f64,
    /// Number of updates applied so far, one per accepted publish
    pub updates: u64,
}

/// Subscribes to the vehicle's position and proximity paths and folds every
/// update into [ObservedTelemetry], last write wins.
///
/// Readers only ever see snapshots through [TelemetryIngest::snapshot] or [TelemetryIngest::watch].
pub struct TelemetryIngest {
    observed: watch::Receiver<ObservedTelemetry>,
    subscriptions: Vec<Subscription>,
}

impl TelemetryIngest {
    pub async fn start(channel: &TelemetryChannel, paths: &TelemetryPaths) -> Result<TelemetryIngest> {
        let (tx, observed) = watch::channel(ObservedTelemetry::default());
        let tx = Arc::new(tx);

        let position = {
            let tx = tx.clone();
            let path = paths.vehicle_position.clone();
            channel
                .subscribe(&paths.vehicle_position, move |value| {
                    match decode_position(&path, value) {
                        Ok(Some(position)) => tx.send_modify(|o| {
                            o.vehicle_position = Some(position);
                            o.updates += 1;
                        }),
                        Ok(None) => trace!("Null vehicle position ignored"),
                        Err(e) => warn!("{}", e),
                    }
                })
                .await?
        };

        let proximity = {
            let path = paths.proximity_distance.clone();
            channel
                .subscribe(&paths.proximity_distance, move |value| {
                    match decode_distance(&path, value) {
                        Ok(Some(distance)) => tx.send_modify(|o| {
                            o.proximity_distance_cm = distance;
                            o.updates += 1;
                        }),
                        Ok(None) => trace!("Null proximity distance ignored"),
                        Err(e) => warn!("{}", e),
                    }
                })
                .await?
        };

        info!("Telemetry ingest started");
        Ok(Self {
            observed,
            subscriptions: vec![position, proximity],
        })
    }

    pub fn snapshot(&self) -> ObservedTelemetry {
        self.observed.borrow().clone()
    }

    pub fn vehicle_position(&self) -> Option<Position> {
        self.observed.borrow().vehicle_position
    }

    /// A receiver that is notified on every applied update
    pub fn watch(&self) -> watch::Receiver<ObservedTelemetry> {
        self.observed.clone()
    }

    pub fn shutdown(self) {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
        info!("Telemetry ingest stopped");
    }
}

/// `null` means "nothing new", anything else has to be a valid [Position]
pub fn decode_position(path: &str, value: Value) -> Result<Option<Position>> {
    if value.is_null() {
        return Ok(None);
    }
    let position: Position = serde_json::from_value(value).map_err(|e| TeleopError::malformed(path, e))?;
    if !position.is_valid() {
        return Err(TeleopError::malformed(
            path,
            format!("coordinates out of range: {:?}", position),
        ));
    }
    Ok(Some(position))
}

/// `null` means "nothing new", anything else has to be a non-negative number of centimetres
pub fn decode_distance(path: &str, value: Value) -> Result<Option<f64>> {
    if value.is_null() {
        return Ok(None);
    }
    match value.as_f64() {
        Some(distance) if distance >= 0.0 => Ok(Some(distance)),
        Some(distance) => Err(TeleopError::malformed(path, format!("negative distance {}", distance))),
        None => Err(TeleopError::malformed(path, format!("expected a number, got {}", value))),
    }
}
