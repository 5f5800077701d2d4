use futures::future::join_all;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{Result, TeleopError},
    messages::Position,
    telemetry::{TelemetryChannel, TelemetryPaths},
};

/// Finds the waypoint closest to the vehicle.
pub mod router;

use self::router::{nearest, DistanceMetric, Route};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
/// An operator placed target. Indices start at 1 and follow insertion order.
pub struct Waypoint {
    pub index: usize,
    pub position: Position,
}

impl Waypoint {
    /// `marker1`, `marker2`...
    pub fn label(&self) -> String {
        format!("marker{}", self.index)
    }
}

/// The session's waypoints and the route last computed from them.
///
/// The route is thrown away whenever the waypoint set changes, so it can never
/// point at a waypoint that no longer exists.
#[derive(Debug, Default)]
pub struct WaypointStore {
    waypoints: Vec<Waypoint>,
    route: Option<Route>,
    /// Highest marker index that may still hold a document in the store
    published: usize,
}

impl WaypointStore {
    pub fn new() -> WaypointStore {
        Default::default()
    }

    /// Appends `position` with the next index and returns the new waypoint.
    /// Non-finite or out of range coordinates are rejected and leave the set unchanged.
    pub fn add(&mut self, position: Position) -> Result<Waypoint> {
        if !position.is_valid() {
            return Err(TeleopError::InvalidPosition {
                latitude: position.latitude,
                longitude: position.longitude,
            });
        }
        let waypoint = Waypoint {
            index: self.waypoints.len() + 1,
            position,
        };
        self.waypoints.push(waypoint);
        self.route = None;
        Ok(waypoint)
    }

    /// Removes every waypoint along with the current route
    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.route = None;
        info!("Waypoints cleared");
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    /// Recomputes the route from scratch and keeps it until the set changes
    pub fn compute_route(&mut self, vehicle: Option<Position>, metric: DistanceMetric) -> Option<&Route> {
        self.route = nearest(vehicle, &self.waypoints, metric);
        self.route.as_ref()
    }

    /// Puts back a route taken from [WaypointStore::route] before a recompute.
    /// Ignored if it names a waypoint that is no longer in the set.
    pub(crate) fn restore_route(&mut self, route: Option<Route>) {
        self.route = route.filter(|r| {
            r.waypoint
                .index
                .checked_sub(1)
                .and_then(|i| self.waypoints.get(i))
                == Some(&r.waypoint)
        });
    }

    /// `{ "marker1": {latitude, longitude}, ... }` in insertion order
    pub fn to_payload(&self) -> Map<String, Value> {
        self.waypoints
            .iter()
            .map(|w| {
                let mut coords = Map::new();
                coords.insert("latitude".into(), w.position.latitude.into());
                coords.insert("longitude".into(), w.position.longitude.into());
                (w.label(), Value::Object(coords))
            })
            .collect()
    }

    /// Publishes every marker entry to its own path and writes `null` over markers
    /// published earlier that are no longer in the set.
    ///
    /// Entries are written independently, so the result lists one outcome per path written.
    pub async fn publish_all(
        &mut self,
        channel: &TelemetryChannel,
        paths: &TelemetryPaths,
    ) -> Vec<(String, Result<()>)> {
        let live = self.waypoints.len();
        let stale = (live + 1..=self.published).map(|index| (format!("marker{}", index), Value::Null));
        let entries: Vec<(String, Value)> = self.to_payload().into_iter().chain(stale).collect();

        let publishes = entries.into_iter().map(|(label, value)| async move {
            let outcome = channel.publish_value(&paths.waypoint(&label), value).await;
            (label, outcome)
        });
        let outcomes = join_all(publishes).await;

        // Markers whose retraction failed stay on the books for the next publish.
        let unretracted = outcomes[live..]
            .iter()
            .zip(live + 1..)
            .filter(|((_, outcome), _)| outcome.is_err())
            .map(|(_, index)| index)
            .max();
        self.published = unretracted.unwrap_or(live).max(live);

        info!("Published {} waypoints, retracted {}", live, outcomes.len() - live);
        outcomes
    }
}
