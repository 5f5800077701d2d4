use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TeleopError},
    messages::Position,
};

use super::Waypoint;

/// Mean earth radius used by [DistanceMetric::Haversine]
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Euclidean distance between raw latitude/longitude pairs, in degrees.
    ///
    /// Distorts with latitude and heading, only meaningful over a few hundred metres.
    #[default]
    Planar,
    /// Great circle distance in metres
    Haversine,
}

impl DistanceMetric {
    pub fn distance(&self, a: Position, b: Position) -> f64 {
        match self {
            DistanceMetric::Planar => {
                let dlat = a.latitude - b.latitude;
                let dlon = a.longitude - b.longitude;
                (dlat * dlat + dlon * dlon).sqrt()
            }
            DistanceMetric::Haversine => {
                let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
                let dlat = lat2 - lat1;
                let dlon = (b.longitude - a.longitude).to_radians();
                let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
                2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
/// The waypoint nearest to the vehicle and how far away it is
pub struct Route {
    pub vehicle: Position,
    pub waypoint: Waypoint,
    pub distance: f64,
    pub metric: DistanceMetric,
}

impl Route {
    /// For callers that treat a missing route as an error
    pub fn require(route: Option<Route>) -> Result<Route> {
        route.ok_or(TeleopError::NoRoute)
    }
}

/// The closest waypoint to `vehicle`, the first one wins a tie.
///
/// `None` when the vehicle position is unknown or there are no waypoints.
pub fn nearest(vehicle: Option<Position>, waypoints: &[Waypoint], metric: DistanceMetric) -> Option<Route> {
    let vehicle = vehicle?;
    let mut best: Option<Route> = None;

    for waypoint in waypoints {
        let distance = metric.distance(vehicle, waypoint.position);
        match &best {
            Some(route) if distance >= route.distance => {}
            _ => {
                best = Some(Route {
                    vehicle,
                    waypoint: *waypoint,
                    distance,
                    metric,
                })
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waypoints(points: &[(f64, f64)]) -> Vec<Waypoint> {
        points
            .iter()
            .enumerate()
            .map(|(i, (lat, lon))| Waypoint {
                index: i + 1,
                position: Position::new(*lat, *lon),
            })
            .collect()
    }

    #[test]
    fn picks_the_closest_waypoint() {
        let set = waypoints(&[(1.0, 1.0), (0.5, 0.5), (2.0, 2.0)]);
        let route = nearest(Some(Position::new(0.0, 0.0)), &set, DistanceMetric::Planar).unwrap();
        assert_eq!(route.waypoint.position, Position::new(0.5, 0.5));
        assert_eq!(route.waypoint.index, 2);
        assert!((route.distance - 0.5f64.hypot(0.5)).abs() < 1e-12);
        assert!((route.distance - 0.707).abs() < 1e-3);
    }

    #[test]
    fn first_waypoint_wins_a_tie() {
        let set = waypoints(&[(0.0, 1.0), (1.0, 0.0), (0.0, -1.0)]);
        let route = nearest(Some(Position::new(0.0, 0.0)), &set, DistanceMetric::Planar).unwrap();
        assert_eq!(route.waypoint.index, 1);
    }

    #[test]
    fn no_route_without_inputs() {
        let set = waypoints(&[(1.0, 1.0)]);
        assert!(nearest(None, &set, DistanceMetric::Planar).is_none());
        assert!(nearest(Some(Position::new(0.0, 0.0)), &[], DistanceMetric::Planar).is_none());
        assert!(matches!(Route::require(None), Err(TeleopError::NoRoute)));
    }

    #[test]
    fn planar_metric_ignores_longitude_shrink() {
        // One degree of longitude at 60N is half a degree of latitude on the ground,
        // but the planar metric treats them the same.
        let vehicle = Position::new(60.0, 0.0);
        let east = Position::new(60.0, 1.0);
        let north = Position::new(61.0, 0.0);
        assert_eq!(
            DistanceMetric::Planar.distance(vehicle, east),
            DistanceMetric::Planar.distance(vehicle, north)
        );
        assert!(
            DistanceMetric::Haversine.distance(vehicle, east) < DistanceMetric::Haversine.distance(vehicle, north)
        );
    }

    #[test]
    fn haversine_is_in_metres() {
        let d = DistanceMetric::Haversine.distance(Position::new(0.0, 0.0), Position::new(0.0, 1.0));
        assert!((d - 111_195.0).abs() < 100.0);
    }
}
