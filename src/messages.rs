use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
/// A point on the map in decimal degrees.
///
/// Positions are recorded once and replaced wholesale, never edited.
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Position {
        Position { latitude, longitude }
    }

    /// Finite and inside the usual latitude/longitude ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
/// The controller's own position as published by "send location"
pub struct DeviceLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl DeviceLocation {
    pub fn now(position: Position) -> DeviceLocation {
        DeviceLocation {
            latitude: position.latitude,
            longitude: position.longitude,
            timestamp: Utc::now(),
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }
}
