use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    command::dispatcher::PressPolicy,
    error::{Result, TeleopError},
    quantizer::LevelSet,
    telemetry::TelemetryPaths,
    waypoint::router::DistanceMetric,
};

/// The port the telemetry hub listens on unless told otherwise
pub const HUB_PORT: u16 = 4040;

/// Controller settings. Every field has a default, so a config file only needs
/// to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Discrete motor speeds the speed slider snaps to
    pub speed_levels: LevelSet,
    /// Speed before the operator touches the slider
    pub initial_speed: u16,
    /// Steering servo resolution in degrees
    pub steering_step: u16,
    /// Largest steering angle in degrees
    pub steering_max: u16,
    pub initial_steering: u16,
    pub press_policy: PressPolicy,
    pub distance_metric: DistanceMetric,
    pub paths: TelemetryPaths,
    /// Address of the telemetry hub
    pub hub_addr: String,
    /// Per-path broadcast depth of the in-process store
    pub bus_capacity: usize,
    pub voice_locale: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            speed_levels: LevelSet::speeds(),
            initial_speed: 120,
            steering_step: 20,
            steering_max: 180,
            initial_steering: 0,
            press_policy: PressPolicy::default(),
            distance_metric: DistanceMetric::default(),
            paths: TelemetryPaths::default(),
            hub_addr: format!("127.0.0.1:{}", HUB_PORT),
            bus_capacity: 1024,
            voice_locale: "en-US".to_string(),
        }
    }
}

impl ControllerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<ControllerConfig> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        info!("Loaded controller config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<ControllerConfig> {
        let config: ControllerConfig =
            serde_yaml::from_str(text).map_err(|e| TeleopError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.steering_levels()?;
        if self.bus_capacity == 0 {
            return Err(TeleopError::Config("bus_capacity must be non-zero".into()));
        }
        Ok(())
    }

    pub fn steering_levels(&self) -> Result<LevelSet> {
        LevelSet::stepped(self.steering_step, self.steering_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = ControllerConfig::from_yaml("initial_speed: 80\npress_policy: exclusive\n").unwrap();
        assert_eq!(config.initial_speed, 80);
        assert_eq!(config.press_policy, PressPolicy::Exclusive);
        assert_eq!(config.speed_levels, LevelSet::speeds());
        assert_eq!(config.paths, TelemetryPaths::default());
    }

    #[test]
    fn rejects_bad_levels() {
        assert!(ControllerConfig::from_yaml("speed_levels: [80, 40]\n").is_err());
        assert!(ControllerConfig::from_yaml("speed_levels: []\n").is_err());
        assert!(ControllerConfig::from_yaml("steering_step: 0\n").is_err());
    }

    #[test]
    fn overrides_paths() {
        let config = ControllerConfig::from_yaml("paths:\n  vehicle_position: rover/gps\n").unwrap();
        assert_eq!(config.paths.vehicle_position, "rover/gps");
        assert_eq!(config.paths.proximity_distance, "vehicle/proximityDistance");
    }
}
