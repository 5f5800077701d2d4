//! Operators run on the vehicle's side of the channel.
//!
//! The only one shipped here is a simulated vehicle for driving the controller without hardware.

use tokio::task::JoinHandle;

use crate::{
    error::Result,
    messages::Position,
    telemetry::{TelemetryChannel, TelemetryPaths},
};

/// A vehicle that follows the published commands and reports a dead reckoned position.
pub mod simulator;

use self::simulator::{VehicleSimulator, SIM_TICK};

/// Starts a simulated vehicle on `channel` and returns its task
pub async fn simulate(channel: TelemetryChannel, paths: &TelemetryPaths, start: Position) -> Result<JoinHandle<()>> {
    let vehicle = VehicleSimulator::new(channel, paths, start).await?;
    vehicle.publish_state().await?;
    Ok(tokio::spawn(vehicle.run(SIM_TICK)))
}
