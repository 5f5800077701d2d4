use log::{debug, info, trace, warn};
use rand::{thread_rng, Rng};
use serde_json::Value;
use tokio::{
    sync::watch,
    time::{interval, Duration, MissedTickBehavior},
};

use crate::{
    command::{Direction, DirectionCommand},
    error::{Result, TeleopError},
    messages::Position,
    telemetry::{Subscription, TelemetryChannel, TelemetryPaths},
};

pub const SIM_TICK: Duration = Duration::from_secs(1);
/// Ground speed at the top speed level of 255
pub const FULL_SPEED_MPS: f64 = 1.5;
pub const METRES_PER_DEGREE: f64 = 111_320.0;
/// Distance sensor range
pub const MAX_PROXIMITY_CM: f64 = 400.0;
pub const MIN_PROXIMITY_CM: f64 = 5.0;

pub struct VehicleSimulator {
    channel: TelemetryChannel,
    paths: TelemetryPaths,
    position: Position,
    proximity_cm: f64,
    command: watch::Receiver<Option<DirectionCommand>>,
    steering: watch::Receiver<u16>,
    subscriptions: Vec<Subscription>,
}

impl VehicleSimulator {
    pub async fn new(channel: TelemetryChannel, paths: &TelemetryPaths, start: Position) -> Result<VehicleSimulator> {
        let (command_tx, command) = watch::channel(None);
        let (steering_tx, steering) = watch::channel(0u16);

        let command_path = paths.current_command.clone();
        let commands = channel
            .subscribe(&paths.current_command, move |value| {
                if value.is_null() {
                    return;
                }
                match serde_json::from_value::<DirectionCommand>(value) {
                    Ok(cmd) => {
                        debug!("Vehicle received {} at {}", cmd.direction.tag(), cmd.speed);
                        let _ = command_tx.send(Some(cmd));
                    }
                    Err(e) => warn!("Malformed command at {}: {}", command_path, e),
                }
            })
            .await?;

        let steering_path = paths.steering_angle.clone();
        let angles = channel
            .subscribe(&paths.steering_angle, move |value: Value| match value.as_u64() {
                Some(angle) => {
                    debug!("Vehicle steering servo to {}", angle);
                    let _ = steering_tx.send(angle.min(u64::from(u16::MAX)) as u16);
                }
                None if value.is_null() => {}
                None => warn!("Malformed steering angle at {}: {}", steering_path, value),
            })
            .await?;

        info!("Simulated vehicle starting at {}, {}", start.latitude, start.longitude);
        Ok(Self {
            channel,
            paths: paths.clone(),
            position: start,
            proximity_cm: MAX_PROXIMITY_CM / 2.0,
            command,
            steering,
            subscriptions: vec![commands, angles],
        })
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn proximity_cm(&self) -> f64 {
        self.proximity_cm
    }

    pub fn steering(&self) -> u16 {
        *self.steering.borrow()
    }

    /// Moves along the last command for `dt` and returns the new position
    pub fn step(&mut self, dt: Duration) -> Position {
        let (direction, speed) = match &*self.command.borrow() {
            Some(cmd) => (cmd.direction, cmd.speed),
            None => (Direction::Stop, 0),
        };
        let metres = FULL_SPEED_MPS * (f64::from(speed) / 255.0) * dt.as_secs_f64();
        let (north, east) = direction.heading();

        let lat = self.position.latitude + north * metres / METRES_PER_DEGREE;
        let lon_scale = METRES_PER_DEGREE * self.position.latitude.to_radians().cos().max(1e-6);
        let lon = self.position.longitude + east * metres / lon_scale;
        self.position = Position::new(lat.clamp(-90.0, 90.0), lon);

        // Driving forward closes in on whatever is ahead, reversing backs away from it.
        let noise: f64 = thread_rng().gen_range(-2.0..2.0);
        self.proximity_cm =
            (self.proximity_cm - north * metres * 100.0 + noise).clamp(MIN_PROXIMITY_CM, MAX_PROXIMITY_CM);

        trace!("Simulated vehicle at {:?}, obstacle {} cm", self.position, self.proximity_cm);
        self.position
    }

    pub async fn publish_state(&self) -> Result<()> {
        self.channel.publish(&self.paths.vehicle_position, &self.position).await?;
        self.channel
            .publish(&self.paths.proximity_distance, &self.proximity_cm)
            .await
    }

    /// Ticks until the channel goes away for good.
    ///
    /// A lost channel or a closed command stream ends the run, other publish failures are
    /// logged by the channel and the next tick tries again.
    pub async fn run(mut self, tick: Duration) {
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if self.subscriptions.iter().any(|s| !s.is_active()) {
                info!("Command stream closed, simulated vehicle stopping");
                return;
            }
            self.step(tick);
            if let Err(TeleopError::ChannelUnavailable(reason)) = self.publish_state().await {
                warn!("Telemetry channel lost, simulated vehicle stopping: {}", reason);
                return;
            }
        }
    }
}
