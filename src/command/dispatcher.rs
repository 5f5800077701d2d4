use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    config::ControllerConfig,
    error::Result,
    quantizer::LevelSet,
    telemetry::TelemetryChannel,
};

use super::{encode, Direction, DirectionCommand};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlState {
    #[default]
    Idle,
    Pressed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Press state of every button on the pad
pub struct PressStates {
    pub forward: ControlState,
    pub backward: ControlState,
    pub left: ControlState,
    pub right: ControlState,
    pub forward_left: ControlState,
    pub forward_right: ControlState,
    pub backward_left: ControlState,
    pub backward_right: ControlState,
    pub stop: ControlState,
}

impl PressStates {
    pub fn get(&self, control: Direction) -> ControlState {
        match control {
            Direction::Forward => self.forward,
            Direction::Backward => self.backward,
            Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::ForwardLeft => self.forward_left,
            Direction::ForwardRight => self.forward_right,
            Direction::BackwardLeft => self.backward_left,
            Direction::BackwardRight => self.backward_right,
            Direction::Stop => self.stop,
        }
    }

    fn get_mut(&mut self, control: Direction) -> &mut ControlState {
        match control {
            Direction::Forward => &mut self.forward,
            Direction::Backward => &mut self.backward,
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
            Direction::ForwardLeft => &mut self.forward_left,
            Direction::ForwardRight => &mut self.forward_right,
            Direction::BackwardLeft => &mut self.backward_left,
            Direction::BackwardRight => &mut self.backward_right,
            Direction::Stop => &mut self.stop,
        }
    }

    /// Controls currently held, in pad order
    pub fn pressed(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|c| self.get(*c) == ControlState::Pressed)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Everything the pad remembers between gestures
pub struct SessionState {
    pub press: PressStates,
    pub speed: u16,
    pub steering: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// How simultaneous presses interact
pub enum PressPolicy {
    /// Every control keeps its own press/release pair, several can be held at once
    #[default]
    Independent,
    /// A press idles every other held control; releasing an idled control sends nothing
    Exclusive,
}

/// Owns the pad's [SessionState] and publishes a [DirectionCommand] for each gesture.
///
/// Publishing is fire-and-forget: a failed publish is logged by the channel and returned,
/// but the press state has already moved and the next gesture is handled normally.
pub struct CommandDispatcher {
    channel: TelemetryChannel,
    command_path: String,
    steering_path: String,
    speeds: LevelSet,
    steering: LevelSet,
    policy: PressPolicy,
    state: SessionState,
}

impl CommandDispatcher {
    pub fn new(channel: TelemetryChannel, config: &ControllerConfig) -> Result<CommandDispatcher> {
        let speeds = config.speed_levels.clone();
        let steering = config.steering_levels()?;
        let state = SessionState {
            press: PressStates::default(),
            speed: speeds.quantize(f64::from(config.initial_speed)),
            steering: steering.quantize(f64::from(config.initial_steering)),
        };

        Ok(Self {
            channel,
            command_path: config.paths.current_command.clone(),
            steering_path: config.paths.steering_angle.clone(),
            speeds,
            steering,
            policy: config.press_policy,
            state,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn speed(&self) -> u16 {
        self.state.speed
    }

    pub fn steering(&self) -> u16 {
        self.state.steering
    }

    /// Idle -> Pressed, publishes the control's direction at the current speed
    pub async fn press_in(&mut self, control: Direction) -> Result<DirectionCommand> {
        if self.state.press.get(control) == ControlState::Pressed {
            debug!("{} pressed while already held", control.tag());
        }
        if self.policy == PressPolicy::Exclusive {
            for held in self.state.press.pressed() {
                *self.state.press.get_mut(held) = ControlState::Idle;
            }
        }
        *self.state.press.get_mut(control) = ControlState::Pressed;

        self.dispatch(control).await
    }

    /// Pressed -> Idle, publishes a stop. Releasing the stop control itself publishes nothing.
    pub async fn press_out(&mut self, control: Direction) -> Result<Option<DirectionCommand>> {
        let was = std::mem::replace(self.state.press.get_mut(control), ControlState::Idle);

        if control == Direction::Stop {
            return Ok(None);
        }
        if self.policy == PressPolicy::Exclusive && was == ControlState::Idle {
            debug!("{} released after being superseded", control.tag());
            return Ok(None);
        }
        self.dispatch(Direction::Stop).await.map(Some)
    }

    /// Snaps and remembers the speed. It is only sent with the next command.
    pub fn set_speed(&mut self, raw: f64) -> u16 {
        self.state.speed = self.speeds.quantize(raw);
        debug!("Speed set to {}", self.state.speed);
        self.state.speed
    }

    /// Snaps the steering angle and publishes it straight away
    pub async fn set_steering(&mut self, raw: f64) -> Result<u16> {
        let angle = self.steering.quantize(raw);
        self.state.steering = angle;
        self.channel.publish(&self.steering_path, &angle).await?;
        debug!("Steering angle {} published", angle);
        Ok(angle)
    }

    async fn dispatch(&self, direction: Direction) -> Result<DirectionCommand> {
        let command = encode(direction, self.state.speed);
        self.channel.publish(&self.command_path, &command).await?;
        info!("Sent {} at speed {}", direction.tag(), command.speed);
        Ok(command)
    }
}
