//! The boundary the operator's front end talks to.
//!
//! A front end forwards gestures into a [TeleopSession] and renders the [SessionSnapshot]s it
//! gets back. It never touches the dispatcher, store or ingest directly.

use std::{str::FromStr, sync::Arc};

use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::{
    command::{dispatcher::CommandDispatcher, Direction, DirectionCommand},
    config::ControllerConfig,
    drivers::{
        location::{fetch_position, LocationSource},
        voice::VoiceRelay,
    },
    error::Result,
    messages::{DeviceLocation, Position},
    telemetry::{ingest::{ObservedTelemetry, TelemetryIngest}, TelemetryChannel, TelemetryPaths},
    waypoint::{
        router::{DistanceMetric, Route},
        Waypoint, WaypointStore,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderKind {
    Speed,
    Steering,
}

#[derive(Debug, Clone, PartialEq)]
/// Every event a front end can raise
pub enum Gesture {
    PressIn(Direction),
    PressOut(Direction),
    MapTap(Position),
    Slider(SliderKind, f64),
    Clear,
    ComputeRoute,
    PublishWaypoints,
    SendLocation,
    StartVoice,
    StopVoice,
    Show,
}

#[derive(Debug, Error, PartialEq)]
pub enum GestureError {
    #[error("unknown gesture '{0}'")]
    Unknown(String),
    #[error("unknown control '{0}'")]
    Control(String),
    #[error("'{0}' is not a number")]
    Number(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(String),
}

fn number(word: Option<&str>, gesture: &str) -> std::result::Result<f64, GestureError> {
    let word = word.ok_or_else(|| GestureError::MissingArgument(gesture.to_string()))?;
    word.parse().map_err(|_| GestureError::Number(word.to_string()))
}

fn control(word: Option<&str>, gesture: &str) -> std::result::Result<Direction, GestureError> {
    let word = word.ok_or_else(|| GestureError::MissingArgument(gesture.to_string()))?;
    Direction::from_tag(word).ok_or_else(|| GestureError::Control(word.to_string()))
}

impl FromStr for Gesture {
    type Err = GestureError;

    /// `press F`, `release F`, `tap <lat> <lon>`, `speed <v>`, `steer <deg>`,
    /// `clear`, `route`, `publish`, `locate`, `voice start|stop`, `show`
    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default().to_ascii_lowercase();
        let gesture = match head.as_str() {
            "press" | "in" => Gesture::PressIn(control(words.next(), &head)?),
            "release" | "out" => Gesture::PressOut(control(words.next(), &head)?),
            "tap" => {
                let latitude = number(words.next(), &head)?;
                let longitude = number(words.next(), &head)?;
                Gesture::MapTap(Position::new(latitude, longitude))
            }
            "speed" => Gesture::Slider(SliderKind::Speed, number(words.next(), &head)?),
            "steer" => Gesture::Slider(SliderKind::Steering, number(words.next(), &head)?),
            "clear" => Gesture::Clear,
            "route" => Gesture::ComputeRoute,
            "publish" => Gesture::PublishWaypoints,
            "locate" => Gesture::SendLocation,
            "voice" => match words.next() {
                Some("start") => Gesture::StartVoice,
                Some("stop") => Gesture::StopVoice,
                Some(other) => return Err(GestureError::Unknown(format!("voice {}", other))),
                None => return Err(GestureError::MissingArgument(head)),
            },
            "show" | "" => Gesture::Show,
            _ => return Err(GestureError::Unknown(line.trim().to_string())),
        };
        Ok(gesture)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Read only view of the session for rendering
pub struct SessionSnapshot {
    pub telemetry: ObservedTelemetry,
    pub waypoints: Vec<Waypoint>,
    pub route: Option<Route>,
    pub speed: u16,
    pub steering: u16,
    pub pressed: Vec<Direction>,
    pub device_position: Option<Position>,
    pub recording: bool,
    pub transcript: Option<String>,
}

/// One operator's session: the pad, the map and the vehicle's reported state.
pub struct TeleopSession {
    channel: TelemetryChannel,
    paths: TelemetryPaths,
    metric: DistanceMetric,
    dispatcher: CommandDispatcher,
    ingest: TelemetryIngest,
    waypoints: WaypointStore,
    location: Arc<dyn LocationSource>,
    voice: VoiceRelay,
    device_position: Option<Position>,
    /// A route document may be sitting at the nearest route path
    route_published: bool,
}

impl TeleopSession {
    pub async fn start(
        channel: TelemetryChannel,
        config: &ControllerConfig,
        location: Arc<dyn LocationSource>,
        voice: VoiceRelay,
    ) -> Result<TeleopSession> {
        config.validate()?;
        let dispatcher = CommandDispatcher::new(channel.clone(), config)?;
        let ingest = TelemetryIngest::start(&channel, &config.paths).await?;
        info!("Teleop session started");

        Ok(Self {
            channel,
            paths: config.paths.clone(),
            metric: config.distance_metric,
            dispatcher,
            ingest,
            waypoints: WaypointStore::new(),
            location,
            voice,
            device_position: None,
            route_published: false,
        })
    }

    pub async fn press_in(&mut self, control: Direction) -> Result<DirectionCommand> {
        self.dispatcher.press_in(control).await
    }

    pub async fn press_out(&mut self, control: Direction) -> Result<Option<DirectionCommand>> {
        self.dispatcher.press_out(control).await
    }

    pub fn map_tap(&mut self, position: Position) -> Result<Waypoint> {
        let waypoint = self.waypoints.add(position)?;
        info!("Placed {} at {}, {}", waypoint.label(), position.latitude, position.longitude);
        Ok(waypoint)
    }

    /// Returns the snapped value. Only steering changes are published.
    pub async fn slider_change(&mut self, kind: SliderKind, value: f64) -> Result<u16> {
        match kind {
            SliderKind::Speed => Ok(self.dispatcher.set_speed(value)),
            SliderKind::Steering => self.dispatcher.set_steering(value).await,
        }
    }

    /// Drops every waypoint and the route, then retracts what was published for them.
    ///
    /// The local set is always cleared. Retractions that fail are returned and tried
    /// again by the next clear or publish.
    pub async fn clear(&mut self) -> Result<()> {
        self.waypoints.clear();

        let route = if self.route_published {
            let outcome = self.channel.publish_value(&self.paths.nearest_route, Value::Null).await;
            self.route_published = outcome.is_err();
            outcome
        } else {
            Ok(())
        };
        let markers = self
            .waypoints
            .publish_all(&self.channel, &self.paths)
            .await
            .into_iter()
            .map(|(_, outcome)| outcome)
            .collect::<Result<Vec<()>>>();
        route.and(markers.map(|_| ()))
    }

    /// Recomputes the nearest waypoint from the last reported vehicle position and publishes it.
    ///
    /// `Ok(None)` is the normal "no route" answer and publishes nothing. If the publish
    /// fails the previous route is kept, so the snapshot only ever shows a published route.
    pub async fn compute_route(&mut self) -> Result<Option<Route>> {
        let vehicle = self.ingest.vehicle_position();
        let previous = self.waypoints.route().copied();
        let route = match self.waypoints.compute_route(vehicle, self.metric).copied() {
            Some(route) => route,
            None => {
                info!("No route: vehicle position {:?}, {} waypoints", vehicle, self.waypoints.len());
                return Ok(None);
            }
        };
        if let Err(e) = self.channel.publish(&self.paths.nearest_route, &route).await {
            self.waypoints.restore_route(previous);
            return Err(e);
        }
        self.route_published = true;
        info!("Nearest waypoint {} at distance {}", route.waypoint.label(), route.distance);
        Ok(Some(route))
    }

    pub async fn publish_waypoints(&mut self) -> Vec<(String, Result<()>)> {
        self.waypoints.publish_all(&self.channel, &self.paths).await
    }

    /// Fetches the device position and publishes it as the current location.
    ///
    /// A failed fetch leaves the previous device position in place.
    pub async fn send_location(&mut self) -> Result<DeviceLocation> {
        let position = fetch_position(self.location.as_ref(), true).await?;
        self.device_position = Some(position);
        let location = DeviceLocation::now(position);
        self.channel.publish(&self.paths.current_location(), &location).await?;
        Ok(location)
    }

    pub async fn start_voice(&mut self) -> Result<()> {
        self.voice.start().await
    }

    pub async fn stop_voice(&mut self) -> Result<()> {
        self.voice.stop().await
    }

    /// Applies a gesture. Errors are logged here as well as returned.
    pub async fn handle(&mut self, gesture: Gesture) -> Result<()> {
        let outcome = match gesture {
            Gesture::PressIn(control) => self.press_in(control).await.map(|_| ()),
            Gesture::PressOut(control) => self.press_out(control).await.map(|_| ()),
            Gesture::MapTap(position) => self.map_tap(position).map(|_| ()),
            Gesture::Slider(kind, value) => self.slider_change(kind, value).await.map(|_| ()),
            Gesture::Clear => self.clear().await,
            Gesture::ComputeRoute => self.compute_route().await.map(|_| ()),
            Gesture::PublishWaypoints => self
                .publish_waypoints()
                .await
                .into_iter()
                .map(|(_, outcome)| outcome)
                .collect::<Result<Vec<()>>>()
                .map(|_| ()),
            Gesture::SendLocation => self.send_location().await.map(|_| ()),
            Gesture::StartVoice => self.start_voice().await,
            Gesture::StopVoice => self.stop_voice().await,
            Gesture::Show => Ok(()),
        };
        if let Err(e) = &outcome {
            warn!("Gesture failed: {}", e);
        }
        outcome
    }

    pub fn snapshot(&mut self) -> SessionSnapshot {
        self.voice.poll_events();
        let state = self.dispatcher.state();
        SessionSnapshot {
            telemetry: self.ingest.snapshot(),
            waypoints: self.waypoints.waypoints().to_vec(),
            route: self.waypoints.route().copied(),
            speed: state.speed,
            steering: state.steering,
            pressed: state.press.pressed(),
            device_position: self.device_position,
            recording: self.voice.is_recording(),
            transcript: self.voice.transcript().map(str::to_string),
        }
    }

    pub fn telemetry(&self) -> &TelemetryIngest {
        &self.ingest
    }

    pub fn shutdown(self) {
        self.ingest.shutdown();
        info!("Teleop session closed");
    }
}
