//! Rover-Teleop is the controller side of a remotely driven rover.
//!
//! It is highly recommended to familiarize yourself with the following crates:
//! * [Tokio](https://docs.rs/tokio/latest/tokio)
//! * [Serde](https://docs.rs/serde/latest/serde)
//!
//! The controller and the vehicle never talk to each other directly. Both sides read and write
//! documents in a shared key-value store, addressed by paths such as `vehicle/position` or
//! `controller/currentCommand`. The store is either in process ([telemetry::store::MemoryStore])
//! or hosted by a [telemetry::hub::TelemetryHub] and reached over tcp through a
//! [telemetry::remote::RemoteStore]. Each path is its own stream: nothing is ordered across paths.
//!
//! The operator's front end drives a [ui::TeleopSession]. Button presses become direction
//! commands, map taps become waypoints, and the vehicle's reports flow back in as
//! [telemetry::ingest::ObservedTelemetry].

/// Errors shared by the whole crate.
pub mod error;
/// Controller settings and their YAML loader.
pub mod config;
/// Data types that cross the channel.
pub mod messages;
/// Snaps slider values onto the discrete speed and steering levels.
pub mod quantizer;
/// Direction commands and the press/release state machine that emits them.
pub mod command;
/// The publish/subscribe channel, its backing stores and the inbound telemetry ingest.
pub mod telemetry;
/// The tcp framing used between a remote store and the hub.
pub mod network;
/// Operator placed waypoints and nearest waypoint routing.
pub mod waypoint;
/// Device collaborators: location and voice capture.
pub mod drivers;
/// The session facade the front end calls into.
pub mod ui;
/// Vehicle side programs, currently a simulator.
pub mod operators;

pub use error::{Result, TeleopError};
