use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Turns press and release gestures into published motion commands.
pub mod dispatcher;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Motion directions the vehicle understands
pub enum Direction {
    #[serde(rename = "F")]
    Forward,
    #[serde(rename = "B")]
    Backward,
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
    #[serde(rename = "FL")]
    ForwardLeft,
    #[serde(rename = "FR")]
    ForwardRight,
    #[serde(rename = "BL")]
    BackwardLeft,
    #[serde(rename = "BR")]
    BackwardRight,
    #[serde(rename = "STOP")]
    Stop,
}

impl Direction {
    pub const ALL: [Direction; 9] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
        Direction::ForwardLeft,
        Direction::ForwardRight,
        Direction::BackwardLeft,
        Direction::BackwardRight,
        Direction::Stop,
    ];

    /// The wire tag, `F`, `BL`, `STOP`...
    pub fn tag(&self) -> &'static str {
        match self {
            Direction::Forward => "F",
            Direction::Backward => "B",
            Direction::Left => "L",
            Direction::Right => "R",
            Direction::ForwardLeft => "FL",
            Direction::ForwardRight => "FR",
            Direction::BackwardLeft => "BL",
            Direction::BackwardRight => "BR",
            Direction::Stop => "STOP",
        }
    }

    /// Parses a tag case-insensitively
    pub fn from_tag(tag: &str) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|d| d.tag().eq_ignore_ascii_case(tag))
    }

    /// Unit heading in (north, east) for dead reckoning. Stop is `(0, 0)`.
    pub fn heading(&self) -> (f64, f64) {
        const D: f64 = std::f64::consts::FRAC_1_SQRT_2;
        match self {
            Direction::Forward => (1.0, 0.0),
            Direction::Backward => (-1.0, 0.0),
            Direction::Left => (0.0, -1.0),
            Direction::Right => (0.0, 1.0),
            Direction::ForwardLeft => (D, -D),
            Direction::ForwardRight => (D, D),
            Direction::BackwardLeft => (-D, -D),
            Direction::BackwardRight => (-D, D),
            Direction::Stop => (0.0, 0.0),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
/// A single motion command. Published once, never kept.
pub struct DirectionCommand {
    pub direction: Direction,
    /// Speed at dispatch time. Stop commands still carry the last speed.
    pub speed: u16,
    pub timestamp: DateTime<Utc>,
}

/// Stamps `direction` and `speed` into a command
pub fn encode(direction: Direction, speed: u16) -> DirectionCommand {
    DirectionCommand {
        direction,
        speed,
        timestamp: Utc::now(),
    }
}
