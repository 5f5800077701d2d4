use thiserror::Error;

/// Everything that can go wrong between the controller, its collaborators and the telemetry store.
///
/// None of these are fatal to the core: callers report them and keep the previous state.
#[derive(Debug, Error)]
pub enum TeleopError {
    #[error("location permission was denied")]
    PermissionDenied,
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),
    #[error("telemetry channel unavailable: {0}")]
    ChannelUnavailable(String),
    #[error("malformed payload at {path}: {reason}")]
    MalformedPayload { path: String, reason: String },
    #[error("invalid position {latitude}, {longitude}")]
    InvalidPosition { latitude: f64, longitude: f64 },
    #[error("no route: vehicle position unknown or no waypoints placed")]
    NoRoute,
    #[error("voice capture unavailable: {0}")]
    VoiceUnavailable(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TeleopError>;

impl TeleopError {
    pub(crate) fn malformed(path: &str, reason: impl ToString) -> Self {
        TeleopError::MalformedPayload {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}
