use async_trait::async_trait;
use log::{debug, warn};

use crate::{
    error::{Result, TeleopError},
    messages::Position,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// The device's positioning service
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn request_permission(&self) -> Permission;
    /// Fails with [TeleopError::PermissionDenied] or [TeleopError::LocationUnavailable]
    async fn current_position(&self, high_accuracy: bool) -> Result<Position>;
}

/// Asks for permission first, then for a position
pub async fn fetch_position(source: &dyn LocationSource, high_accuracy: bool) -> Result<Position> {
    if source.request_permission().await == Permission::Denied {
        warn!("Permission to access location was denied");
        return Err(TeleopError::PermissionDenied);
    }
    let position = source.current_position(high_accuracy).await?;
    debug!("Device position {:?}", position);
    Ok(position)
}

/// A location source that always reports the same place, or nothing
pub struct FixedLocation {
    position: Option<Position>,
    permission: Permission,
}

impl FixedLocation {
    pub fn new(position: Position) -> FixedLocation {
        Self {
            position: Some(position),
            permission: Permission::Granted,
        }
    }

    /// No fix available
    pub fn unavailable() -> FixedLocation {
        Self {
            position: None,
            permission: Permission::Granted,
        }
    }

    pub fn denied() -> FixedLocation {
        Self {
            position: None,
            permission: Permission::Denied,
        }
    }
}

#[async_trait]
impl LocationSource for FixedLocation {
    async fn request_permission(&self) -> Permission {
        self.permission
    }

    async fn current_position(&self, _high_accuracy: bool) -> Result<Position> {
        if self.permission == Permission::Denied {
            return Err(TeleopError::PermissionDenied);
        }
        self.position
            .ok_or_else(|| TeleopError::LocationUnavailable("no position fix".into()))
    }
}
