//! Error type for chassis operations.

use core::fmt;

use fetchbot_hal::DeviceError;

/// Failure of a chassis operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveError {
    /// Commanded speed is invalid (zero).
    InvalidSpeed(&'static str),
    /// Polygon side count is invalid.
    InvalidSideCount(&'static str),
    /// A blocking wait exceeded its configured deadline.
    Timeout(&'static str),
    /// An underlying actuator failed.
    Device(DeviceError),
}

impl fmt::Display for DriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveError::InvalidSpeed(msg) => write!(f, "invalid speed: {}", msg),
            DriveError::InvalidSideCount(msg) => write!(f, "invalid side count: {}", msg),
            DriveError::Timeout(msg) => write!(f, "motion timed out: {}", msg),
            DriveError::Device(err) => write!(f, "actuator failure: {}", err),
        }
    }
}

impl std::error::Error for DriveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriveError::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DeviceError> for DriveError {
    fn from(err: DeviceError) -> Self {
        DriveError::Device(err)
    }
}
