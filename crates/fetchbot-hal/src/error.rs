//! Error type shared by all device interfaces.

use core::fmt;

/// Failure reported by a device behind one of the hal traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// The device did not answer a command or a poll.
    NotResponding(&'static str),
    /// A commanded value is outside the device's accepted range.
    OutOfRange(&'static str),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NotResponding(msg) => write!(f, "device not responding: {}", msg),
            DeviceError::OutOfRange(msg) => write!(f, "value out of device range: {}", msg),
        }
    }
}

impl std::error::Error for DeviceError {}
