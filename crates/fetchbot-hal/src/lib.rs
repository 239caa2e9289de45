#![warn(missing_docs)]
#![doc = "Device interfaces for the fetchbot robot."]
#![doc = ""]
#![doc = "This crate defines the actuator, sensor, and notification-sink traits the"]
#![doc = "control layers are written against, plus cheap-clone simulated devices"]
#![doc = "used by the daemon and by tests."]

pub mod error;
pub mod sim;

pub use error::DeviceError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Speed ceiling of the drive and arm motors, in device degrees per second.
///
/// Every controller clamps commanded speed magnitude to this value before it
/// reaches an actuator.
pub const MAX_SPEED_DEG_PER_SEC: i32 = 900;

/// Raw distance value the beacon sensor reports when no beacon is visible.
pub const BEACON_NOT_VISIBLE: i32 = -128;

/// The mode an actuator was last commanded into.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActuatorMode {
    /// No command issued yet, or stopped without brake.
    #[default]
    Idle,
    /// Running to a target relative to the position at command time.
    RunningToRelative,
    /// Running to an absolute target position.
    RunningToAbsolute,
    /// Running continuously at a commanded speed until told otherwise.
    RunningForever,
    /// Stopped with the brake engaged.
    Braked,
}

/// A single command accepted by an actuator, as recorded by the simulated
/// devices for tests and telemetry.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCommand {
    /// Run to a position relative to the current one.
    RunToRelative {
        /// Commanded speed (device degrees per second, signed).
        speed: i32,
        /// Relative target (device degrees, signed).
        target: i32,
    },
    /// Run to an absolute position.
    RunToAbsolute {
        /// Commanded speed (device degrees per second, signed).
        speed: i32,
        /// Absolute target (device degrees).
        target: i32,
    },
    /// Run continuously at the given speed.
    RunForever {
        /// Commanded speed (device degrees per second, signed).
        speed: i32,
    },
    /// Stop, optionally engaging the brake.
    Stop {
        /// Whether the brake was engaged.
        brake: bool,
    },
    /// Redefine the current physical position as `value`.
    SetPosition {
        /// The new position value (device degrees).
        value: i32,
    },
}

/// One poll of the infrared beacon sensor.
///
/// `heading` is signed degrees from robot-forward: 0 means dead ahead,
/// positive is to the robot's right. `distance` is a coarse proximity code
/// (0 = touching the beacon); `None` means the beacon is not visible.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BeaconReading {
    /// Signed heading to the beacon, degrees from robot-forward.
    pub heading: i32,
    /// Proximity code, or `None` when the beacon is not visible.
    pub distance: Option<i32>,
}

impl BeaconReading {
    /// Construct a reading from a heading and a visible distance.
    pub const fn new(heading: i32, distance: i32) -> Self {
        BeaconReading {
            heading,
            distance: Some(distance),
        }
    }

    /// A "beacon not visible" reading.
    pub const fn not_visible() -> Self {
        BeaconReading {
            heading: 0,
            distance: None,
        }
    }

    /// Construct a reading from raw device values, mapping the device's
    /// not-visible sentinel ([`BEACON_NOT_VISIBLE`]) to `None`.
    pub const fn from_raw(heading: i32, raw_distance: i32) -> Self {
        BeaconReading {
            heading,
            distance: if raw_distance == BEACON_NOT_VISIBLE {
                None
            } else {
                Some(raw_distance)
            },
        }
    }
}

/// Surface colors the color sensor can classify.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    /// No confident classification.
    #[default]
    Unknown,
    /// Black surface.
    Black,
    /// Blue surface.
    Blue,
    /// Green surface.
    Green,
    /// Yellow surface.
    Yellow,
    /// Red surface.
    Red,
    /// White surface.
    White,
    /// Brown surface.
    Brown,
}

impl Color {
    /// Map the device's numeric color code to a [`Color`].
    ///
    /// Codes outside the device's 1..=7 range map to `Unknown`.
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Color::Black,
            2 => Color::Blue,
            3 => Color::Green,
            4 => Color::Yellow,
            5 => Color::Red,
            6 => Color::White,
            7 => Color::Brown,
            _ => Color::Unknown,
        }
    }
}

/// Which side of the robot a status light sits on.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Left status light.
    Left,
    /// Right status light.
    Right,
}

/// Colors a status light can show.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightColor {
    /// Light off.
    #[default]
    Off,
    /// Green: safe / idle.
    Green,
    /// Amber: busy.
    Amber,
    /// Red: fault.
    Red,
}

/// A rotary actuator commanded via position targets or continuous-run speed.
///
/// Two instances drive the chassis; one drives the arm. Position and speed
/// are in device degrees and device degrees per second.
pub trait Actuator {
    /// Run to `target_deg` relative to the current position, then hold.
    fn run_to_relative(&mut self, speed: i32, target_deg: i32) -> Result<(), DeviceError>;

    /// Run to the absolute position `target_deg`, then hold.
    fn run_to_absolute(&mut self, speed: i32, target_deg: i32) -> Result<(), DeviceError>;

    /// Run continuously at `speed` until stopped.
    fn run_forever(&mut self, speed: i32) -> Result<(), DeviceError>;

    /// Stop, engaging the brake if `brake` is true.
    fn stop(&mut self, brake: bool) -> Result<(), DeviceError>;

    /// Whether a commanded motion is still in progress.
    fn is_running(&mut self) -> Result<bool, DeviceError>;

    /// Redefine the current physical position as `degrees`.
    fn set_position(&mut self, degrees: i32) -> Result<(), DeviceError>;

    /// The current position, in device degrees.
    fn position(&mut self) -> Result<i32, DeviceError>;
}

/// A binary contact sensor.
pub trait TouchSensor {
    /// Whether the switch is currently pressed.
    fn is_pressed(&mut self) -> Result<bool, DeviceError>;
}

/// An infrared sensor reporting heading and proximity to a remote beacon.
pub trait BeaconSensor {
    /// Take a fresh reading. Readings are not persisted by the device.
    fn reading(&mut self) -> Result<BeaconReading, DeviceError>;
}

/// A surface color classifier.
pub trait ColorSensor {
    /// Classify the surface currently under the sensor.
    fn color(&mut self) -> Result<Color, DeviceError>;
}

/// Fire-and-forget notification sink: speech, beeps, and status lights.
///
/// Notifications carry no result; a lost notification is not an error.
pub trait Notifier {
    /// Speak `text` aloud.
    fn speak(&mut self, text: &str);

    /// Emit a short beep.
    fn beep(&mut self);

    /// Set the status light on `side` to `color`.
    fn set_light(&mut self, side: Side, color: LightColor);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beacon_reading_maps_sentinel_to_none() {
        let reading = BeaconReading::from_raw(5, BEACON_NOT_VISIBLE);
        assert_eq!(reading.distance, None);
        assert_eq!(reading.heading, 5);

        let visible = BeaconReading::from_raw(-3, 42);
        assert_eq!(visible.distance, Some(42));
        assert_eq!(visible.heading, -3);
    }

    #[test]
    fn beacon_reading_zero_distance_is_visible() {
        // Distance 0 means "touching the beacon", not "not visible".
        let reading = BeaconReading::from_raw(0, 0);
        assert_eq!(reading.distance, Some(0));
    }

    #[test]
    fn color_codes_map_to_colors() {
        assert_eq!(Color::from_code(1), Color::Black);
        assert_eq!(Color::from_code(5), Color::Red);
        assert_eq!(Color::from_code(7), Color::Brown);
        assert_eq!(Color::from_code(0), Color::Unknown);
        assert_eq!(Color::from_code(99), Color::Unknown);
        assert_eq!(Color::from_code(-1), Color::Unknown);
    }
}
