use serde::{Deserialize, Serialize};

use fetchbot_hal::{LightColor, Side};

/// The externally invocable command surface.
///
/// Every variant carries only primitive or string arguments and returns
/// nothing to the sender; the remote channel that marshals these is an
/// external collaborator. Locally, commands travel over a [`crate::bus::Topic`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    /// Drive straight for a distance in inches.
    DriveInches { inches: f64, speed: i32 },
    /// Turn in place; positive degrees turn counter-clockwise.
    TurnDegrees { degrees: f64, speed: i32 },
    /// Trace a closed equilateral polygon.
    DrivePolygon {
        sides: u32,
        speed: i32,
        edge_inches: f64,
    },
    /// Run both wheels forward continuously.
    Forward { left_speed: i32, right_speed: i32 },
    /// Run both wheels backward continuously.
    Back { left_speed: i32, right_speed: i32 },
    /// Pivot counter-clockwise continuously.
    SpinLeft { speed: i32 },
    /// Pivot clockwise continuously.
    SpinRight { speed: i32 },
    /// Stop and brake both drive wheels.
    Stop,
    /// Calibrate the arm's zero reference.
    Calibrate,
    /// Raise the arm to its limit switch.
    ArmUp,
    /// Lower the arm to the zero reference.
    ArmDown,
    /// Run the beacon-seeking loop to a terminal outcome.
    SeekBeacon,
    /// Speak a line of text.
    Speak { text: String },
    /// Set a status light.
    SetLight { side: Side, color: LightColor },
    /// Stop everything and terminate the process loop.
    Shutdown,
}
