#![warn(missing_docs)]
#![doc = "Chassis controller for the fetchbot differential-drive robot."]
#![doc = ""]
#![doc = "This crate converts distance and angle targets into paired actuator"]
#![doc = "commands: straight-line travel, in-place turns, closed polygon paths,"]
#![doc = "and the non-blocking continuous commands used by the feedback layer."]

use std::time::{Duration, Instant};

use spin_sleep::SpinSleeper;
use tracing::debug;

use fetchbot_hal::{Actuator, MAX_SPEED_DEG_PER_SEC};

pub mod error;
pub use error::DriveError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Wheel rotation per inch of straight-line travel, in device degrees.
pub const DEG_PER_INCH: f64 = 90.0;

/// Wheel rotation per degree of in-place chassis rotation, in device degrees.
pub const WHEEL_DEG_PER_CHASSIS_DEG: f64 = 4.5;

/// Chassis controller configuration.
///
/// `wait_timeout_ms` bounds the blocking "wait until idle" poll loop; `None`
/// waits forever on a stuck actuator.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveConfig {
    /// Speed magnitude ceiling applied to every command (deg/s).
    pub max_speed_dps: i32,
    /// Interval between busy-predicate polls while blocking (ms).
    pub poll_interval_ms: u64,
    /// Optional deadline for a single blocking motion (ms).
    pub wait_timeout_ms: Option<u64>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig {
            max_speed_dps: MAX_SPEED_DEG_PER_SEC,
            poll_interval_ms: 10,
            wait_timeout_ms: None,
        }
    }
}

/// Two drive actuators composed into primitive chassis motions.
///
/// Blocking primitives (`drive_inches`, `turn_degrees`, `drive_polygon`) poll
/// the actuators' busy predicate on the calling thread until the motion
/// completes. The continuous commands (`forward`, `back`, `spin_left`,
/// `spin_right`) return immediately so a control loop can issue a fresh
/// command every tick.
#[derive(Debug)]
pub struct Chassis<A: Actuator> {
    left: A,
    right: A,
    config: DriveConfig,
}

impl<A: Actuator> Chassis<A> {
    /// Compose the left and right drive actuators into a chassis.
    pub fn new(left: A, right: A, config: DriveConfig) -> Self {
        Chassis {
            left,
            right,
            config,
        }
    }

    /// Drive in a straight line for `inches` (negative drives backward).
    ///
    /// Both actuators receive the same relative target
    /// (`inches` × [`DEG_PER_INCH`]) and the same speed, so the chassis
    /// tracks a straight line. Blocks until the motion completes.
    ///
    /// # Errors
    ///
    /// Returns `Err(DriveError::InvalidSpeed)` if `speed` is zero, and
    /// `Err(DriveError::Timeout)` if a configured wait deadline elapses.
    pub fn drive_inches(&mut self, inches: f64, speed: i32) -> Result<(), DriveError> {
        if speed == 0 {
            return Err(DriveError::InvalidSpeed("must be nonzero"));
        }
        let speed = self.clamp_speed(speed);
        let target = (inches * DEG_PER_INCH).round() as i32;
        debug!(inches, speed, target, "driving straight");

        self.left.run_to_relative(speed, target)?;
        self.right.run_to_relative(speed, target)?;
        self.wait_until_idle()
    }

    /// Turn in place by `degrees` of chassis rotation.
    ///
    /// Positive `degrees` turns counter-clockwise (left). The two actuators
    /// receive equal-magnitude, opposite-sign relative targets
    /// (`degrees` × [`WHEEL_DEG_PER_CHASSIS_DEG`]). A zero angle is a no-op.
    /// Blocks until the motion completes.
    ///
    /// # Errors
    ///
    /// Returns `Err(DriveError::InvalidSpeed)` if `speed` is zero, and
    /// `Err(DriveError::Timeout)` if a configured wait deadline elapses.
    pub fn turn_degrees(&mut self, degrees: f64, speed: i32) -> Result<(), DriveError> {
        if speed == 0 {
            return Err(DriveError::InvalidSpeed("must be nonzero"));
        }
        if degrees == 0.0 {
            return Ok(());
        }
        let speed = self.clamp_speed(speed);
        let target = (degrees * WHEEL_DEG_PER_CHASSIS_DEG).round() as i32;
        debug!(degrees, speed, target, "turning in place");

        self.left.run_to_relative(speed, -target)?;
        self.right.run_to_relative(speed, target)?;
        self.wait_until_idle()
    }

    /// Trace a closed equilateral polygon with `sides` edges of
    /// `edge_inches` each.
    ///
    /// Alternates [`Chassis::drive_inches`] and a `360 / sides` degree turn,
    /// `sides` times; the commanded turns sum to a full 360°, closing the
    /// path regardless of `sides`.
    ///
    /// # Errors
    ///
    /// Returns `Err(DriveError::InvalidSideCount)` if `sides < 3`, plus any
    /// error from the underlying motions.
    pub fn drive_polygon(
        &mut self,
        sides: u32,
        speed: i32,
        edge_inches: f64,
    ) -> Result<(), DriveError> {
        if sides < 3 {
            return Err(DriveError::InvalidSideCount("must be at least 3"));
        }
        let turn = 360.0 / sides as f64;
        debug!(sides, speed, edge_inches, turn, "driving polygon");
        for _ in 0..sides {
            self.drive_inches(edge_inches, speed)?;
            self.turn_degrees(turn, speed)?;
        }
        Ok(())
    }

    /// Run both wheels forward continuously. Returns immediately.
    pub fn forward(&mut self, left_speed: i32, right_speed: i32) -> Result<(), DriveError> {
        let left_speed = self.clamp_speed(left_speed);
        let right_speed = self.clamp_speed(right_speed);
        self.left.run_forever(left_speed)?;
        self.right.run_forever(right_speed)?;
        Ok(())
    }

    /// Run both wheels backward continuously. Returns immediately.
    pub fn back(&mut self, left_speed: i32, right_speed: i32) -> Result<(), DriveError> {
        // Clamp before negating so i32::MIN cannot overflow.
        let left_speed = -self.clamp_speed(left_speed);
        let right_speed = -self.clamp_speed(right_speed);
        self.left.run_forever(left_speed)?;
        self.right.run_forever(right_speed)?;
        Ok(())
    }

    /// Pivot counter-clockwise in place at `speed`. Returns immediately.
    pub fn spin_left(&mut self, speed: i32) -> Result<(), DriveError> {
        let speed = self.clamp_speed(speed);
        self.left.run_forever(-speed)?;
        self.right.run_forever(speed)?;
        Ok(())
    }

    /// Pivot clockwise in place at `speed`. Returns immediately.
    pub fn spin_right(&mut self, speed: i32) -> Result<(), DriveError> {
        let speed = self.clamp_speed(speed);
        self.left.run_forever(speed)?;
        self.right.run_forever(-speed)?;
        Ok(())
    }

    /// Stop both wheels and engage the brakes.
    ///
    /// Idempotent and safe to call in any actuator mode.
    pub fn stop(&mut self) -> Result<(), DriveError> {
        self.left.stop(true)?;
        self.right.stop(true)?;
        Ok(())
    }

    /// Block until neither actuator reports a motion in progress.
    ///
    /// Polls at the configured interval. With a configured deadline, returns
    /// `Err(DriveError::Timeout)` instead of hanging on a stuck actuator.
    pub fn wait_until_idle(&mut self) -> Result<(), DriveError> {
        let sleeper = SpinSleeper::new(10_000);
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        let deadline = self
            .config
            .wait_timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        while self.left.is_running()? || self.right.is_running()? {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(DriveError::Timeout("actuator still running at deadline"));
                }
            }
            sleeper.sleep(interval);
        }
        Ok(())
    }

    fn clamp_speed(&self, speed: i32) -> i32 {
        speed.clamp(-self.config.max_speed_dps, self.config.max_speed_dps)
    }
}
