//! Arm calibration and positioning.
//!
//! The arm is spring-loaded against a physical limit switch. Its zero
//! reference does not exist until calibration has driven it into the switch
//! and back down through its full mechanical range, so absolute moves are
//! rejected until then.

use core::fmt;
use std::time::{Duration, Instant};

use spin_sleep::SpinSleeper;
use tracing::{debug, info};

use fetchbot_hal::{Actuator, DeviceError, MAX_SPEED_DEG_PER_SEC, Notifier, TouchSensor};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Full mechanical range of the arm, in device degrees (14.2 rotations).
pub const ARM_RANGE_DEG: i32 = 5112;

/// Where the arm controller is in its lifecycle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArmState {
    /// No zero reference yet; absolute commands are rejected.
    #[default]
    Uncalibrated,
    /// Calibration sequence in progress.
    Calibrating,
    /// Zero reference established; up/down commands are valid.
    Calibrated,
    /// An up/down motion is in progress.
    Positioning,
}

/// Arm controller configuration.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmConfig {
    /// Speed for every arm motion (deg/s); clamped to the device ceiling.
    pub speed_dps: i32,
    /// Device degrees between the limit switch and the zero reference.
    pub range_deg: i32,
    /// Interval between limit-switch and busy-predicate polls (ms).
    pub poll_interval_ms: u64,
    /// Optional deadline for each blocking phase of a motion (ms).
    pub wait_timeout_ms: Option<u64>,
}

impl Default for ArmConfig {
    fn default() -> Self {
        ArmConfig {
            speed_dps: MAX_SPEED_DEG_PER_SEC,
            range_deg: ARM_RANGE_DEG,
            poll_interval_ms: 10,
            wait_timeout_ms: None,
        }
    }
}

/// Failure of an arm operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmError {
    /// An absolute command was issued before a zero reference exists.
    NotCalibrated(&'static str),
    /// The state machine refuses this command in its current state.
    Busy(&'static str),
    /// A blocking phase exceeded its configured deadline.
    Timeout(&'static str),
    /// The arm actuator or the limit switch failed.
    Device(DeviceError),
}

impl fmt::Display for ArmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmError::NotCalibrated(msg) => write!(f, "arm not calibrated: {}", msg),
            ArmError::Busy(msg) => write!(f, "arm busy: {}", msg),
            ArmError::Timeout(msg) => write!(f, "arm motion timed out: {}", msg),
            ArmError::Device(err) => write!(f, "arm device failure: {}", err),
        }
    }
}

impl std::error::Error for ArmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArmError::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DeviceError> for ArmError {
    fn from(err: DeviceError) -> Self {
        ArmError::Device(err)
    }
}

/// The arm actuator, its limit switch, and the notification sink, gated by
/// an explicit state machine.
#[derive(Debug)]
pub struct Arm<A: Actuator, T: TouchSensor, N: Notifier> {
    motor: A,
    touch: T,
    notifier: N,
    state: ArmState,
    config: ArmConfig,
}

impl<A: Actuator, T: TouchSensor, N: Notifier> Arm<A, T, N> {
    /// Build an arm controller in the `Uncalibrated` state.
    pub fn new(motor: A, touch: T, notifier: N, config: ArmConfig) -> Self {
        Arm {
            motor,
            touch,
            notifier,
            state: ArmState::Uncalibrated,
            config,
        }
    }

    /// The controller's current state.
    pub fn state(&self) -> ArmState {
        self.state
    }

    /// Establish the zero reference.
    ///
    /// Drives the arm into the limit switch, brakes, runs back down through
    /// the full mechanical range, and redefines the landing position as 0.
    /// Recalibrating an already calibrated arm is legal and lands the zero
    /// reference in the same physical place. Beeps on completion.
    ///
    /// # Errors
    ///
    /// `Err(ArmError::Busy)` if a motion is in progress, plus timeout and
    /// device errors from the motion itself; on failure the state falls back
    /// to `Uncalibrated`.
    pub fn calibrate(&mut self) -> Result<(), ArmError> {
        match self.state {
            ArmState::Uncalibrated | ArmState::Calibrated => {}
            _ => return Err(ArmError::Busy("motion in progress")),
        }
        info!("calibrating arm");
        self.state = ArmState::Calibrating;
        match self.calibrate_sequence() {
            Ok(()) => {
                self.state = ArmState::Calibrated;
                self.notifier.beep();
                info!("arm calibrated");
                Ok(())
            }
            Err(err) => {
                self.state = ArmState::Uncalibrated;
                Err(err)
            }
        }
    }

    fn calibrate_sequence(&mut self) -> Result<(), ArmError> {
        let speed = self.clamp_speed();
        self.motor.run_forever(speed)?;
        self.run_until_limit()?;
        self.motor.stop(true)?;
        self.motor.run_to_relative(speed, -self.config.range_deg)?;
        self.wait_until_idle()?;
        self.motor.set_position(0)?;
        Ok(())
    }

    /// Raise the arm until the limit switch trips, then brake.
    ///
    /// "Up" is the physical limit, not a stored position, so this does not
    /// depend on the zero reference, but the state machine still requires a
    /// calibrated arm. Beeps on completion.
    ///
    /// # Errors
    ///
    /// `Err(ArmError::NotCalibrated)` unless the arm is calibrated, plus
    /// timeout and device errors from the motion.
    pub fn up(&mut self) -> Result<(), ArmError> {
        self.require_calibrated()?;
        debug!("raising arm");
        self.state = ArmState::Positioning;
        let result: Result<(), ArmError> = (|| {
            let speed = self.clamp_speed();
            self.motor.run_forever(speed)?;
            self.run_until_limit()?;
            self.motor.stop(true)?;
            Ok(())
        })();
        // The zero reference survives a failed motion.
        self.state = ArmState::Calibrated;
        result?;
        self.notifier.beep();
        Ok(())
    }

    /// Lower the arm to the zero reference with an absolute move.
    ///
    /// Blocks until the motion completes, then beeps.
    ///
    /// # Errors
    ///
    /// `Err(ArmError::NotCalibrated)` unless the arm is calibrated, plus
    /// timeout and device errors from the motion.
    pub fn down(&mut self) -> Result<(), ArmError> {
        self.require_calibrated()?;
        debug!("lowering arm");
        self.state = ArmState::Positioning;
        let result: Result<(), ArmError> = (|| {
            let speed = self.clamp_speed();
            self.motor.run_to_absolute(speed, 0)?;
            self.wait_until_idle()?;
            Ok(())
        })();
        self.state = ArmState::Calibrated;
        result?;
        self.notifier.beep();
        Ok(())
    }

    fn require_calibrated(&self) -> Result<(), ArmError> {
        match self.state {
            ArmState::Calibrated => Ok(()),
            ArmState::Uncalibrated => Err(ArmError::NotCalibrated("no zero reference")),
            _ => Err(ArmError::Busy("motion in progress")),
        }
    }

    /// Poll the limit switch until it trips; the motor is stopped (braked)
    /// before returning an error so a failed wait never leaves it running.
    fn run_until_limit(&mut self) -> Result<(), ArmError> {
        let sleeper = SpinSleeper::new(10_000);
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        let deadline = self.deadline();
        loop {
            match self.touch.is_pressed() {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(err) => {
                    let _ = self.motor.stop(true);
                    return Err(err.into());
                }
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    let _ = self.motor.stop(true);
                    return Err(ArmError::Timeout("limit switch never tripped"));
                }
            }
            sleeper.sleep(interval);
        }
    }

    fn wait_until_idle(&mut self) -> Result<(), ArmError> {
        let sleeper = SpinSleeper::new(10_000);
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        let deadline = self.deadline();
        while self.motor.is_running()? {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    let _ = self.motor.stop(true);
                    return Err(ArmError::Timeout("actuator still running at deadline"));
                }
            }
            sleeper.sleep(interval);
        }
        Ok(())
    }

    fn deadline(&self) -> Option<Instant> {
        self.config
            .wait_timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms))
    }

    fn clamp_speed(&self) -> i32 {
        self.config
            .speed_dps
            .clamp(-MAX_SPEED_DEG_PER_SEC, MAX_SPEED_DEG_PER_SEC)
    }
}
