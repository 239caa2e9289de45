//! Closed-loop beacon seeking.
//!
//! A memoryless bang-bang controller: every tick it re-reads the operator
//! abort switch and the beacon, classifies the heading into one of three
//! bands, and issues a fresh non-blocking drive command. No history is kept
//! between ticks, so the controller can oscillate around band edges; that is
//! accepted behavior.

use core::fmt;
use std::time::Duration;

use spin_sleep::SpinSleeper;
use tracing::{debug, info, trace};

use fetchbot_drive::{Chassis, DriveError};
use fetchbot_hal::{Actuator, BeaconSensor, DeviceError, TouchSensor};

use crate::cancel::CancelToken;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a seek run ended. The only two terminal states: there is no timeout,
/// so an unreachable beacon seeks forever until the operator aborts.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// The beacon was reached: distance hit 0 with the heading on target.
    Found,
    /// The operator aborted via the touch sensor, or the run token was
    /// cancelled.
    Aborted,
}

/// Heading band relative to the configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingClass {
    /// Close enough to drive straight at the beacon.
    OnTarget,
    /// Off target but recoverable by pivoting in place.
    Correctable,
    /// Too far off to correct; sit still and keep polling.
    TooFarOff,
}

/// Beacon seeker configuration.
///
/// `inclusive_bounds` selects the boundary policy at `|heading| ==
/// on_target_max_deg` and `== correctable_max_deg`. The inclusive default
/// closes the bands; with the exclusive policy neither branch fires on an
/// exact boundary value and the chassis keeps its previous command for that
/// tick.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekConfig {
    /// Wheel speed while driving at the beacon (deg/s).
    pub forward_speed_dps: i32,
    /// Wheel speed while pivoting toward the beacon (deg/s).
    pub turn_speed_dps: i32,
    /// Control-loop tick interval (ms).
    pub tick_ms: u64,
    /// Largest |heading| treated as on target (degrees).
    pub on_target_max_deg: i32,
    /// Largest |heading| treated as correctable by pivoting (degrees).
    pub correctable_max_deg: i32,
    /// Whether band edges belong to the band below them.
    pub inclusive_bounds: bool,
}

impl Default for SeekConfig {
    fn default() -> Self {
        SeekConfig {
            forward_speed_dps: 300,
            turn_speed_dps: 100,
            tick_ms: 200,
            on_target_max_deg: 2,
            correctable_max_deg: 10,
            inclusive_bounds: true,
        }
    }
}

/// Failure of the seek loop itself.
///
/// Deliberately not folded into [`SeekOutcome`]: a device fault is not a
/// third way for a seek to end, it is the loop dying. The caller must still
/// run the shutdown path so the actuators end up braked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekError {
    /// A sensor failed mid-loop.
    Device(DeviceError),
    /// The chassis rejected a command.
    Drive(DriveError),
}

impl fmt::Display for SeekError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeekError::Device(err) => write!(f, "sensor failure during seek: {}", err),
            SeekError::Drive(err) => write!(f, "drive failure during seek: {}", err),
        }
    }
}

impl std::error::Error for SeekError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SeekError::Device(err) => Some(err),
            SeekError::Drive(err) => Some(err),
        }
    }
}

impl From<DeviceError> for SeekError {
    fn from(err: DeviceError) -> Self {
        SeekError::Device(err)
    }
}

impl From<DriveError> for SeekError {
    fn from(err: DriveError) -> Self {
        SeekError::Drive(err)
    }
}

/// Classify a signed heading into a band, or `None` when the exclusive
/// policy leaves an exact boundary value uncovered.
pub fn classify_heading(heading: i32, config: &SeekConfig) -> Option<HeadingClass> {
    let magnitude = heading.abs();
    if config.inclusive_bounds {
        if magnitude <= config.on_target_max_deg {
            Some(HeadingClass::OnTarget)
        } else if magnitude <= config.correctable_max_deg {
            Some(HeadingClass::Correctable)
        } else {
            Some(HeadingClass::TooFarOff)
        }
    } else if magnitude < config.on_target_max_deg {
        Some(HeadingClass::OnTarget)
    } else if magnitude > config.on_target_max_deg && magnitude < config.correctable_max_deg {
        Some(HeadingClass::Correctable)
    } else if magnitude > config.correctable_max_deg {
        Some(HeadingClass::TooFarOff)
    } else {
        None
    }
}

/// The closed-loop beacon-seeking controller.
///
/// Borrows the chassis for the duration of the run; owns handles to the
/// abort switch and the beacon sensor.
#[derive(Debug)]
pub struct BeaconSeeker<'c, A: Actuator, T: TouchSensor, B: BeaconSensor> {
    chassis: &'c mut Chassis<A>,
    touch: T,
    beacon: B,
    cancel: CancelToken,
    config: SeekConfig,
}

impl<'c, A: Actuator, T: TouchSensor, B: BeaconSensor> BeaconSeeker<'c, A, T, B> {
    /// Build a seeker over the chassis, abort switch, and beacon sensor.
    pub fn new(
        chassis: &'c mut Chassis<A>,
        touch: T,
        beacon: B,
        cancel: CancelToken,
        config: SeekConfig,
    ) -> Self {
        BeaconSeeker {
            chassis,
            touch,
            beacon,
            cancel,
            config,
        }
    }

    /// Run the control loop to a terminal outcome.
    ///
    /// Each tick, in priority order: abort check (touch switch or cancelled
    /// token, stopping the chassis and returning `Aborted`), beacon poll,
    /// then the band logic of the tick. Cancellation latency is bounded by
    /// one tick interval.
    ///
    /// On `Found` the loop issues no stop of its own; the last drive command
    /// stays in force and the caller stops the chassis on the transition.
    ///
    /// # Errors
    ///
    /// Any sensor or chassis failure ends the loop with a [`SeekError`];
    /// the caller is responsible for running the shutdown path afterwards.
    pub fn run(&mut self) -> Result<SeekOutcome, SeekError> {
        info!(config = ?self.config, "seeking beacon");
        let sleeper = SpinSleeper::new(10_000);
        let tick = Duration::from_millis(self.config.tick_ms);

        loop {
            if self.touch.is_pressed()? || self.cancel.is_cancelled() {
                self.chassis.stop()?;
                info!("seek aborted by operator");
                return Ok(SeekOutcome::Aborted);
            }

            let reading = self.beacon.reading()?;
            match reading.distance {
                None => {
                    // Beacon not visible: sit idle, keep polling.
                    trace!("beacon not visible");
                    self.chassis.stop()?;
                }
                Some(distance) => match classify_heading(reading.heading, &self.config) {
                    Some(HeadingClass::OnTarget) => {
                        if distance == 0 {
                            info!("beacon found");
                            return Ok(SeekOutcome::Found);
                        }
                        trace!(heading = reading.heading, distance, "driving at beacon");
                        let speed = self.config.forward_speed_dps;
                        self.chassis.forward(speed, speed)?;
                    }
                    Some(HeadingClass::Correctable) => {
                        trace!(heading = reading.heading, "pivoting toward beacon");
                        if reading.heading < 0 {
                            self.chassis.spin_left(self.config.turn_speed_dps)?;
                        } else {
                            self.chassis.spin_right(self.config.turn_speed_dps)?;
                        }
                    }
                    Some(HeadingClass::TooFarOff) => {
                        trace!(heading = reading.heading, "beacon too far off axis");
                        self.chassis.stop()?;
                    }
                    None => {
                        // Exclusive-bounds gap: no branch fires, the chassis
                        // keeps whatever it was last commanded.
                        debug!(heading = reading.heading, "heading on band edge, holding");
                    }
                },
            }

            sleeper.sleep(tick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetchbot_drive::DriveConfig;
    use fetchbot_hal::{ActuatorCommand, ActuatorMode, BeaconReading};
    use fetchbot_hal::sim::{SimActuator, SimBeaconSensor, SimTouchSensor};

    fn test_config() -> SeekConfig {
        SeekConfig {
            tick_ms: 0,
            ..SeekConfig::default()
        }
    }

    fn test_chassis() -> (Chassis<SimActuator>, SimActuator, SimActuator) {
        let left = SimActuator::new();
        let right = SimActuator::new();
        let config = DriveConfig {
            poll_interval_ms: 0,
            ..DriveConfig::default()
        };
        (Chassis::new(left.clone(), right.clone(), config), left, right)
    }

    fn run_seek(
        chassis: &mut Chassis<SimActuator>,
        touch: SimTouchSensor,
        beacon: SimBeaconSensor,
        config: SeekConfig,
    ) -> SeekOutcome {
        let mut seeker = BeaconSeeker::new(chassis, touch, beacon, CancelToken::new(), config);
        seeker.run().unwrap()
    }

    #[test]
    fn found_at_zero_distance_with_no_further_commands() {
        let (mut chassis, left, right) = test_chassis();
        let beacon = SimBeaconSensor::new();
        beacon.push_script([BeaconReading::new(0, 0)]);

        let outcome = run_seek(&mut chassis, SimTouchSensor::new(), beacon, test_config());

        assert_eq!(outcome, SeekOutcome::Found);
        assert!(left.history().is_empty());
        assert!(right.history().is_empty());
    }

    #[test]
    fn found_after_approach_leaves_last_drive_command_in_force() {
        let (mut chassis, left, _) = test_chassis();
        let beacon = SimBeaconSensor::new();
        beacon.push_script([BeaconReading::new(0, 3), BeaconReading::new(0, 0)]);

        let outcome = run_seek(&mut chassis, SimTouchSensor::new(), beacon, test_config());

        assert_eq!(outcome, SeekOutcome::Found);
        // No stop in the found branch: the forward command is still the last
        // thing the actuators saw.
        assert_eq!(
            left.history().last(),
            Some(&ActuatorCommand::RunForever { speed: 300 })
        );
        assert_eq!(left.mode(), ActuatorMode::RunningForever);
    }

    #[test]
    fn too_far_off_heading_stops_and_keeps_polling() {
        let (mut chassis, left, _) = test_chassis();
        let beacon = SimBeaconSensor::new();
        beacon.push_script([BeaconReading::new(15, 5)]);
        let touch = SimTouchSensor::new();
        touch.push_script([false, false, true]);

        let outcome = run_seek(&mut chassis, touch, beacon.clone(), test_config());

        assert_eq!(outcome, SeekOutcome::Aborted);
        // Two too-far ticks plus the abort: stops only, never a drive.
        assert_eq!(
            left.history(),
            vec![
                ActuatorCommand::Stop { brake: true },
                ActuatorCommand::Stop { brake: true },
                ActuatorCommand::Stop { brake: true },
            ]
        );
        assert_eq!(beacon.polls(), 2);
    }

    #[test]
    fn correctable_negative_heading_pivots_left() {
        let (mut chassis, left, right) = test_chassis();
        let beacon = SimBeaconSensor::new();
        beacon.push_script([BeaconReading::new(-5, 3)]);
        let touch = SimTouchSensor::new();
        touch.push_script([false, true]);

        let outcome = run_seek(&mut chassis, touch, beacon, test_config());

        assert_eq!(outcome, SeekOutcome::Aborted);
        assert_eq!(
            left.history().first(),
            Some(&ActuatorCommand::RunForever { speed: -100 })
        );
        assert_eq!(
            right.history().first(),
            Some(&ActuatorCommand::RunForever { speed: 100 })
        );
    }

    #[test]
    fn correctable_positive_heading_pivots_right() {
        let (mut chassis, left, _) = test_chassis();
        let beacon = SimBeaconSensor::new();
        beacon.push_script([BeaconReading::new(7, 3)]);
        let touch = SimTouchSensor::new();
        touch.push_script([false, true]);

        run_seek(&mut chassis, touch, beacon, test_config());

        assert_eq!(
            left.history().first(),
            Some(&ActuatorCommand::RunForever { speed: 100 })
        );
    }

    #[test]
    fn abort_before_any_beacon_reading() {
        let (mut chassis, left, right) = test_chassis();
        let beacon = SimBeaconSensor::new();
        let touch = SimTouchSensor::new();
        touch.set_pressed(true);

        let outcome = run_seek(&mut chassis, touch, beacon.clone(), test_config());

        assert_eq!(outcome, SeekOutcome::Aborted);
        assert_eq!(beacon.polls(), 0);
        // The chassis was stopped, and nothing else was ever commanded.
        assert_eq!(left.history(), vec![ActuatorCommand::Stop { brake: true }]);
        assert_eq!(right.history(), vec![ActuatorCommand::Stop { brake: true }]);
    }

    #[test]
    fn not_visible_stops_every_tick_until_abort() {
        let (mut chassis, left, _) = test_chassis();
        let beacon = SimBeaconSensor::new(); // never sees a beacon
        let touch = SimTouchSensor::new();
        touch.push_script([false, false, false, true]);

        let outcome = run_seek(&mut chassis, touch, beacon.clone(), test_config());

        assert_eq!(outcome, SeekOutcome::Aborted);
        assert_eq!(beacon.polls(), 3);
        // One stop per not-visible tick, one more on abort.
        assert_eq!(left.history().len(), 4);
        assert!(
            left.history()
                .iter()
                .all(|c| *c == ActuatorCommand::Stop { brake: true })
        );
    }

    #[test]
    fn cancel_token_aborts_the_loop() {
        let (mut chassis, left, _) = test_chassis();
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut seeker = BeaconSeeker::new(
            &mut chassis,
            SimTouchSensor::new(),
            SimBeaconSensor::new(),
            cancel,
            test_config(),
        );

        assert_eq!(seeker.run().unwrap(), SeekOutcome::Aborted);
        assert_eq!(left.mode(), ActuatorMode::Braked);
    }

    #[test]
    fn inclusive_bounds_close_the_bands() {
        let config = test_config();
        assert_eq!(classify_heading(0, &config), Some(HeadingClass::OnTarget));
        assert_eq!(classify_heading(2, &config), Some(HeadingClass::OnTarget));
        assert_eq!(classify_heading(-2, &config), Some(HeadingClass::OnTarget));
        assert_eq!(classify_heading(3, &config), Some(HeadingClass::Correctable));
        assert_eq!(classify_heading(10, &config), Some(HeadingClass::Correctable));
        assert_eq!(classify_heading(-10, &config), Some(HeadingClass::Correctable));
        assert_eq!(classify_heading(11, &config), Some(HeadingClass::TooFarOff));
    }

    #[test]
    fn exclusive_bounds_leave_a_classification_gap() {
        let config = SeekConfig {
            inclusive_bounds: false,
            ..test_config()
        };
        assert_eq!(classify_heading(1, &config), Some(HeadingClass::OnTarget));
        assert_eq!(classify_heading(5, &config), Some(HeadingClass::Correctable));
        assert_eq!(classify_heading(15, &config), Some(HeadingClass::TooFarOff));
        // Exact boundary values fall through every branch.
        assert_eq!(classify_heading(2, &config), None);
        assert_eq!(classify_heading(-2, &config), None);
        assert_eq!(classify_heading(10, &config), None);
        assert_eq!(classify_heading(-10, &config), None);
    }

    #[test]
    fn boundary_gap_keeps_the_previous_command() {
        let (mut chassis, left, _) = test_chassis();
        let beacon = SimBeaconSensor::new();
        beacon.push_script([BeaconReading::new(-5, 3), BeaconReading::new(2, 3)]);
        let touch = SimTouchSensor::new();
        touch.push_script([false, false, true]);
        let config = SeekConfig {
            inclusive_bounds: false,
            ..test_config()
        };

        let outcome = run_seek(&mut chassis, touch, beacon, config);

        assert_eq!(outcome, SeekOutcome::Aborted);
        // Tick 1 pivoted; tick 2 hit the gap and issued nothing new; the
        // abort then stopped the chassis.
        assert_eq!(
            left.history(),
            vec![
                ActuatorCommand::RunForever { speed: -100 },
                ActuatorCommand::Stop { brake: true },
            ]
        );
    }
}
