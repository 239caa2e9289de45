use tracing::{debug, info, warn};

use fetchbot_control::{Arm, BeaconSeeker, CancelToken, SeekError, SeekOutcome};
use fetchbot_drive::Chassis;
use fetchbot_hal::sim::{SimActuator, SimBeaconSensor, SimNotifier, SimTouchSensor};
use fetchbot_hal::{LightColor, Notifier, Side};

use crate::blackboard::{self, Blackboard};
use crate::command::Command;
use crate::config::RobotConfig;

/// The assembled robot: chassis, arm, sensors, and the notification sink,
/// with every externally invocable command mapped onto them.
///
/// Device handles are the simulated backends; on real hardware the same
/// controllers run over the hardware implementations of the hal traits.
pub struct Robot {
    chassis: Chassis<SimActuator>,
    arm: Arm<SimActuator, SimTouchSensor, SimNotifier>,
    touch: SimTouchSensor,
    beacon: SimBeaconSensor,
    notifier: SimNotifier,
    left: SimActuator,
    right: SimActuator,
    cancel: CancelToken,
    config: RobotConfig,
    bb: Blackboard,
}

impl Robot {
    pub fn new(config: RobotConfig, bb: Blackboard, cancel: CancelToken) -> Self {
        let left = SimActuator::new();
        let right = SimActuator::new();
        let arm_motor = SimActuator::new();
        let touch = SimTouchSensor::new();
        let beacon = SimBeaconSensor::new();
        let notifier = SimNotifier::new();

        let chassis = Chassis::new(left.clone(), right.clone(), config.drive);
        let arm = Arm::new(arm_motor, touch.clone(), notifier.clone(), config.arm);

        Robot {
            chassis,
            arm,
            touch,
            beacon,
            notifier,
            left,
            right,
            cancel,
            config,
            bb,
        }
    }

    /// Handle to the shared touch switch (operator abort / arm limit).
    pub fn touch(&self) -> SimTouchSensor {
        self.touch.clone()
    }

    /// Handle to the beacon sensor.
    pub fn beacon(&self) -> SimBeaconSensor {
        self.beacon.clone()
    }

    /// Handle to the notification sink.
    pub fn notifier(&self) -> SimNotifier {
        self.notifier.clone()
    }

    /// Handles to the drive actuators.
    pub fn drive_motors(&self) -> (SimActuator, SimActuator) {
        (self.left.clone(), self.right.clone())
    }

    /// Execute one command.
    ///
    /// Invalid arguments and commands issued in the wrong state are benign:
    /// they are logged, recorded as faults, and never propagate (only the
    /// hardware interface failing is allowed to take the process down, and
    /// that path still runs [`Robot::shutdown`]).
    pub fn dispatch(&mut self, cmd: Command) {
        blackboard::touch_cmd(&self.bb);
        debug!(?cmd, "dispatching command");

        let result: Result<(), String> = match cmd {
            Command::DriveInches { inches, speed } => self
                .chassis
                .drive_inches(inches, speed)
                .map_err(|e| e.to_string()),
            Command::TurnDegrees { degrees, speed } => self
                .chassis
                .turn_degrees(degrees, speed)
                .map_err(|e| e.to_string()),
            Command::DrivePolygon {
                sides,
                speed,
                edge_inches,
            } => self
                .chassis
                .drive_polygon(sides, speed, edge_inches)
                .map_err(|e| e.to_string()),
            Command::Forward {
                left_speed,
                right_speed,
            } => self
                .chassis
                .forward(left_speed, right_speed)
                .map_err(|e| e.to_string()),
            Command::Back {
                left_speed,
                right_speed,
            } => self
                .chassis
                .back(left_speed, right_speed)
                .map_err(|e| e.to_string()),
            Command::SpinLeft { speed } => {
                self.chassis.spin_left(speed).map_err(|e| e.to_string())
            }
            Command::SpinRight { speed } => {
                self.chassis.spin_right(speed).map_err(|e| e.to_string())
            }
            Command::Stop => self.chassis.stop().map_err(|e| e.to_string()),
            Command::Calibrate => {
                let result = self.arm.calibrate().map_err(|e| e.to_string());
                blackboard::record_arm_state(&self.bb, self.arm.state());
                result
            }
            Command::ArmUp => {
                let result = self.arm.up().map_err(|e| e.to_string());
                blackboard::record_arm_state(&self.bb, self.arm.state());
                result
            }
            Command::ArmDown => {
                let result = self.arm.down().map_err(|e| e.to_string());
                blackboard::record_arm_state(&self.bb, self.arm.state());
                result
            }
            Command::SeekBeacon => self.seek().map(|_| ()).map_err(|e| e.to_string()),
            Command::Speak { text } => {
                self.notifier.speak(&text);
                Ok(())
            }
            Command::SetLight { side, color } => {
                self.notifier.set_light(side, color);
                Ok(())
            }
            Command::Shutdown => {
                self.shutdown();
                Ok(())
            }
        };

        if let Err(msg) = result {
            warn!(%msg, "command rejected");
            blackboard::raise_fault(&self.bb, &msg);
        }
    }

    /// Run the beacon seeker to a terminal outcome.
    ///
    /// The seek loop leaves the last drive command in force when it returns
    /// `Found`; the chassis is stopped here, on the transition.
    fn seek(&mut self) -> Result<SeekOutcome, SeekError> {
        let mut seeker = BeaconSeeker::new(
            &mut self.chassis,
            self.touch.clone(),
            self.beacon.clone(),
            self.cancel.clone(),
            self.config.seek,
        );
        let outcome = seeker.run()?;
        // Record first: the outcome is a fact even if the stop below fails.
        blackboard::record_seek_outcome(&self.bb, outcome);
        if outcome == SeekOutcome::Found {
            self.chassis.stop()?;
        }
        info!(?outcome, "seek finished");
        Ok(outcome)
    }

    /// Stop everything and signal process termination.
    ///
    /// Brakes both drive actuators, sets both status lights to the safe
    /// color, says goodbye, and cancels the run token that every blocking
    /// loop polls. Idempotent, and callable from any control path.
    pub fn shutdown(&mut self) {
        info!("shutting down");
        if let Err(err) = self.chassis.stop() {
            warn!(error = %err, "failed to brake drive motors");
            blackboard::raise_fault(&self.bb, &err.to_string());
        }
        self.notifier.set_light(Side::Left, LightColor::Green);
        self.notifier.set_light(Side::Right, LightColor::Green);
        self.notifier.speak("Goodbye");
        self.cancel.cancel();
    }
}
