//! Simulated devices.
//!
//! Each device is a cheap-clone handle over shared interior state, so one
//! physical device can be held by several controllers at once. The arm
//! controller and the beacon seeker both read the single touch switch, which
//! is exactly how the hardware is wired.
//!
//! Position effects apply immediately at command time; [`SimActuator::set_latency`]
//! makes subsequent motions report "still running" for a number of polls so
//! that blocking waits are actually exercised.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    Actuator, ActuatorCommand, ActuatorMode, BeaconReading, BeaconSensor, Color, ColorSensor,
    DeviceError, LightColor, Notifier, Side, TouchSensor,
};

/// Simulated rotary actuator.
#[derive(Debug, Clone, Default)]
pub struct SimActuator {
    inner: Arc<Mutex<ActuatorInner>>,
}

#[derive(Debug, Default)]
struct ActuatorInner {
    mode: ActuatorMode,
    position: i32,
    speed: i32,
    latency_polls: u32,
    busy_polls: u32,
    hold_busy: bool,
    fail_stop: Option<&'static str>,
    history: Vec<ActuatorCommand>,
}

impl SimActuator {
    /// A fresh actuator at position 0, idle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make each subsequent position motion report running for `polls`
    /// `is_running` calls before completing.
    pub fn set_latency(&self, polls: u32) {
        self.inner.lock().latency_polls = polls;
    }

    /// Pin the actuator in the running state until the next stop command.
    /// Used to exercise wait timeouts.
    pub fn hold_busy(&self) {
        self.inner.lock().hold_busy = true;
    }

    /// Make every subsequent stop command fail with
    /// [`DeviceError::NotResponding`]. Used to exercise device-fault paths.
    pub fn fail_stops(&self, reason: &'static str) {
        self.inner.lock().fail_stop = Some(reason);
    }

    /// The mode the actuator was last commanded into.
    pub fn mode(&self) -> ActuatorMode {
        self.inner.lock().mode
    }

    /// The last commanded speed.
    pub fn speed(&self) -> i32 {
        self.inner.lock().speed
    }

    /// Every command accepted so far, oldest first.
    pub fn history(&self) -> Vec<ActuatorCommand> {
        self.inner.lock().history.clone()
    }

    /// Forget the recorded history. State (mode, position) is kept.
    pub fn clear_history(&self) {
        self.inner.lock().history.clear();
    }
}

impl Actuator for SimActuator {
    fn run_to_relative(&mut self, speed: i32, target_deg: i32) -> Result<(), DeviceError> {
        let mut inner = self.inner.lock();
        inner.history.push(ActuatorCommand::RunToRelative {
            speed,
            target: target_deg,
        });
        inner.mode = ActuatorMode::RunningToRelative;
        inner.speed = speed;
        inner.position += target_deg;
        inner.busy_polls = inner.latency_polls;
        Ok(())
    }

    fn run_to_absolute(&mut self, speed: i32, target_deg: i32) -> Result<(), DeviceError> {
        let mut inner = self.inner.lock();
        inner.history.push(ActuatorCommand::RunToAbsolute {
            speed,
            target: target_deg,
        });
        inner.mode = ActuatorMode::RunningToAbsolute;
        inner.speed = speed;
        inner.position = target_deg;
        inner.busy_polls = inner.latency_polls;
        Ok(())
    }

    fn run_forever(&mut self, speed: i32) -> Result<(), DeviceError> {
        let mut inner = self.inner.lock();
        inner.history.push(ActuatorCommand::RunForever { speed });
        inner.mode = ActuatorMode::RunningForever;
        inner.speed = speed;
        Ok(())
    }

    fn stop(&mut self, brake: bool) -> Result<(), DeviceError> {
        let mut inner = self.inner.lock();
        if let Some(reason) = inner.fail_stop {
            return Err(DeviceError::NotResponding(reason));
        }
        inner.history.push(ActuatorCommand::Stop { brake });
        inner.mode = if brake {
            ActuatorMode::Braked
        } else {
            ActuatorMode::Idle
        };
        inner.speed = 0;
        inner.busy_polls = 0;
        inner.hold_busy = false;
        Ok(())
    }

    fn is_running(&mut self) -> Result<bool, DeviceError> {
        let mut inner = self.inner.lock();
        if inner.hold_busy {
            return Ok(true);
        }
        match inner.mode {
            ActuatorMode::RunningForever => Ok(true),
            ActuatorMode::RunningToRelative | ActuatorMode::RunningToAbsolute => {
                if inner.busy_polls > 0 {
                    inner.busy_polls -= 1;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            ActuatorMode::Idle | ActuatorMode::Braked => Ok(false),
        }
    }

    fn set_position(&mut self, degrees: i32) -> Result<(), DeviceError> {
        let mut inner = self.inner.lock();
        inner.history.push(ActuatorCommand::SetPosition { value: degrees });
        inner.position = degrees;
        Ok(())
    }

    fn position(&mut self) -> Result<i32, DeviceError> {
        Ok(self.inner.lock().position)
    }
}

/// Simulated touch switch.
///
/// Polls consume a script of levels first (one entry per poll); once the
/// script is exhausted the switch rests at the level set with
/// [`SimTouchSensor::set_pressed`] (released by default).
#[derive(Debug, Clone, Default)]
pub struct SimTouchSensor {
    inner: Arc<Mutex<TouchInner>>,
}

#[derive(Debug, Default)]
struct TouchInner {
    level: bool,
    script: VecDeque<bool>,
}

impl SimTouchSensor {
    /// A released switch with no script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resting level of the switch.
    pub fn set_pressed(&self, pressed: bool) {
        self.inner.lock().level = pressed;
    }

    /// Queue levels to be returned by the next polls, one per poll.
    pub fn push_script(&self, levels: impl IntoIterator<Item = bool>) {
        self.inner.lock().script.extend(levels);
    }
}

impl TouchSensor for SimTouchSensor {
    fn is_pressed(&mut self) -> Result<bool, DeviceError> {
        let mut inner = self.inner.lock();
        Ok(inner.script.pop_front().unwrap_or(inner.level))
    }
}

/// Simulated beacon sensor with scripted readings.
///
/// Each poll consumes one scripted reading; the last reading sticks once the
/// script runs out. Starts out not seeing any beacon.
#[derive(Debug, Clone)]
pub struct SimBeaconSensor {
    inner: Arc<Mutex<BeaconInner>>,
}

#[derive(Debug)]
struct BeaconInner {
    current: BeaconReading,
    script: VecDeque<BeaconReading>,
    polls: u32,
}

impl Default for SimBeaconSensor {
    fn default() -> Self {
        SimBeaconSensor {
            inner: Arc::new(Mutex::new(BeaconInner {
                current: BeaconReading::not_visible(),
                script: VecDeque::new(),
                polls: 0,
            })),
        }
    }
}

impl SimBeaconSensor {
    /// A sensor that does not see any beacon.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue readings to be returned by the next polls, one per poll.
    pub fn push_script(&self, readings: impl IntoIterator<Item = BeaconReading>) {
        self.inner.lock().script.extend(readings);
    }

    /// How many times the sensor has been polled.
    pub fn polls(&self) -> u32 {
        self.inner.lock().polls
    }
}

impl BeaconSensor for SimBeaconSensor {
    fn reading(&mut self) -> Result<BeaconReading, DeviceError> {
        let mut inner = self.inner.lock();
        inner.polls += 1;
        if let Some(next) = inner.script.pop_front() {
            inner.current = next;
        }
        Ok(inner.current)
    }
}

/// Simulated color sensor.
#[derive(Debug, Clone, Default)]
pub struct SimColorSensor {
    inner: Arc<Mutex<Color>>,
}

impl SimColorSensor {
    /// A sensor reading [`Color::Unknown`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the color the sensor currently sees.
    pub fn set_color(&self, color: Color) {
        *self.inner.lock() = color;
    }
}

impl ColorSensor for SimColorSensor {
    fn color(&mut self) -> Result<Color, DeviceError> {
        Ok(*self.inner.lock())
    }
}

/// Simulated notification sink that records everything for assertions.
#[derive(Debug, Clone, Default)]
pub struct SimNotifier {
    inner: Arc<Mutex<NotifierInner>>,
}

#[derive(Debug, Default)]
struct NotifierInner {
    utterances: Vec<String>,
    beeps: u32,
    left_light: LightColor,
    right_light: LightColor,
}

impl SimNotifier {
    /// A silent notifier with both lights off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything spoken so far, oldest first.
    pub fn utterances(&self) -> Vec<String> {
        self.inner.lock().utterances.clone()
    }

    /// Number of beeps emitted so far.
    pub fn beeps(&self) -> u32 {
        self.inner.lock().beeps
    }

    /// The current color of the light on `side`.
    pub fn light(&self, side: Side) -> LightColor {
        let inner = self.inner.lock();
        match side {
            Side::Left => inner.left_light,
            Side::Right => inner.right_light,
        }
    }
}

impl Notifier for SimNotifier {
    fn speak(&mut self, text: &str) {
        self.inner.lock().utterances.push(text.to_string());
    }

    fn beep(&mut self) {
        self.inner.lock().beeps += 1;
    }

    fn set_light(&mut self, side: Side, color: LightColor) {
        let mut inner = self.inner.lock();
        match side {
            Side::Left => inner.left_light = color,
            Side::Right => inner.right_light = color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actuator_records_commands_and_modes() {
        let mut motor = SimActuator::new();
        motor.run_to_relative(300, 1080).unwrap();
        assert_eq!(motor.mode(), ActuatorMode::RunningToRelative);
        assert_eq!(motor.position().unwrap(), 1080);

        motor.run_forever(-200).unwrap();
        assert_eq!(motor.mode(), ActuatorMode::RunningForever);
        assert!(motor.is_running().unwrap());

        motor.stop(true).unwrap();
        assert_eq!(motor.mode(), ActuatorMode::Braked);
        assert!(!motor.is_running().unwrap());

        assert_eq!(
            motor.history(),
            vec![
                ActuatorCommand::RunToRelative {
                    speed: 300,
                    target: 1080
                },
                ActuatorCommand::RunForever { speed: -200 },
                ActuatorCommand::Stop { brake: true },
            ]
        );
    }

    #[test]
    fn actuator_latency_counts_down_per_poll() {
        let mut motor = SimActuator::new();
        motor.set_latency(2);
        motor.run_to_relative(300, 90).unwrap();
        assert!(motor.is_running().unwrap());
        assert!(motor.is_running().unwrap());
        assert!(!motor.is_running().unwrap());
    }

    #[test]
    fn actuator_set_position_redefines_zero() {
        let mut motor = SimActuator::new();
        motor.run_to_relative(900, -5112).unwrap();
        assert_eq!(motor.position().unwrap(), -5112);
        motor.set_position(0).unwrap();
        assert_eq!(motor.position().unwrap(), 0);
    }

    #[test]
    fn failing_stop_reports_not_responding() {
        let mut motor = SimActuator::new();
        motor.run_forever(300).unwrap();
        motor.fail_stops("stalled");
        assert!(matches!(
            motor.stop(true),
            Err(DeviceError::NotResponding("stalled"))
        ));
        // The failed stop leaves the actuator running.
        assert_eq!(motor.mode(), ActuatorMode::RunningForever);
    }

    #[test]
    fn cloned_actuator_handles_share_state() {
        let mut motor = SimActuator::new();
        let observer = motor.clone();
        motor.run_forever(500).unwrap();
        assert_eq!(observer.mode(), ActuatorMode::RunningForever);
        assert_eq!(observer.speed(), 500);
    }

    #[test]
    fn touch_script_falls_back_to_resting_level() {
        let mut touch = SimTouchSensor::new();
        touch.push_script([false, true]);
        assert!(!touch.is_pressed().unwrap());
        assert!(touch.is_pressed().unwrap());
        // Script exhausted: back to the resting level.
        assert!(!touch.is_pressed().unwrap());

        touch.set_pressed(true);
        assert!(touch.is_pressed().unwrap());
    }

    #[test]
    fn beacon_last_scripted_reading_sticks() {
        let mut beacon = SimBeaconSensor::new();
        beacon.push_script([BeaconReading::new(5, 3)]);
        assert_eq!(beacon.reading().unwrap(), BeaconReading::new(5, 3));
        assert_eq!(beacon.reading().unwrap(), BeaconReading::new(5, 3));
        assert_eq!(beacon.polls(), 2);
    }

    #[test]
    fn notifier_records_lights_per_side() {
        let mut notifier = SimNotifier::new();
        notifier.set_light(Side::Left, LightColor::Green);
        notifier.set_light(Side::Right, LightColor::Red);
        notifier.speak("hello");
        notifier.beep();

        assert_eq!(notifier.light(Side::Left), LightColor::Green);
        assert_eq!(notifier.light(Side::Right), LightColor::Red);
        assert_eq!(notifier.utterances(), vec!["hello".to_string()]);
        assert_eq!(notifier.beeps(), 1);
    }
}
