mod blackboard; // brings `blackboard.rs` in as `crate::blackboard`
mod bus; // brings `bus.rs` in as `crate::bus`
mod command; // brings `command.rs` in as `crate::command`
mod config; // brings `config.rs` in as `crate::config`
mod robot; // brings `robot.rs` in as `crate::robot`

use std::sync::Arc;
use std::time::Duration;

use spin_sleep::SpinSleeper;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{self, EnvFilter};

use fetchbot_control::CancelToken;
use fetchbot_hal::BeaconReading;

use blackboard::{Blackboard, snapshot};
use bus::Topic;
use command::Command;
use robot::Robot;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("fetchbot starting");

    let config = config::load()?;
    let bb: Blackboard = Arc::default();
    let cancel = CancelToken::new();
    let commands: Topic<Command> = Topic::new(16);

    let robot = Robot::new(config, bb.clone(), cancel.clone());
    script_demo_devices(&robot);

    let mut rx = commands.subscribe();
    info!("spawning command thread...");
    let worker = std::thread::Builder::new().name("command".into()).spawn({
        let cancel = cancel.clone();
        let mut robot = robot;
        move || {
            info!("command thread started");
            let sleeper = SpinSleeper::new(10_000);
            loop {
                match rx.try_recv() {
                    Ok(cmd) => robot.dispatch((*cmd).clone()),
                    Err(TryRecvError::Empty) => {
                        if cancel.is_cancelled() {
                            break;
                        }
                        sleeper.sleep(Duration::from_millis(10));
                    }
                    Err(TryRecvError::Lagged(skipped)) => {
                        warn!(skipped, "command receiver lagged")
                    }
                    Err(TryRecvError::Closed) => break,
                }
            }
            // Leave the actuators braked however the loop ended.
            robot.shutdown();
            info!("command thread finished");
        }
    })?;

    for cmd in demo_mission() {
        commands.publish(cmd);
    }

    idle_until_cancelled(&bb, &cancel).await;
    info!("run flag cleared, stopping");

    worker
        .join()
        .map_err(|_| anyhow::anyhow!("command thread panicked"))?;

    let status = snapshot(&bb);
    if status.faults.is_empty() {
        info!("shutdown complete");
    } else {
        warn!(faults = ?status.faults, "shutdown complete with faults");
    }
    Ok(())
}

/// Blocking idle loop: do nothing until some control path requests
/// shutdown, observing the flag once per poll interval.
async fn idle_until_cancelled(bb: &Blackboard, cancel: &CancelToken) {
    let mut tick = tokio::time::interval(Duration::from_millis(100));
    let mut ticks: u32 = 0;
    loop {
        tick.tick().await;
        if cancel.is_cancelled() {
            break;
        }
        ticks += 1;
        if ticks % 50 == 0 {
            debug!(status = ?snapshot(bb), "idle");
        }
    }
}

/// Script the simulated devices so the demo mission runs to completion:
/// the limit switch trips during calibration and again while raising the
/// arm, and the beacon walks from off-axis to reached.
fn script_demo_devices(robot: &Robot) {
    let touch = robot.touch();
    touch.push_script([false, false, true]); // calibration hits the limit
    touch.push_script([false, true]); // arm-up hits the limit
    robot.beacon().push_script([
        BeaconReading::new(-6, 4),
        BeaconReading::new(0, 2),
        BeaconReading::new(0, 0),
    ]);
}

/// The scripted demo: calibrate, drive a few figures, work the arm, seek
/// the beacon, and shut down.
fn demo_mission() -> Vec<Command> {
    vec![
        Command::Calibrate,
        Command::DriveInches {
            inches: 12.0,
            speed: 300,
        },
        Command::TurnDegrees {
            degrees: 90.0,
            speed: 200,
        },
        Command::DrivePolygon {
            sides: 4,
            speed: 300,
            edge_inches: 6.0,
        },
        Command::ArmUp,
        Command::ArmDown,
        Command::SeekBeacon,
        Command::Speak {
            text: "Mission complete".to_string(),
        },
        Command::Shutdown,
    ]
}
