#![warn(missing_docs)]
#![doc = "Closed-loop behaviors for the fetchbot robot."]
#![doc = ""]
#![doc = "The arm calibration state machine, the beacon-seeking controller, and"]
#![doc = "the cooperative cancellation token both observe."]

pub mod arm;
pub mod cancel;
pub mod seek;

pub use arm::{Arm, ArmConfig, ArmError, ArmState};
pub use cancel::CancelToken;
pub use seek::{BeaconSeeker, HeadingClass, SeekConfig, SeekError, SeekOutcome};
