use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use fetchbot_control::{ArmState, SeekOutcome};

/// Shared robot status, readable from any control path.
#[derive(Debug, Clone)]
pub struct Status {
    pub arm: ArmState,
    pub last_seek: Option<SeekOutcome>,
    pub last_cmd_ts: Instant,
    pub faults: Vec<String>,
}

impl Default for Status {
    fn default() -> Self {
        Status {
            arm: ArmState::Uncalibrated,
            last_seek: None,
            last_cmd_ts: Instant::now(),
            faults: Vec::new(),
        }
    }
}

pub type Blackboard = Arc<RwLock<Status>>;

pub fn snapshot(bb: &Blackboard) -> Status {
    (*bb.read()).clone()
}

pub fn touch_cmd(bb: &Blackboard) {
    bb.write().last_cmd_ts = Instant::now();
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

pub fn record_arm_state(bb: &Blackboard, state: ArmState) {
    bb.write().arm = state;
}

pub fn record_seek_outcome(bb: &Blackboard, outcome: SeekOutcome) {
    bb.write().last_seek = Some(outcome);
}
