//! Metrics counters and gauges for the tick loop

use crate::pipeline::TickRecord;
use dms::DriverState;
use metrics::{counter, gauge};

pub const TICKS_TOTAL: &str = "dms_ticks_total";
pub const NO_FACE_TICKS_TOTAL: &str = "dms_no_face_ticks_total";
pub const ALERT_TRANSITIONS_TOTAL: &str = "dms_alert_transitions_total";
pub const DROWSINESS_SCORE: &str = "dms_drowsiness_score";

/// Record one tick with the installed metrics recorder, if any
pub fn record_tick(record: &TickRecord) {
    counter!(TICKS_TOTAL).increment(1);
    if record.state == DriverState::NoFace {
        counter!(NO_FACE_TICKS_TOTAL).increment(1);
    }
    if let Some(transition) = &record.transition {
        counter!(ALERT_TRANSITIONS_TOTAL, "to" => transition.to.as_str()).increment(1);
    }
    gauge!(DROWSINESS_SCORE).set(record.score);
}
