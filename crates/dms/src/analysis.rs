//! Per-tick metrics snapshot and analysis result

use crate::observation::{FrameObservation, FrameStatus, HeadAngles};
use crate::scoring::ScoreBreakdown;
use crate::state::{DecidedBy, DriverState, YawnRisk};
use serde::{Deserialize, Serialize};

/// Fused metrics at one tick
///
/// Built fresh every tick and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: f64,
    pub face_present: bool,
    pub frame_status: FrameStatus,

    /// Eye aspect ratio of this frame
    pub ear: Option<f64>,
    /// Smoothed lip aspect ratio
    pub lar: Option<f64>,

    /// Percentage of eye closure (0-100)
    pub perclos: f64,
    /// PERCLOS has spanned its minimum history
    pub perclos_warmed_up: bool,

    /// Blinks per minute
    pub blink_rate: f64,
    /// Mean blink duration (seconds)
    pub avg_blink_duration: f64,
    /// Ongoing eye closure (seconds)
    pub closure_duration: f64,
    /// Microsleeps in the window
    pub microsleep_count: usize,
    /// Microsleeps this session
    pub total_microsleeps: u64,

    pub yawn_count: usize,
    /// Yawns per minute
    pub yawn_frequency: f64,
    pub yawn_risk: YawnRisk,
    /// Ongoing mouth-open episode (seconds)
    pub yawn_duration: f64,
    pub yawning: bool,

    /// Smoothed head angles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<HeadAngles>,
    /// `None` when no head pose is available
    pub looking_at_road: Option<bool>,
    /// Looking away for longer than the debounce period
    pub inattentive: bool,
}

impl MetricsSnapshot {
    /// Zeroed snapshot for a tick that did not reach the trackers
    pub fn absent(timestamp: f64, frame_status: FrameStatus) -> Self {
        Self {
            timestamp,
            face_present: false,
            frame_status,
            ..Default::default()
        }
    }
}

/// Complete DMS analysis result for one tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmsAnalysis {
    pub observation: FrameObservation,
    pub snapshot: MetricsSnapshot,
    /// Drowsiness score (0-100)
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub state: DriverState,
    /// Rule that produced `state`
    pub decided_by: DecidedBy,
}

impl DmsAnalysis {
    /// Whether every tracker consumed the tick
    pub fn is_accepted(&self) -> bool {
        self.snapshot.frame_status.is_accepted()
    }
}
