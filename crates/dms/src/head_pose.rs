//! Head pose decomposition and road-attention estimation

use crate::landmarks::RotationMatrix;
use crate::observation::HeadAngles;
use serde::{Deserialize, Serialize};
use signal_filter::{MovingAverage, SustainedCondition};
use tracing::debug;

/// Below this the rotation is treated as gimbal-locked
const SINGULAR_EPSILON: f64 = 1e-6;

/// Wrap an angle in degrees into `[-180, 180)`
pub fn wrap_degrees(angle: f64) -> f64 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Fold a pitch angle into `[-90, 90]`
///
/// Sources whose camera frame is flipped about the x axis report a face
/// looking straight at the camera as ±180° pitch; folding maps that to 0°.
pub fn fold_pitch(pitch: f64) -> f64 {
    let pitch = wrap_degrees(pitch);
    if pitch > 90.0 {
        pitch - 180.0
    } else if pitch < -90.0 {
        pitch + 180.0
    } else {
        pitch
    }
}

/// Decompose a rotation matrix `R = Rz(roll)·Ry(yaw)·Rx(pitch)` into degrees
///
/// The identity matrix (face looking into the camera) maps to 0° on every
/// axis. Each angle is wrapped into `[-180, 180)`.
pub fn rotation_to_euler(r: &RotationMatrix) -> HeadAngles {
    let sy = (r[0][0] * r[0][0] + r[1][0] * r[1][0]).sqrt();

    let (pitch, yaw, roll) = if sy >= SINGULAR_EPSILON {
        (
            r[2][1].atan2(r[2][2]),
            (-r[2][0]).atan2(sy),
            r[1][0].atan2(r[0][0]),
        )
    } else {
        ((-r[1][2]).atan2(r[1][1]), (-r[2][0]).atan2(sy), 0.0)
    };

    HeadAngles {
        yaw: wrap_degrees(yaw.to_degrees()),
        pitch: wrap_degrees(pitch.to_degrees()),
        roll: wrap_degrees(roll.to_degrees()),
    }
}

/// Result of one head-attention update
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttentionStatus {
    /// Smoothed head angles (pitch folded)
    pub angles: Option<HeadAngles>,
    /// Whether the head currently points at the road, `None` without a pose
    pub looking_at_road: Option<bool>,
    /// Not looking at the road for longer than the debounce period
    pub inattentive: bool,
}

/// Smooths head angles and debounces looking-away episodes
#[derive(Debug, Clone)]
pub struct HeadAttention {
    yaw: MovingAverage,
    pitch: MovingAverage,
    roll: MovingAverage,
    yaw_limit: f64,
    pitch_limit: f64,
    away: SustainedCondition,
    last: AttentionStatus,
}

impl HeadAttention {
    pub fn new(yaw_limit: f64, pitch_limit: f64, smoothing_frames: usize, debounce_seconds: f64) -> Self {
        Self {
            yaw: MovingAverage::new(smoothing_frames),
            pitch: MovingAverage::new(smoothing_frames),
            roll: MovingAverage::new(smoothing_frames),
            yaw_limit,
            pitch_limit,
            away: SustainedCondition::new(debounce_seconds),
            last: AttentionStatus::default(),
        }
    }

    /// Whether the given (smoothed) angles point at the road
    pub fn is_looking_at_road(&self, angles: &HeadAngles) -> bool {
        angles.yaw.abs() <= self.yaw_limit && fold_pitch(angles.pitch).abs() <= self.pitch_limit
    }

    /// Feed the head pose for one frame
    ///
    /// A missing pose leaves the looking-away timer untouched.
    pub fn update(&mut self, timestamp: f64, angles: Option<HeadAngles>) -> AttentionStatus {
        let Some(raw) = angles.filter(HeadAngles::is_finite) else {
            self.last = AttentionStatus {
                angles: None,
                looking_at_road: None,
                inattentive: self.away.is_sustained(timestamp),
            };
            return self.last;
        };

        let smoothed = match (
            self.yaw.update(raw.yaw),
            self.pitch.update(fold_pitch(raw.pitch)),
            self.roll.update(raw.roll),
        ) {
            (Some(yaw), Some(pitch), Some(roll)) => HeadAngles { yaw, pitch, roll },
            _ => raw,
        };

        let looking = self.is_looking_at_road(&smoothed);
        let inattentive = self.away.update(!looking, timestamp);
        if inattentive && !self.last.inattentive {
            debug!(
                yaw = smoothed.yaw,
                pitch = smoothed.pitch,
                away_for = self.away.held_for(timestamp),
                "Driver looking away from road"
            );
        }

        self.last = AttentionStatus {
            angles: Some(smoothed),
            looking_at_road: Some(looking),
            inattentive,
        };
        self.last
    }

    pub fn reset(&mut self) {
        self.yaw.reset();
        self.pitch.reset();
        self.roll.reset();
        self.away.reset();
        self.last = AttentionStatus::default();
    }
}
