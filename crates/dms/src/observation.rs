//! Per-frame observations

use serde::{Deserialize, Serialize};

/// Head orientation in degrees, 0° on every axis when facing the road
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadAngles {
    /// Yaw (left-right rotation) in degrees
    pub yaw: f64,
    /// Pitch (up-down tilt) in degrees
    pub pitch: f64,
    /// Roll (side tilt) in degrees
    pub roll: f64,
}

impl HeadAngles {
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }

    pub fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite() && self.roll.is_finite()
    }
}

/// Geometric measurements extracted from one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameObservation {
    /// Capture timestamp (seconds, monotonic)
    pub timestamp: f64,
    /// Mean eye aspect ratio over both eyes
    #[serde(default)]
    pub ear: Option<f64>,
    /// Raw (unsmoothed) lip aspect ratio
    #[serde(default)]
    pub lar: Option<f64>,
    /// Head orientation
    #[serde(default)]
    pub head_angles: Option<HeadAngles>,
    /// Whether the landmark source found a face
    pub face_present: bool,
}

impl FrameObservation {
    /// Observation for a frame without a face
    pub fn absent(timestamp: f64) -> Self {
        Self {
            timestamp,
            ear: None,
            lar: None,
            head_angles: None,
            face_present: false,
        }
    }

    /// Whether the eye trackers can consume this observation
    pub fn is_usable(&self) -> bool {
        self.face_present && self.ear.is_some()
    }
}

/// How a frame was handled by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    /// Samples entered the trackers
    #[default]
    Accepted,
    /// No face visible
    NoFace,
    /// Face visible but the eye ratio could not be computed; eye trackers skipped
    Degenerate,
    /// Timestamp not after the previous accepted frame; frame skipped
    OutOfOrder,
}

impl FrameStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FrameStatus::Accepted)
    }
}
