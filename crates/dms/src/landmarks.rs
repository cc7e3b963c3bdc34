//! Landmark source input types

use serde::{Deserialize, Serialize};

/// 2-D landmark point in image coordinates (x, y)
pub type Point2 = (f64, f64);

/// 3x3 head rotation matrix (row-major), identity when facing the camera
pub type RotationMatrix = [[f64; 3]; 3];

/// Facial landmarks for one detected face
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Landmarks {
    /// Landmark points, indexed by the configured [`LandmarkLayout`]
    pub points: Vec<Point2>,
    /// Head rotation estimate, if the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_rotation: Option<RotationMatrix>,
}

/// One frame as delivered by the landmark source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceFrame {
    /// Capture timestamp (seconds, monotonic)
    pub timestamp: f64,
    /// Landmarks, `None` when no face is visible
    pub landmarks: Option<Landmarks>,
}

impl FaceFrame {
    /// Frame with a visible face
    pub fn with_face(timestamp: f64, landmarks: Landmarks) -> Self {
        Self {
            timestamp,
            landmarks: Some(landmarks),
        }
    }

    /// Frame without a face
    pub fn no_face(timestamp: f64) -> Self {
        Self {
            timestamp,
            landmarks: None,
        }
    }
}

/// Landmark indices used for the eye and mouth ratios
///
/// Eye points follow the canonical p1..p6 order: outer corner, two upper lid
/// points, inner corner, two lower lid points. Mouth points are upper lip,
/// lower lip, left corner, right corner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkLayout {
    pub left_eye: [usize; 6],
    pub right_eye: [usize; 6],
    pub mouth: [usize; 4],
}

impl Default for LandmarkLayout {
    /// MediaPipe Face Mesh (468 points)
    fn default() -> Self {
        Self {
            left_eye: [33, 160, 158, 133, 153, 144],
            right_eye: [362, 385, 387, 263, 373, 380],
            mouth: [13, 14, 61, 291],
        }
    }
}

impl LandmarkLayout {
    /// Compact layout for sources that emit only the 16 points used here
    ///
    /// Left eye 0-5, right eye 6-11, mouth 12-15.
    pub fn compact() -> Self {
        Self {
            left_eye: [0, 1, 2, 3, 4, 5],
            right_eye: [6, 7, 8, 9, 10, 11],
            mouth: [12, 13, 14, 15],
        }
    }

    /// Largest index referenced by the layout
    pub fn max_index(&self) -> usize {
        self.left_eye
            .iter()
            .chain(self.right_eye.iter())
            .chain(self.mouth.iter())
            .copied()
            .max()
            .unwrap_or(0)
    }
}
