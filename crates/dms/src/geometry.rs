//! Eye and lip aspect ratios from landmark geometry

use crate::head_pose::rotation_to_euler;
use crate::landmarks::{FaceFrame, LandmarkLayout, Point2};
use crate::observation::FrameObservation;
use tracing::{debug, warn};

/// Distances below this are treated as degenerate
const MIN_DISTANCE: f64 = 1e-6;

fn distance(a: Point2, b: Point2) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

fn finite_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if !denominator.is_finite() || denominator < MIN_DISTANCE {
        return None;
    }
    let ratio = numerator / denominator;
    ratio.is_finite().then_some(ratio)
}

/// Eye aspect ratio for one eye: `(‖p2−p6‖ + ‖p3−p5‖) / (2‖p1−p4‖)`
pub fn eye_aspect_ratio(eye: &[Point2; 6]) -> Option<f64> {
    let vertical = distance(eye[1], eye[5]) + distance(eye[2], eye[4]);
    let horizontal = distance(eye[0], eye[3]);
    finite_ratio(vertical, 2.0 * horizontal)
}

/// Lip aspect ratio: lip opening over mouth width
pub fn lip_aspect_ratio(upper: Point2, lower: Point2, left: Point2, right: Point2) -> Option<f64> {
    finite_ratio(distance(upper, lower), distance(left, right))
}

/// Mean eye aspect ratio over both eyes, `None` if either eye is degenerate
pub fn average_eye_aspect_ratio(left: &[Point2; 6], right: &[Point2; 6]) -> Option<f64> {
    let left = eye_aspect_ratio(left)?;
    let right = eye_aspect_ratio(right)?;
    Some((left + right) / 2.0)
}

fn gather<const N: usize>(points: &[Point2], indices: &[usize; N]) -> Option<[Point2; N]> {
    let mut out = [(0.0, 0.0); N];
    for (slot, &idx) in out.iter_mut().zip(indices.iter()) {
        *slot = *points.get(idx)?;
    }
    Some(out)
}

/// Counts consecutive frames on which one measurement was unavailable
///
/// Warns on the first frame of a streak and stays at `debug` until the
/// measurement comes back, so a mismatched source cannot flood the log.
#[derive(Debug, Clone, Copy, Default)]
struct DegenerateStreak {
    frames: u64,
}

impl DegenerateStreak {
    fn observe(&mut self, available: bool, what: &'static str, timestamp: f64, points: usize) {
        if available {
            if self.frames > 0 {
                debug!(what, frames = self.frames, timestamp, "Measurement available again");
            }
            self.frames = 0;
            return;
        }
        self.frames += 1;
        if self.frames == 1 {
            warn!(what, timestamp, points, "Degenerate landmark geometry, measurement unavailable");
        } else {
            debug!(what, timestamp, frames = self.frames, "Measurement still unavailable");
        }
    }
}

/// Turns landmark frames into [`FrameObservation`]s
#[derive(Debug, Clone, Default)]
pub struct RatioExtractor {
    layout: LandmarkLayout,
    coverage: DegenerateStreak,
    eyes: DegenerateStreak,
    mouth: DegenerateStreak,
}

impl RatioExtractor {
    pub fn new(layout: LandmarkLayout) -> Self {
        Self {
            layout,
            ..Default::default()
        }
    }

    pub fn layout(&self) -> &LandmarkLayout {
        &self.layout
    }

    /// Extract ratios and head angles for one frame
    ///
    /// Missing landmarks produce `face_present = false`. Degenerate geometry
    /// or a point set too small for the layout produces absent ratios and a
    /// warning, never an error.
    pub fn extract(&mut self, frame: &FaceFrame) -> FrameObservation {
        let Some(landmarks) = &frame.landmarks else {
            return FrameObservation::absent(frame.timestamp);
        };
        let points = &landmarks.points;

        let head_angles = landmarks
            .head_rotation
            .as_ref()
            .map(rotation_to_euler)
            .filter(|angles| angles.is_finite());

        let covered = points.len() > self.layout.max_index();
        self.coverage
            .observe(covered, "landmark layout", frame.timestamp, points.len());
        if !covered {
            return FrameObservation {
                timestamp: frame.timestamp,
                ear: None,
                lar: None,
                head_angles,
                face_present: true,
            };
        }

        let ear = match (
            gather(points, &self.layout.left_eye),
            gather(points, &self.layout.right_eye),
        ) {
            (Some(left), Some(right)) => average_eye_aspect_ratio(&left, &right),
            _ => None,
        };
        self.eyes.observe(ear.is_some(), "eye aspect ratio", frame.timestamp, points.len());

        let lar = gather(points, &self.layout.mouth)
            .and_then(|[upper, lower, left, right]| lip_aspect_ratio(upper, lower, left, right));
        self.mouth.observe(lar.is_some(), "lip aspect ratio", frame.timestamp, points.len());

        FrameObservation {
            timestamp: frame.timestamp,
            ear,
            lar,
            head_angles,
            face_present: true,
        }
    }
}
