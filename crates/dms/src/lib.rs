//! Driver Monitoring System (DMS)
//!
//! Real-time drowsiness estimation from per-frame facial geometry:
//! - Eye and lip aspect ratios from landmarks
//! - PERCLOS over a trailing window
//! - Blink rate, blink duration and microsleeps
//! - Yawn frequency
//! - Head pose and road attention
//! - Drowsiness score and driver state classification

pub mod analysis;
pub mod blink;
pub mod config;
pub mod geometry;
pub mod head_pose;
pub mod landmarks;
pub mod observation;
pub mod perclos;
pub mod scoring;
pub mod state;
pub mod yawn;

pub use analysis::{DmsAnalysis, MetricsSnapshot};
pub use blink::{BlinkAnalyzer, BlinkSettings, ClosureKind, EyeClosureEvent};
pub use config::{BandPolicy, DmsConfig, ScoreConfig};
pub use geometry::RatioExtractor;
pub use head_pose::{AttentionStatus, HeadAttention};
pub use landmarks::{FaceFrame, LandmarkLayout, Landmarks, Point2, RotationMatrix};
pub use observation::{FrameObservation, FrameStatus, HeadAngles};
pub use perclos::PerclosTracker;
pub use scoring::{classify, drowsiness_score, ScoreBreakdown};
pub use state::{DecidedBy, DriverState, YawnRisk};
pub use yawn::{YawnAnalyzer, YawnEvent, YawnSettings};

use signal_filter::ValidationError;
use thiserror::Error;
use tracing::{debug, info, warn};

/// DMS error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DmsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ValidationError),
}

/// Driver monitoring module
///
/// Owns every tracker and turns one frame into one [`DmsAnalysis`].
#[derive(Debug, Clone)]
pub struct DmsModule {
    config: DmsConfig,
    extractor: RatioExtractor,
    perclos: PerclosTracker,
    blink: BlinkAnalyzer,
    yawn: YawnAnalyzer,
    attention: HeadAttention,
    last_timestamp: Option<f64>,
    frames_processed: u64,
}

impl DmsModule {
    /// Create a new DMS module with configuration
    pub fn new(config: DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        info!(
            ear_closed_threshold = config.ear_closed_threshold,
            perclos_window = config.perclos_window_seconds,
            band_policy = ?config.scoring.band_policy,
            "DMS module initialized"
        );
        Ok(Self {
            extractor: RatioExtractor::new(config.layout.clone()),
            perclos: PerclosTracker::new(
                config.perclos_window_seconds,
                config.ear_closed_threshold,
                config.perclos_min_span_seconds,
                config.max_frame_rate_hz,
            ),
            blink: BlinkAnalyzer::new(BlinkSettings {
                closed_threshold: config.ear_closed_threshold,
                window_seconds: config.blink_window_seconds,
                min_blink_seconds: config.blink_min_seconds,
                max_blink_seconds: config.blink_max_seconds,
                min_interval_seconds: config.blink_min_interval_seconds,
                microsleep_seconds: config.microsleep_seconds,
                max_frame_gap_seconds: config.max_frame_gap_seconds,
                max_rate_hz: config.max_frame_rate_hz,
            }),
            yawn: YawnAnalyzer::new(YawnSettings {
                lar_threshold: config.lar_threshold,
                smoothing: config.lar_smoothing,
                consecutive_frames: config.lar_consecutive_frames,
                min_duration_seconds: config.yawn_min_duration_seconds,
                window_seconds: config.yawn_window_seconds,
                moderate_per_minute: config.yawn_moderate_per_minute,
                high_per_minute: config.yawn_high_per_minute,
                critical_per_minute: config.yawn_critical_per_minute,
                max_frame_gap_seconds: config.max_frame_gap_seconds,
            }),
            attention: HeadAttention::new(
                config.yaw_limit_degrees,
                config.pitch_limit_degrees,
                config.head_smoothing_frames,
                config.attention_debounce_seconds,
            ),
            last_timestamp: None,
            frames_processed: 0,
            config,
        })
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    /// Analyze one landmark frame
    pub fn process(&mut self, frame: &FaceFrame) -> DmsAnalysis {
        let observation = self.extractor.extract(frame);
        self.process_observation(observation)
    }

    /// Analyze one pre-extracted observation
    ///
    /// Frames that are not newer than the previous one and frames without a
    /// face leave every tracker untouched. A face without a usable eye ratio
    /// still feeds the yawn and head trackers; the eye trackers keep their
    /// windows and this frame's eye measurements are reported absent.
    pub fn process_observation(&mut self, observation: FrameObservation) -> DmsAnalysis {
        let ts = observation.timestamp;
        self.frames_processed += 1;

        let in_order = ts.is_finite() && self.last_timestamp.map_or(true, |last| ts > last);
        if !in_order {
            warn!(
                timestamp = ts,
                previous = self.last_timestamp,
                "Frame not newer than the previous frame, skipping"
            );
            return Self::skipped(observation, FrameStatus::OutOfOrder);
        }
        self.last_timestamp = Some(ts);

        if !observation.face_present {
            return Self::skipped(observation, FrameStatus::NoFace);
        }

        let ear = observation.ear.filter(|v| v.is_finite());
        let (frame_status, perclos, closure_duration) = match ear {
            Some(ear) => {
                let perclos = self.perclos.update(ts, ear);
                self.blink.update(ts, ear);
                (FrameStatus::Accepted, perclos, self.blink.current_closure_duration(ts))
            }
            None => {
                debug!(timestamp = ts, "Face without usable eye ratio, eye trackers skipped");
                (FrameStatus::Degenerate, self.perclos.perclos(), 0.0)
            }
        };
        self.yawn.update(ts, observation.lar);
        let attention = self.attention.update(ts, observation.head_angles);

        let snapshot = MetricsSnapshot {
            timestamp: ts,
            face_present: true,
            frame_status,
            ear,
            lar: self.yawn.smoothed_lar(),
            perclos,
            perclos_warmed_up: self.perclos.is_warmed_up(),
            blink_rate: self.blink.blink_rate(),
            avg_blink_duration: self.blink.average_blink_duration(),
            closure_duration,
            microsleep_count: self.blink.microsleep_count(),
            total_microsleeps: self.blink.total_microsleeps(),
            yawn_count: self.yawn.yawn_count(),
            yawn_frequency: self.yawn.yawn_frequency(),
            yawn_risk: self.yawn.risk(),
            yawn_duration: self.yawn.current_yawn_duration(ts),
            yawning: self.yawn.is_yawning(ts),
            head: attention.angles,
            looking_at_road: attention.looking_at_road,
            inattentive: attention.inattentive,
        };

        let breakdown = drowsiness_score(&snapshot, &self.config);
        let (state, decided_by) = classify(&snapshot, breakdown.total, &self.config);
        debug!(
            timestamp = ts,
            perclos = snapshot.perclos,
            score = breakdown.total,
            state = %state,
            "DMS tick"
        );

        DmsAnalysis {
            observation,
            snapshot,
            score: breakdown.total,
            breakdown,
            state,
            decided_by,
        }
    }

    fn skipped(observation: FrameObservation, status: FrameStatus) -> DmsAnalysis {
        DmsAnalysis {
            snapshot: MetricsSnapshot::absent(observation.timestamp, status),
            observation,
            score: 0.0,
            breakdown: ScoreBreakdown::default(),
            state: DriverState::NoFace,
            decided_by: DecidedBy::NoFace,
        }
    }

    pub fn perclos(&self) -> &PerclosTracker {
        &self.perclos
    }

    pub fn blink(&self) -> &BlinkAnalyzer {
        &self.blink
    }

    pub fn yawn(&self) -> &YawnAnalyzer {
        &self.yawn
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Reset driver state (on driver change)
    pub fn reset_state(&mut self) {
        self.perclos.reset();
        self.blink.reset();
        self.yawn.reset();
        self.attention.reset();
        self.last_timestamp = None;
        info!("DMS state reset");
    }
}
