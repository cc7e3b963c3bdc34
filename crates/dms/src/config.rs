//! DMS configuration

use crate::landmarks::LandmarkLayout;
use serde::{Deserialize, Serialize};
use signal_filter::{
    validate_fraction, validate_min, validate_positive, validate_range, SmoothingKind, ValidationError,
};

/// Precedence between the PERCLOS band and the score band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandPolicy {
    /// Once PERCLOS is warmed up its band is final
    #[default]
    PerclosAuthoritative,
    /// Take the more severe of the PERCLOS band and the score band
    MostSevere,
}

/// Score weighting and state thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// PERCLOS below this is alert (%)
    pub perclos_alert_max: f64,
    /// PERCLOS at or above this forces a drowsy state (%)
    pub perclos_drowsy_min: f64,
    /// PERCLOS at or above this is a large breach (%)
    pub perclos_high_drowsy_min: f64,

    /// Normal blink rate ceiling (blinks/min)
    pub blink_rate_alert_max: f64,
    /// Drowsy blink rate floor (blinks/min)
    pub blink_rate_drowsy_min: f64,

    /// Average blink duration where the duration contribution starts (seconds)
    pub blink_duration_drowsy_min: f64,
    /// Average blink duration that forces a drowsy state (seconds)
    pub blink_duration_override: f64,

    /// Score at or below this is alert
    pub score_alert_max: f64,
    /// Score at or below this is slightly drowsy
    pub score_slightly_drowsy_max: f64,
    /// Score at or below this is drowsy; above is very drowsy
    pub score_drowsy_max: f64,

    /// Band precedence outside the hard override
    pub band_policy: BandPolicy,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            perclos_alert_max: 10.0,
            perclos_drowsy_min: 30.0,
            perclos_high_drowsy_min: 40.0,
            blink_rate_alert_max: 18.0,
            blink_rate_drowsy_min: 28.0,
            blink_duration_drowsy_min: 0.28,
            blink_duration_override: 0.48,
            score_alert_max: 25.0,
            score_slightly_drowsy_max: 55.0,
            score_drowsy_max: 80.0,
            band_policy: BandPolicy::PerclosAuthoritative,
        }
    }
}

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// EAR below this counts as closed
    pub ear_closed_threshold: f64,

    /// PERCLOS trailing window (seconds)
    pub perclos_window_seconds: f64,
    /// Sample span before the PERCLOS band rule applies (seconds)
    pub perclos_min_span_seconds: f64,

    /// Blink and microsleep window (seconds)
    pub blink_window_seconds: f64,
    /// Closures shorter than this are landmark jitter (seconds)
    pub blink_min_seconds: f64,
    /// Closures longer than this are not counted as blinks (seconds)
    pub blink_max_seconds: f64,
    /// Minimum spacing between blink ends (seconds)
    pub blink_min_interval_seconds: f64,
    /// Closure at or above this is a microsleep (seconds)
    pub microsleep_seconds: f64,
    /// Live closure at or above this forces a drowsy state (seconds)
    pub eye_closed_drowsy_seconds: f64,

    /// Smoothed LAR above this counts as mouth open
    pub lar_threshold: f64,
    /// LAR smoothing method
    pub lar_smoothing: SmoothingKind,
    /// Consecutive open frames before a mouth opening is accepted
    pub lar_consecutive_frames: usize,
    /// Mouth open at least this long is a yawn (seconds)
    pub yawn_min_duration_seconds: f64,
    /// Yawn frequency window (seconds)
    pub yawn_window_seconds: f64,
    /// Yawns per minute for the moderate risk band
    pub yawn_moderate_per_minute: f64,
    /// Yawns per minute for the high risk band
    pub yawn_high_per_minute: f64,
    /// Yawns per minute for the critical risk band
    pub yawn_critical_per_minute: f64,

    /// Yaw deviation still counted as looking at the road (degrees)
    pub yaw_limit_degrees: f64,
    /// Pitch deviation still counted as looking at the road (degrees)
    pub pitch_limit_degrees: f64,
    /// Frames averaged for head angles
    pub head_smoothing_frames: usize,
    /// Looking away longer than this is inattention (seconds)
    pub attention_debounce_seconds: f64,

    /// Gap between samples that abandons in-progress episodes (seconds)
    pub max_frame_gap_seconds: f64,
    /// Highest expected frame rate, bounds window memory (Hz)
    pub max_frame_rate_hz: f64,

    /// Score weighting and state thresholds
    pub scoring: ScoreConfig,

    /// Landmark indices
    pub layout: LandmarkLayout,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_closed_threshold: 0.15,
            perclos_window_seconds: 60.0,
            perclos_min_span_seconds: 5.0,
            blink_window_seconds: 60.0,
            blink_min_seconds: 0.08,
            blink_max_seconds: 0.8,
            blink_min_interval_seconds: 0.10,
            microsleep_seconds: 0.5,
            eye_closed_drowsy_seconds: 0.6,
            lar_threshold: 0.65,
            lar_smoothing: SmoothingKind::MovingAverage { frames: 5 },
            lar_consecutive_frames: 3,
            yawn_min_duration_seconds: 1.5,
            yawn_window_seconds: 60.0,
            yawn_moderate_per_minute: 2.0,
            yawn_high_per_minute: 3.0,
            yawn_critical_per_minute: 4.0,
            yaw_limit_degrees: 20.0,
            pitch_limit_degrees: 15.0,
            head_smoothing_frames: 5,
            attention_debounce_seconds: 1.0,
            max_frame_gap_seconds: 1.0,
            max_frame_rate_hz: 60.0,
            scoring: ScoreConfig::default(),
            layout: LandmarkLayout::default(),
        }
    }
}

fn validate_order(
    lower: &'static str,
    lower_value: f64,
    upper: &'static str,
    upper_value: f64,
) -> Result<(), ValidationError> {
    if lower_value > upper_value {
        Err(ValidationError::Ordering {
            lower,
            lower_value,
            upper,
            upper_value,
        })
    } else {
        Ok(())
    }
}

impl DmsConfig {
    /// Create strict config (earlier detection)
    pub fn strict() -> Self {
        Self {
            ear_closed_threshold: 0.18,
            eye_closed_drowsy_seconds: 0.5,
            microsleep_seconds: 0.4,
            attention_debounce_seconds: 0.5,
            yaw_limit_degrees: 15.0,
            pitch_limit_degrees: 12.0,
            ..Default::default()
        }
    }

    /// Create lenient config (fewer false positives)
    pub fn lenient() -> Self {
        Self {
            ear_closed_threshold: 0.12,
            eye_closed_drowsy_seconds: 0.8,
            microsleep_seconds: 0.7,
            attention_debounce_seconds: 2.0,
            yaw_limit_degrees: 30.0,
            pitch_limit_degrees: 20.0,
            ..Default::default()
        }
    }

    /// Check every threshold for plausibility
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_range("ear_closed_threshold", self.ear_closed_threshold, 0.01, 1.0)?;
        validate_positive("perclos_window_seconds", self.perclos_window_seconds)?;
        validate_min("perclos_min_span_seconds", self.perclos_min_span_seconds, 0.0)?;
        validate_order(
            "perclos_min_span_seconds",
            self.perclos_min_span_seconds,
            "perclos_window_seconds",
            self.perclos_window_seconds,
        )?;

        validate_positive("blink_window_seconds", self.blink_window_seconds)?;
        validate_min("blink_min_seconds", self.blink_min_seconds, 0.0)?;
        validate_positive("blink_max_seconds", self.blink_max_seconds)?;
        validate_order("blink_min_seconds", self.blink_min_seconds, "blink_max_seconds", self.blink_max_seconds)?;
        validate_min("blink_min_interval_seconds", self.blink_min_interval_seconds, 0.0)?;
        validate_positive("microsleep_seconds", self.microsleep_seconds)?;
        validate_positive("eye_closed_drowsy_seconds", self.eye_closed_drowsy_seconds)?;

        validate_range("lar_threshold", self.lar_threshold, 0.01, 5.0)?;
        match self.lar_smoothing {
            SmoothingKind::MovingAverage { frames } => {
                validate_range("lar_smoothing.frames", frames as f64, 1.0, 120.0)?
            }
            SmoothingKind::Exponential { alpha } => {
                validate_fraction("lar_smoothing.alpha", alpha)?;
                validate_positive("lar_smoothing.alpha", alpha)?;
            }
        }
        validate_range("lar_consecutive_frames", self.lar_consecutive_frames as f64, 1.0, 120.0)?;
        validate_min("yawn_min_duration_seconds", self.yawn_min_duration_seconds, 0.0)?;
        validate_positive("yawn_window_seconds", self.yawn_window_seconds)?;
        validate_positive("yawn_moderate_per_minute", self.yawn_moderate_per_minute)?;
        validate_order(
            "yawn_moderate_per_minute",
            self.yawn_moderate_per_minute,
            "yawn_high_per_minute",
            self.yawn_high_per_minute,
        )?;
        validate_order(
            "yawn_high_per_minute",
            self.yawn_high_per_minute,
            "yawn_critical_per_minute",
            self.yawn_critical_per_minute,
        )?;

        validate_range("yaw_limit_degrees", self.yaw_limit_degrees, 0.0, 180.0)?;
        validate_range("pitch_limit_degrees", self.pitch_limit_degrees, 0.0, 90.0)?;
        validate_range("head_smoothing_frames", self.head_smoothing_frames as f64, 1.0, 120.0)?;
        validate_min("attention_debounce_seconds", self.attention_debounce_seconds, 0.0)?;

        validate_positive("max_frame_gap_seconds", self.max_frame_gap_seconds)?;
        validate_range("max_frame_rate_hz", self.max_frame_rate_hz, 1.0, 1000.0)?;

        self.scoring.validate()
    }
}

impl ScoreConfig {
    /// Check band boundaries for plausibility and ordering
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_range("perclos_alert_max", self.perclos_alert_max, 0.0, 100.0)?;
        validate_range("perclos_drowsy_min", self.perclos_drowsy_min, 0.0, 100.0)?;
        validate_range("perclos_high_drowsy_min", self.perclos_high_drowsy_min, 0.0, 100.0)?;
        validate_order(
            "perclos_alert_max",
            self.perclos_alert_max,
            "perclos_drowsy_min",
            self.perclos_drowsy_min,
        )?;
        validate_order(
            "perclos_drowsy_min",
            self.perclos_drowsy_min,
            "perclos_high_drowsy_min",
            self.perclos_high_drowsy_min,
        )?;

        validate_min("blink_rate_alert_max", self.blink_rate_alert_max, 0.0)?;
        validate_order(
            "blink_rate_alert_max",
            self.blink_rate_alert_max,
            "blink_rate_drowsy_min",
            self.blink_rate_drowsy_min,
        )?;
        validate_min("blink_duration_drowsy_min", self.blink_duration_drowsy_min, 0.0)?;
        validate_positive("blink_duration_override", self.blink_duration_override)?;

        validate_range("score_alert_max", self.score_alert_max, 0.0, 100.0)?;
        validate_range("score_slightly_drowsy_max", self.score_slightly_drowsy_max, 0.0, 100.0)?;
        validate_range("score_drowsy_max", self.score_drowsy_max, 0.0, 100.0)?;
        validate_order(
            "score_alert_max",
            self.score_alert_max,
            "score_slightly_drowsy_max",
            self.score_slightly_drowsy_max,
        )?;
        validate_order(
            "score_slightly_drowsy_max",
            self.score_slightly_drowsy_max,
            "score_drowsy_max",
            self.score_drowsy_max,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(DmsConfig::default().validate().is_ok());
        assert!(DmsConfig::strict().validate().is_ok());
        assert!(DmsConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_negative_window_rejected() {
        let config = DmsConfig {
            perclos_window_seconds: -60.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::NotPositive { field: "perclos_window_seconds", .. })
        ));
    }

    #[test]
    fn test_inverted_bands_rejected() {
        let config = DmsConfig {
            scoring: ScoreConfig {
                score_alert_max: 60.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::Ordering { .. })));

        let config = DmsConfig {
            blink_min_seconds: 1.0,
            blink_max_seconds: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: DmsConfig = serde_json::from_str(r#"{"ear_closed_threshold": 0.2}"#).unwrap();
        assert_eq!(config.ear_closed_threshold, 0.2);
        assert_eq!(config.perclos_window_seconds, 60.0);
        assert_eq!(config.scoring.band_policy, BandPolicy::PerclosAuthoritative);
    }
}
