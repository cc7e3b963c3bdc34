//! Drowsiness score and driver state classification
//!
//! The score sums capped contributions from each metric and is clamped to
//! 0-100. The state comes from an ordered list of rules; the first rule whose
//! predicate matches decides.

use crate::analysis::MetricsSnapshot;
use crate::config::{BandPolicy, DmsConfig, ScoreConfig};
use crate::state::{DecidedBy, DriverState};
use serde::{Deserialize, Serialize};

const PERCLOS_CAP: f64 = 85.0;
const CLOSURE_CAP: f64 = 70.0;
const YAWN_CAP: f64 = 50.0;
const BLINK_RATE_CAP: f64 = 30.0;
const BLINK_DURATION_CAP: f64 = 20.0;
const EAR_CAP: f64 = 10.0;

/// Per-metric score contributions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub perclos: f64,
    pub closure: f64,
    pub yawn: f64,
    pub blink_rate: f64,
    pub blink_duration: f64,
    pub ear: f64,
    /// Clamped sum (0-100)
    pub total: f64,
}

/// PERCLOS contribution, piecewise linear in the closure percentage
pub fn perclos_contribution(perclos: f64, s: &ScoreConfig) -> f64 {
    let p = perclos.clamp(0.0, 100.0);
    let (alert, drowsy, high) = (s.perclos_alert_max, s.perclos_drowsy_min, s.perclos_high_drowsy_min);
    let value = if p <= alert {
        p
    } else if p < drowsy {
        alert + 1.5 * (p - alert)
    } else if p < high {
        40.0 + 2.0 * (p - drowsy)
    } else {
        60.0 + (p - high).min(25.0)
    };
    value.min(PERCLOS_CAP)
}

fn closure_contribution(snapshot: &MetricsSnapshot, config: &DmsConfig) -> f64 {
    let mut value = 0.0;
    if snapshot.closure_duration >= config.eye_closed_drowsy_seconds {
        value += 25.0;
    }
    if snapshot.closure_duration >= config.microsleep_seconds {
        value += 25.0;
    }
    if snapshot.microsleep_count > 0 {
        value += 20.0;
    }
    f64::min(value, CLOSURE_CAP)
}

fn yawn_contribution(snapshot: &MetricsSnapshot) -> f64 {
    let mut value = (15.0 * snapshot.yawn_frequency).min(30.0);
    if snapshot.yawning {
        value += 20.0;
    }
    value.min(YAWN_CAP)
}

fn blink_rate_contribution(rate: f64, s: &ScoreConfig) -> f64 {
    let mut value = 0.0;
    if rate > s.blink_rate_alert_max {
        value += (1.2 * (rate - s.blink_rate_alert_max)).min(20.0);
    }
    if rate > s.blink_rate_drowsy_min {
        value += (0.8 * (rate - s.blink_rate_drowsy_min)).min(10.0);
    }
    value.min(BLINK_RATE_CAP)
}

fn blink_duration_contribution(duration: f64, s: &ScoreConfig) -> f64 {
    if duration >= s.blink_duration_drowsy_min {
        (120.0 * (duration - s.blink_duration_drowsy_min)).min(BLINK_DURATION_CAP)
    } else {
        0.0
    }
}

fn ear_contribution(ear: Option<f64>, threshold: f64) -> f64 {
    match ear {
        Some(ear) if ear < threshold => (200.0 * (threshold - ear)).min(EAR_CAP),
        _ => 0.0,
    }
}

/// Score a snapshot
///
/// PERCLOS only contributes once it has spanned its minimum history, so the
/// first blink of a session cannot read as 100 % closure.
pub fn drowsiness_score(snapshot: &MetricsSnapshot, config: &DmsConfig) -> ScoreBreakdown {
    if !snapshot.face_present {
        return ScoreBreakdown::default();
    }
    let s = &config.scoring;
    let mut b = ScoreBreakdown {
        perclos: if snapshot.perclos_warmed_up {
            perclos_contribution(snapshot.perclos, s)
        } else {
            0.0
        },
        closure: closure_contribution(snapshot, config),
        yawn: yawn_contribution(snapshot),
        blink_rate: blink_rate_contribution(snapshot.blink_rate, s),
        blink_duration: blink_duration_contribution(snapshot.avg_blink_duration, s),
        ear: ear_contribution(snapshot.ear, config.ear_closed_threshold),
        total: 0.0,
    };
    let sum = b.perclos + b.closure + b.yawn + b.blink_rate + b.blink_duration + b.ear;
    b.total = if sum.is_finite() { sum.clamp(0.0, 100.0) } else { 0.0 };
    b
}

/// Inputs visible to the classification rules
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub snapshot: &'a MetricsSnapshot,
    pub score: f64,
    pub config: &'a DmsConfig,
}

/// A named classification rule
pub struct Rule {
    pub name: &'static str,
    pub decided_by: DecidedBy,
    pub apply: fn(&RuleInput<'_>) -> Option<DriverState>,
}

/// Classification rules, highest precedence first
pub static RULES: &[Rule] = &[
    Rule {
        name: "no_face",
        decided_by: DecidedBy::NoFace,
        apply: no_face_rule,
    },
    Rule {
        name: "hard_override",
        decided_by: DecidedBy::HardOverride,
        apply: hard_override_rule,
    },
    Rule {
        name: "inattention",
        decided_by: DecidedBy::Inattention,
        apply: inattention_rule,
    },
    Rule {
        name: "perclos_band",
        decided_by: DecidedBy::PerclosBand,
        apply: perclos_band_rule,
    },
    Rule {
        name: "score_band",
        decided_by: DecidedBy::ScoreBand,
        apply: score_band_rule,
    },
];

fn no_face_rule(input: &RuleInput<'_>) -> Option<DriverState> {
    (!input.snapshot.face_present).then_some(DriverState::NoFace)
}

fn hard_override_rule(input: &RuleInput<'_>) -> Option<DriverState> {
    let snap = input.snapshot;
    let s = &input.config.scoring;
    let perclos_breach = snap.perclos_warmed_up && snap.perclos >= s.perclos_drowsy_min;
    let closure_breach = snap.closure_duration >= input.config.eye_closed_drowsy_seconds;
    let blink_breach = snap.avg_blink_duration >= s.blink_duration_override;

    if !(perclos_breach || closure_breach || blink_breach) {
        return None;
    }
    let large = input.score > s.score_drowsy_max
        || (snap.perclos_warmed_up && snap.perclos >= s.perclos_high_drowsy_min);
    Some(if large {
        DriverState::VeryDrowsy
    } else {
        DriverState::Drowsy
    })
}

fn inattention_rule(input: &RuleInput<'_>) -> Option<DriverState> {
    if !input.snapshot.inattentive {
        return None;
    }
    let band = perclos_band_rule(input).unwrap_or_else(|| score_band(input.score, &input.config.scoring));
    (band.drowsiness_rank() <= DriverState::SlightlyDrowsy.drowsiness_rank()).then_some(DriverState::Inattentive)
}

fn perclos_band(perclos: f64, s: &ScoreConfig) -> DriverState {
    if perclos < s.perclos_alert_max {
        DriverState::Alert
    } else if perclos <= s.perclos_drowsy_min {
        DriverState::SlightlyDrowsy
    } else {
        DriverState::Drowsy
    }
}

fn perclos_band_rule(input: &RuleInput<'_>) -> Option<DriverState> {
    let snap = input.snapshot;
    if !snap.perclos_warmed_up {
        return None;
    }
    let s = &input.config.scoring;
    let band = perclos_band(snap.perclos, s);
    Some(match s.band_policy {
        BandPolicy::PerclosAuthoritative => band,
        BandPolicy::MostSevere => {
            let by_score = score_band(input.score, s);
            if by_score.drowsiness_rank() > band.drowsiness_rank() {
                by_score
            } else {
                band
            }
        }
    })
}

/// State implied by the score alone
pub fn score_band(score: f64, s: &ScoreConfig) -> DriverState {
    if score <= s.score_alert_max {
        DriverState::Alert
    } else if score <= s.score_slightly_drowsy_max {
        DriverState::SlightlyDrowsy
    } else if score <= s.score_drowsy_max {
        DriverState::Drowsy
    } else {
        DriverState::VeryDrowsy
    }
}

fn score_band_rule(input: &RuleInput<'_>) -> Option<DriverState> {
    Some(score_band(input.score, &input.config.scoring))
}

/// Evaluate the rules in order
pub fn classify(snapshot: &MetricsSnapshot, score: f64, config: &DmsConfig) -> (DriverState, DecidedBy) {
    let input = RuleInput {
        snapshot,
        score,
        config,
    };
    RULES
        .iter()
        .find_map(|rule| (rule.apply)(&input).map(|state| (state, rule.decided_by)))
        .unwrap_or((score_band(score, &config.scoring), DecidedBy::ScoreBand))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::FrameStatus;
    use proptest::prelude::*;

    fn alert_snapshot() -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: 100.0,
            face_present: true,
            frame_status: FrameStatus::Accepted,
            ear: Some(0.3),
            lar: Some(0.3),
            perclos: 2.0,
            perclos_warmed_up: true,
            blink_rate: 15.0,
            avg_blink_duration: 0.15,
            looking_at_road: Some(true),
            ..Default::default()
        }
    }

    fn run(snapshot: &MetricsSnapshot, config: &DmsConfig) -> (f64, DriverState, DecidedBy) {
        let score = drowsiness_score(snapshot, config).total;
        let (state, by) = classify(snapshot, score, config);
        (score, state, by)
    }

    #[test]
    fn test_alert_driver() {
        let config = DmsConfig::default();
        let (score, state, by) = run(&alert_snapshot(), &config);
        assert_eq!(score, 2.0);
        assert_eq!(state, DriverState::Alert);
        assert_eq!(by, DecidedBy::PerclosBand);
    }

    #[test]
    fn test_perclos_piecewise() {
        let s = ScoreConfig::default();
        assert_eq!(perclos_contribution(5.0, &s), 5.0);
        assert_eq!(perclos_contribution(20.0, &s), 25.0);
        assert_eq!(perclos_contribution(35.0, &s), 50.0);
        assert_eq!(perclos_contribution(50.0, &s), 70.0);
        assert_eq!(perclos_contribution(100.0, &s), 85.0);
    }

    #[test]
    fn test_perclos_35_is_drowsy() {
        let config = DmsConfig::default();
        let snap = MetricsSnapshot {
            perclos: 35.0,
            ..alert_snapshot()
        };
        let (_, state, by) = run(&snap, &config);
        assert!(state.drowsiness_rank() >= DriverState::Drowsy.drowsiness_rank());
        assert_eq!(by, DecidedBy::HardOverride);
    }

    #[test]
    fn test_high_perclos_very_drowsy() {
        let config = DmsConfig::default();
        let snap = MetricsSnapshot {
            perclos: 45.0,
            ..alert_snapshot()
        };
        assert_eq!(run(&snap, &config).1, DriverState::VeryDrowsy);
    }

    #[test]
    fn test_long_closure_override() {
        let config = DmsConfig::default();
        let snap = MetricsSnapshot {
            closure_duration: 0.7,
            ear: Some(0.05),
            ..alert_snapshot()
        };
        let (score, state, by) = run(&snap, &config);
        assert_eq!(by, DecidedBy::HardOverride);
        assert_eq!(state, DriverState::Drowsy);
        // 2 PERCLOS + 50 closure + 10 EAR
        assert!((score - 62.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_average_blink_override() {
        let config = DmsConfig::default();
        let snap = MetricsSnapshot {
            avg_blink_duration: 0.5,
            ..alert_snapshot()
        };
        assert_eq!(run(&snap, &config).1, DriverState::Drowsy);
    }

    #[test]
    fn test_cold_perclos_ignored() {
        let config = DmsConfig::default();
        let snap = MetricsSnapshot {
            perclos: 100.0,
            perclos_warmed_up: false,
            ..alert_snapshot()
        };
        let (score, state, by) = run(&snap, &config);
        assert_eq!(score, 0.0);
        assert_eq!(state, DriverState::Alert);
        assert_eq!(by, DecidedBy::ScoreBand);
    }

    #[test]
    fn test_inattention() {
        let config = DmsConfig::default();
        let snap = MetricsSnapshot {
            inattentive: true,
            looking_at_road: Some(false),
            ..alert_snapshot()
        };
        assert_eq!(run(&snap, &config).1, DriverState::Inattentive);

        // Drowsiness outranks inattention
        let snap = MetricsSnapshot {
            perclos: 32.0,
            ..snap
        };
        assert_eq!(run(&snap, &config).1, DriverState::Drowsy);
    }

    #[test]
    fn test_no_face() {
        let config = DmsConfig::default();
        let snap = MetricsSnapshot::absent(1.0, FrameStatus::NoFace);
        assert_eq!(run(&snap, &config), (0.0, DriverState::NoFace, DecidedBy::NoFace));
    }

    #[test]
    fn test_band_policy() {
        // Yawning heavily with low PERCLOS
        let snap = MetricsSnapshot {
            yawn_frequency: 3.0,
            yawning: true,
            ..alert_snapshot()
        };
        let authoritative = DmsConfig::default();
        let (score, state, _) = run(&snap, &authoritative);
        assert!((score - 52.0).abs() < 1e-9);
        assert_eq!(state, DriverState::Alert);

        let most_severe = DmsConfig {
            scoring: ScoreConfig {
                band_policy: BandPolicy::MostSevere,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(run(&snap, &most_severe).1, DriverState::SlightlyDrowsy);
    }

    #[test]
    fn test_rule_order() {
        let names: Vec<_> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            ["no_face", "hard_override", "inattention", "perclos_band", "score_band"]
        );
    }

    proptest! {
        #[test]
        fn score_monotone_in_perclos(a in 0.0f64..100.0, b in 0.0f64..100.0) {
            let config = DmsConfig::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let low = MetricsSnapshot { perclos: lo, ..alert_snapshot() };
            let high = MetricsSnapshot { perclos: hi, ..alert_snapshot() };
            prop_assert!(
                drowsiness_score(&low, &config).total <= drowsiness_score(&high, &config).total
            );
        }

        #[test]
        fn score_clamped(
            perclos in 0.0f64..100.0,
            closure in 0.0f64..10.0,
            microsleeps in 0usize..5,
            yawns in 0.0f64..10.0,
            yawning in any::<bool>(),
            rate in 0.0f64..80.0,
            duration in 0.0f64..1.0,
            ear in 0.0f64..0.5
        ) {
            let snap = MetricsSnapshot {
                perclos,
                closure_duration: closure,
                microsleep_count: microsleeps,
                yawn_frequency: yawns,
                yawning,
                blink_rate: rate,
                avg_blink_duration: duration,
                ear: Some(ear),
                ..alert_snapshot()
            };
            let b = drowsiness_score(&snap, &DmsConfig::default());
            prop_assert!((0.0..=100.0).contains(&b.total));
            prop_assert!(b.perclos <= PERCLOS_CAP && b.closure <= CLOSURE_CAP && b.yawn <= YAWN_CAP);
        }
    }
}
