//! Alert escalation engine

use crate::event::{AlertLevel, AlertPulse, AlertState, AlertTransition, TriggerReason};
use crate::AlertError;
use dms::{DmsAnalysis, DriverState, YawnRisk};
use serde::{Deserialize, Serialize};
use signal_filter::{validate_min, validate_positive, validate_range, SustainedCondition};
use sliding_window::TimeWindow;
use tracing::{debug, info, warn};

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Symptoms must hold this long for one activation (seconds)
    pub level1_duration_seconds: f64,
    /// Window in which repeated activations escalate (seconds)
    pub level2_window_seconds: f64,
    /// Activations within the window that escalate to Level 2
    pub level2_trigger_count: usize,
    /// Continuous alert state needed to clear the alert (seconds)
    pub recovery_seconds: f64,
    /// Pulse interval at Level 1 (seconds)
    pub level1_pulse_interval_seconds: f64,
    /// Pulse interval at Level 2 (seconds)
    pub level2_pulse_interval_seconds: f64,
    /// Yawn risk that counts as a Level-1 symptom on its own
    pub yawn_risk_threshold: YawnRisk,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            level1_duration_seconds: 3.0,
            level2_window_seconds: 30.0,
            level2_trigger_count: 3,
            recovery_seconds: 5.0,
            level1_pulse_interval_seconds: 2.0,
            level2_pulse_interval_seconds: 0.5,
            yawn_risk_threshold: YawnRisk::Moderate,
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), AlertError> {
        validate_positive("level1_duration_seconds", self.level1_duration_seconds)?;
        validate_positive("level2_window_seconds", self.level2_window_seconds)?;
        validate_range("level2_trigger_count", self.level2_trigger_count as f64, 1.0, 1000.0)?;
        validate_min("recovery_seconds", self.recovery_seconds, 0.0)?;
        validate_positive("level1_pulse_interval_seconds", self.level1_pulse_interval_seconds)?;
        validate_positive("level2_pulse_interval_seconds", self.level2_pulse_interval_seconds)?;
        Ok(())
    }
}

/// What the engine needs from one DMS tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertInput {
    pub timestamp: f64,
    pub state: DriverState,
    pub yawn_risk: YawnRisk,
    pub score: f64,
    pub perclos: f64,
}

impl From<&DmsAnalysis> for AlertInput {
    fn from(analysis: &DmsAnalysis) -> Self {
        Self {
            timestamp: analysis.snapshot.timestamp,
            state: analysis.state,
            yawn_risk: analysis.snapshot.yawn_risk,
            score: analysis.score,
            perclos: analysis.snapshot.perclos,
        }
    }
}

/// Result of one engine update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertOutput {
    /// Level after this tick
    pub level: AlertLevel,
    pub transition: Option<AlertTransition>,
    pub pulse: Option<AlertPulse>,
    /// A Level-1 activation fired on this tick
    pub activated: bool,
}

/// Two-level alert state machine
///
/// `NONE -> LEVEL1` on the first activation, `LEVEL1 -> LEVEL2` once enough
/// activations fall inside the escalation window, back to `NONE` after a
/// sustained recovery or a manual reset. At most one transition per tick.
#[derive(Debug, Clone)]
pub struct AlertEngine {
    config: AlertConfig,
    level: AlertLevel,
    symptoms: SustainedCondition,
    /// Activations fired during the current symptom hold
    hold_activations: u32,
    recovery: SustainedCondition,
    history: TimeWindow<()>,
    level1_start_time: Option<f64>,
    level2_since: Option<f64>,
    last_timestamp: Option<f64>,
    last_pulse: Option<f64>,
    pulse_sequence: u64,
    last_score: f64,
    last_perclos: f64,
    reset_requested: bool,
}

impl AlertEngine {
    /// Create a new alert engine
    pub fn new(config: AlertConfig) -> Result<Self, AlertError> {
        config.validate()?;
        info!(?config, "Creating alert engine");
        Ok(Self {
            symptoms: SustainedCondition::new(config.level1_duration_seconds),
            recovery: SustainedCondition::new(config.recovery_seconds),
            history: TimeWindow::new(config.level2_window_seconds),
            hold_activations: 0,
            level: AlertLevel::None,
            level1_start_time: None,
            level2_since: None,
            last_timestamp: None,
            last_pulse: None,
            pulse_sequence: 0,
            last_score: 0.0,
            last_perclos: 0.0,
            reset_requested: false,
            config,
        })
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    pub fn level(&self) -> AlertLevel {
        self.level
    }

    /// Cloned view of the current state
    pub fn state(&self) -> AlertState {
        AlertState {
            level: self.level,
            level1_start_time: self.level1_start_time,
            level1_trigger_history: self.history.timestamps().collect(),
            level2_since: self.level2_since,
        }
    }

    /// Defer a manual reset to the start of the next update
    pub fn request_reset(&mut self) {
        self.reset_requested = true;
    }

    /// Clear the alert immediately
    ///
    /// Returns the transition when an alert was active.
    pub fn manual_reset(&mut self, timestamp: f64) -> Option<AlertTransition> {
        self.reset_requested = false;
        let from = self.level;
        self.clear();
        if let Some(last) = self.last_timestamp {
            self.last_timestamp = Some(last.max(timestamp));
        }
        if !from.is_active() {
            debug!(timestamp, "Manual reset with no active alert");
            return None;
        }
        Some(self.transition(from, AlertLevel::None, TriggerReason::ManualReset, timestamp))
    }

    fn clear(&mut self) {
        self.level = AlertLevel::None;
        self.symptoms.reset();
        self.recovery.reset();
        self.hold_activations = 0;
        self.history.clear();
        self.level1_start_time = None;
        self.level2_since = None;
        self.last_pulse = None;
    }

    /// Advance the engine by one tick
    pub fn update(&mut self, input: AlertInput) -> AlertOutput {
        let t = input.timestamp;
        let quiet = AlertOutput {
            level: self.level,
            transition: None,
            pulse: None,
            activated: false,
        };
        if !t.is_finite() || self.last_timestamp.is_some_and(|last| t < last) {
            warn!(
                timestamp = t,
                previous = self.last_timestamp,
                "Non-monotonic alert update ignored"
            );
            return quiet;
        }
        self.last_timestamp = Some(t);
        self.last_score = input.score;
        self.last_perclos = input.perclos;

        if self.reset_requested {
            let transition = self.manual_reset(t);
            return AlertOutput {
                level: self.level,
                transition,
                ..quiet
            };
        }

        self.history.advance(t);

        let activated = if input.state == DriverState::NoFace {
            // Level held; neither escalation nor recovery progresses
            self.symptoms.reset();
            self.recovery.reset();
            self.hold_activations = 0;
            false
        } else {
            self.track(&input)
        };

        let transition = self.decide(&input, activated);
        let pulse = self.pulse(t, transition.is_some());

        AlertOutput {
            level: self.level,
            transition,
            pulse,
            activated,
        }
    }

    fn yawn_condition(&self, input: &AlertInput) -> bool {
        input.yawn_risk >= self.config.yawn_risk_threshold
    }

    /// Update the symptom and recovery timers, returning whether an activation fired
    fn track(&mut self, input: &AlertInput) -> bool {
        let t = input.timestamp;
        let yawning = self.yawn_condition(input);
        let condition = input.state.is_symptomatic() || yawning;

        self.recovery
            .update(input.state == DriverState::Alert && !yawning, t);

        if !condition {
            self.symptoms.reset();
            self.hold_activations = 0;
            return false;
        }

        self.symptoms.update(true, t);
        let due = self.config.level1_duration_seconds * f64::from(self.hold_activations + 1);
        if self.symptoms.held_for(t) < due {
            return false;
        }

        self.hold_activations += 1;
        if let Err(e) = self.history.push(t, ()) {
            warn!(error = %e, "Activation not recorded");
            return false;
        }
        debug!(
            timestamp = t,
            state = %input.state,
            in_window = self.history.len(),
            "Level-1 activation"
        );
        true
    }

    fn decide(&mut self, input: &AlertInput, activated: bool) -> Option<AlertTransition> {
        let t = input.timestamp;
        let recovered = self.recovery.is_sustained(t);

        let current = self.level;
        match current {
            AlertLevel::None if activated => {
                let reason = match (input.state.is_symptomatic(), self.yawn_condition(input)) {
                    (true, true) => TriggerReason::SymptomsAndYawning,
                    (false, true) => TriggerReason::YawnFrequency,
                    _ => TriggerReason::DrowsinessSymptoms,
                };
                self.level = AlertLevel::Level1;
                self.level1_start_time = Some(t);
                Some(self.transition(AlertLevel::None, AlertLevel::Level1, reason, t))
            }
            AlertLevel::Level1 if activated && self.history.len() >= self.config.level2_trigger_count => {
                self.level = AlertLevel::Level2;
                self.level2_since = Some(t);
                Some(self.transition(
                    AlertLevel::Level1,
                    AlertLevel::Level2,
                    TriggerReason::RepeatedActivations,
                    t,
                ))
            }
            level @ (AlertLevel::Level1 | AlertLevel::Level2) if recovered => {
                self.clear();
                Some(self.transition(level, AlertLevel::None, TriggerReason::Recovered, t))
            }
            _ => None,
        }
    }

    fn transition(&self, from: AlertLevel, to: AlertLevel, reason: TriggerReason, timestamp: f64) -> AlertTransition {
        info!(
            %from,
            %to,
            ?reason,
            score = self.last_score,
            perclos = self.last_perclos,
            timestamp,
            "Alert level changed"
        );
        AlertTransition {
            from,
            to,
            reason,
            score: self.last_score,
            perclos: self.last_perclos,
            timestamp,
        }
    }

    fn pulse(&mut self, t: f64, level_changed: bool) -> Option<AlertPulse> {
        let interval = match self.level {
            AlertLevel::None => return None,
            AlertLevel::Level1 => self.config.level1_pulse_interval_seconds,
            AlertLevel::Level2 => self.config.level2_pulse_interval_seconds,
        };
        let due = level_changed || self.last_pulse.map_or(true, |last| t - last >= interval);
        if !due {
            return None;
        }
        self.last_pulse = Some(t);
        self.pulse_sequence += 1;
        Some(AlertPulse {
            level: self.level,
            timestamp: t,
            sequence: self.pulse_sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use signal_filter::ValidationError;

    fn input(t: f64, state: DriverState) -> AlertInput {
        AlertInput {
            timestamp: t,
            state,
            yawn_risk: YawnRisk::Normal,
            score: 50.0,
            perclos: 20.0,
        }
    }

    const SHORT_HOLD: f64 = 0.125;

    fn quick_activation() -> AlertEngine {
        AlertEngine::new(AlertConfig {
            level1_duration_seconds: SHORT_HOLD,
            ..Default::default()
        })
        .unwrap()
    }

    /// One isolated activation at `t`, followed by a no-face tick
    fn activate(engine: &mut AlertEngine, t: f64) -> AlertOutput {
        engine.update(input(t - SHORT_HOLD, DriverState::Drowsy));
        let out = engine.update(input(t, DriverState::Drowsy));
        assert!(out.activated);
        engine.update(input(t + 0.1, DriverState::NoFace));
        out
    }

    #[test]
    fn test_level1_after_sustained_symptoms() {
        let mut engine = AlertEngine::new(AlertConfig::default()).unwrap();
        let mut transitions = Vec::new();
        for i in 0..=100 {
            let out = engine.update(input(i as f64 * 0.033, DriverState::SlightlyDrowsy));
            transitions.extend(out.transition);
        }
        assert_eq!(engine.level(), AlertLevel::Level1);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].reason, TriggerReason::DrowsinessSymptoms);
        assert!(transitions[0].timestamp >= 3.0);
    }

    #[test]
    fn test_short_symptoms_do_not_alert() {
        let mut engine = AlertEngine::new(AlertConfig::default()).unwrap();
        for i in 0..60 {
            engine.update(input(i as f64 * 0.033, DriverState::Drowsy));
        }
        engine.update(input(2.5, DriverState::Alert));
        assert_eq!(engine.level(), AlertLevel::None);
        assert!(engine.state().level1_trigger_history.is_empty());
    }

    #[test]
    fn test_three_activations_escalate() {
        let mut engine = quick_activation();
        let first = activate(&mut engine, 0.0);
        assert_eq!(first.transition.map(|t| t.to), Some(AlertLevel::Level1));
        assert!(first.pulse.is_some());

        activate(&mut engine, 10.0);
        assert_eq!(engine.level(), AlertLevel::Level1);

        let third = activate(&mut engine, 20.0);
        let transition = third.transition.unwrap();
        assert_eq!(transition.from, AlertLevel::Level1);
        assert_eq!(transition.to, AlertLevel::Level2);
        assert_eq!(transition.reason, TriggerReason::RepeatedActivations);
        assert_eq!(engine.state().level2_since, Some(20.0));
    }

    #[test]
    fn test_spread_activations_stay_level1() {
        let mut engine = quick_activation();
        activate(&mut engine, 0.0);
        activate(&mut engine, 10.0);

        engine.update(input(40.0 - SHORT_HOLD, DriverState::Drowsy));
        let third = engine.update(input(40.0, DriverState::Drowsy));
        assert!(third.activated);
        assert!(third.transition.is_none());
        assert_eq!(engine.level(), AlertLevel::Level1);
        // The activation at 0 s has left the 30 s window
        assert_eq!(engine.state().level1_trigger_history, vec![10.0, 40.0]);

        // A later tick moves the window past 10 s as well
        engine.update(input(40.1, DriverState::NoFace));
        assert_eq!(engine.state().level1_trigger_history, vec![40.0]);
    }

    #[test]
    fn test_continuous_symptoms_refire() {
        let mut engine = AlertEngine::new(AlertConfig::default()).unwrap();
        let mut activations = Vec::new();
        let mut level2_at = None;
        for i in 0..=300 {
            let t = i as f64 * 0.05;
            let out = engine.update(input(t, DriverState::Drowsy));
            if out.activated {
                activations.push(t);
            }
            if out.transition.is_some_and(|tr| tr.to == AlertLevel::Level2) {
                level2_at = Some(t);
            }
        }
        // Activations every 3 s; the one at 9 s is the third in the window
        assert_eq!(activations.len(), 5);
        assert!((level2_at.unwrap() - 9.0).abs() < 0.06);
    }

    #[test]
    fn test_recovery() {
        let mut engine = quick_activation();
        activate(&mut engine, 0.0);
        let mut recovered = None;
        for i in 0..=70 {
            let t = 1.0 + i as f64 * 0.1;
            if let Some(tr) = engine.update(input(t, DriverState::Alert)).transition {
                recovered = Some(tr);
            }
        }
        let tr = recovered.unwrap();
        assert_eq!(tr.reason, TriggerReason::Recovered);
        assert!((tr.timestamp - 6.0).abs() < 1e-6);
        assert_eq!(engine.state(), AlertState::default());
    }

    #[test]
    fn test_yawning_blocks_recovery() {
        let mut engine = quick_activation();
        let mut out = None;
        for t in [0.0, SHORT_HOLD] {
            out = Some(engine.update(AlertInput {
                yawn_risk: YawnRisk::High,
                ..input(t, DriverState::Alert)
            }));
        }
        assert_eq!(out.unwrap().transition.unwrap().reason, TriggerReason::YawnFrequency);

        for i in 2..=100 {
            engine.update(AlertInput {
                yawn_risk: YawnRisk::Moderate,
                ..input(i as f64 * 0.1, DriverState::Alert)
            });
        }
        assert_ne!(engine.level(), AlertLevel::None);
    }

    #[test]
    fn test_no_face_holds_level() {
        let mut engine = quick_activation();
        activate(&mut engine, 0.0);
        for i in 1..=200 {
            let out = engine.update(input(i as f64 * 0.1, DriverState::NoFace));
            assert!(out.transition.is_none());
        }
        assert_eq!(engine.level(), AlertLevel::Level1);
    }

    #[test]
    fn test_manual_reset_from_level2() {
        let mut engine = quick_activation();
        for t in [0.0, 1.0, 2.0] {
            activate(&mut engine, t);
        }
        assert_eq!(engine.level(), AlertLevel::Level2);

        let tr = engine.manual_reset(2.5).unwrap();
        assert_eq!(tr.reason, TriggerReason::ManualReset);
        assert_eq!(tr.from, AlertLevel::Level2);
        assert_eq!(engine.level(), AlertLevel::None);
        assert!(engine.state().level1_trigger_history.is_empty());
        assert!(engine.manual_reset(2.6).is_none());
    }

    #[test]
    fn test_requested_reset_applies_on_next_update() {
        let mut engine = quick_activation();
        activate(&mut engine, 0.0);
        engine.request_reset();
        assert_eq!(engine.level(), AlertLevel::Level1);

        // Symptoms on the reset tick are not evaluated
        let out = engine.update(input(1.0, DriverState::Drowsy));
        assert_eq!(out.transition.unwrap().reason, TriggerReason::ManualReset);
        assert_eq!(out.level, AlertLevel::None);
        assert!(out.pulse.is_none());

        engine.update(input(1.1, DriverState::Drowsy));
        let out = engine.update(input(1.25, DriverState::Drowsy));
        assert_eq!(out.level, AlertLevel::Level1);
    }

    #[test]
    fn test_pulse_cadence() {
        let mut engine = quick_activation();
        let mut pulses = Vec::new();
        for i in 0..=41 {
            let state = if i <= 1 { DriverState::Drowsy } else { DriverState::NoFace };
            pulses.extend(engine.update(input(i as f64 * 0.25, state)).pulse);
        }
        let times: Vec<f64> = pulses.iter().map(|p| p.timestamp).collect();
        assert_eq!(times, vec![0.25, 2.25, 4.25, 6.25, 8.25, 10.25]);
        assert_eq!(pulses[0].sequence, 1);
        assert_eq!(pulses[5].sequence, 6);
    }

    #[test]
    fn test_level2_pulses_faster() {
        let mut engine = quick_activation();
        for t in [0.0, 1.0, 2.0] {
            activate(&mut engine, t);
        }
        let mut count = 0;
        for i in 1..=8 {
            let out = engine.update(input(2.0 + i as f64 * 0.25, DriverState::NoFace));
            count += usize::from(out.pulse.is_some());
        }
        // Entry pulse at 2.0, then every 0.5 s
        assert_eq!(count, 4);
    }

    #[test]
    fn test_non_monotonic_ignored() {
        let mut engine = quick_activation();
        activate(&mut engine, 5.0);
        let out = engine.update(input(1.0, DriverState::Alert));
        assert_eq!(out.level, AlertLevel::Level1);
        assert!(out.transition.is_none() && out.pulse.is_none());
    }

    #[test]
    fn test_invalid_config() {
        let config = AlertConfig {
            level2_window_seconds: 0.0,
            ..Default::default()
        };
        assert!(AlertEngine::new(config).is_err());
    }

    #[test]
    fn test_zero_activation_duration_rejected() {
        // Would turn every symptomatic frame into an activation
        let config = AlertConfig {
            level1_duration_seconds: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            AlertEngine::new(config),
            Err(AlertError::Config(ValidationError::NotPositive {
                field: "level1_duration_seconds",
                ..
            }))
        ));
    }

    fn any_state() -> impl Strategy<Value = DriverState> {
        prop_oneof![
            Just(DriverState::Alert),
            Just(DriverState::SlightlyDrowsy),
            Just(DriverState::Drowsy),
            Just(DriverState::VeryDrowsy),
            Just(DriverState::Inattentive),
            Just(DriverState::NoFace),
        ]
    }

    fn any_risk() -> impl Strategy<Value = YawnRisk> {
        prop_oneof![
            Just(YawnRisk::Normal),
            Just(YawnRisk::Moderate),
            Just(YawnRisk::High),
            Just(YawnRisk::Critical),
        ]
    }

    proptest! {
        #[test]
        fn engine_is_robust(
            ticks in prop::collection::vec((-0.5f64..3.0, any_state(), any_risk(), any::<bool>()), 1..300)
        ) {
            let mut engine = AlertEngine::new(AlertConfig::default()).unwrap();
            let mut t = 0.0;
            let mut prev = engine.level();
            for (dt, state, yawn_risk, reset) in ticks {
                t += dt;
                if reset {
                    engine.request_reset();
                }
                let out = engine.update(AlertInput { yawn_risk, ..input(t, state) });
                if let Some(tr) = out.transition {
                    prop_assert_eq!(tr.from, prev);
                    prop_assert_eq!(tr.to, out.level);
                } else {
                    prop_assert_eq!(out.level, prev);
                }
                if out.level == AlertLevel::Level2 && prev != AlertLevel::Level2 {
                    prop_assert!(engine.state().level1_trigger_history.len() >= 3);
                }
                if out.level == AlertLevel::None {
                    prop_assert!(out.pulse.is_none());
                }
                prev = out.level;
            }
        }

        #[test]
        fn all_absent_never_alerts(n in 1usize..500) {
            let mut engine = AlertEngine::new(AlertConfig::default()).unwrap();
            for i in 0..n {
                let out = engine.update(input(i as f64 * 0.033, DriverState::NoFace));
                prop_assert_eq!(out.level, AlertLevel::None);
            }
        }
    }
}
