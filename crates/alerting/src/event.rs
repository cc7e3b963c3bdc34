//! Alert levels, transitions and pulses

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alert escalation level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    #[default]
    None,
    Level1,
    Level2,
}

impl AlertLevel {
    pub fn is_active(&self) -> bool {
        !matches!(self, AlertLevel::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::None => "NONE",
            AlertLevel::Level1 => "LEVEL1",
            AlertLevel::Level2 => "LEVEL2",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a transition happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    DrowsinessSymptoms,
    YawnFrequency,
    SymptomsAndYawning,
    RepeatedActivations,
    Recovered,
    ManualReset,
}

/// One level change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertTransition {
    pub from: AlertLevel,
    pub to: AlertLevel,
    pub reason: TriggerReason,
    /// Drowsiness score on the deciding tick
    pub score: f64,
    /// PERCLOS on the deciding tick
    pub perclos: f64,
    pub timestamp: f64,
}

/// Periodic reminder emitted while an alert is active
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertPulse {
    pub level: AlertLevel,
    pub timestamp: f64,
    /// Increments with every pulse of the session
    pub sequence: u64,
}

/// Read-only view of the escalation state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertState {
    pub level: AlertLevel,
    /// When Level 1 was entered
    pub level1_start_time: Option<f64>,
    /// Activation timestamps inside the escalation window
    pub level1_trigger_history: Vec<f64>,
    /// When Level 2 was entered
    pub level2_since: Option<f64>,
}
