//! Driver state and risk classifications

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete driver state derived each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverState {
    #[default]
    Alert,
    SlightlyDrowsy,
    Drowsy,
    VeryDrowsy,
    Inattentive,
    NoFace,
}

impl DriverState {
    /// Drowsiness severity (0 = alert, 3 = very drowsy)
    ///
    /// `Inattentive` and `NoFace` carry no drowsiness severity.
    pub fn drowsiness_rank(&self) -> u8 {
        match self {
            DriverState::Alert | DriverState::Inattentive | DriverState::NoFace => 0,
            DriverState::SlightlyDrowsy => 1,
            DriverState::Drowsy => 2,
            DriverState::VeryDrowsy => 3,
        }
    }

    /// States that count as a Level-1 alert symptom
    pub fn is_symptomatic(&self) -> bool {
        matches!(
            self,
            DriverState::SlightlyDrowsy
                | DriverState::Drowsy
                | DriverState::VeryDrowsy
                | DriverState::Inattentive
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriverState::Alert => "ALERT",
            DriverState::SlightlyDrowsy => "SLIGHTLY_DROWSY",
            DriverState::Drowsy => "DROWSY",
            DriverState::VeryDrowsy => "VERY_DROWSY",
            DriverState::Inattentive => "INATTENTIVE",
            DriverState::NoFace => "NO_FACE",
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Yawn frequency risk band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YawnRisk {
    #[default]
    Normal,
    Moderate,
    High,
    Critical,
}

/// Classification rule that decided the driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecidedBy {
    NoFace,
    HardOverride,
    Inattention,
    PerclosBand,
    #[default]
    ScoreBand,
}
