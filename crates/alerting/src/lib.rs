//! Alerting System
//!
//! Escalates sustained drowsiness symptoms into a two-level alert, emits
//! periodic alert pulses and reports every level transition.

mod escalation;
mod event;

pub use escalation::{AlertConfig, AlertEngine, AlertInput, AlertOutput};
pub use event::{AlertLevel, AlertPulse, AlertState, AlertTransition, TriggerReason};

use signal_filter::ValidationError;
use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    #[error("Configuration error: {0}")]
    Config(#[from] ValidationError),
}
