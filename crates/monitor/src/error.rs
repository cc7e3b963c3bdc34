//! Monitor error types

use alerting::AlertError;
use dms::DmsError;
use signal_filter::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("DMS error: {0}")]
    Dms(#[from] DmsError),

    #[error("Alert error: {0}")]
    Alert(#[from] AlertError),

    #[error("Configuration error: {0}")]
    Config(#[from] ValidationError),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
