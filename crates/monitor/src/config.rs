//! Layered monitor configuration

use crate::error::MonitorError;
use alerting::AlertConfig;
use config::{Config, Environment, File};
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use signal_filter::{validate_positive, validate_range};
use std::path::Path;
use tracing::info;

/// Environment variable prefix, nested keys separated by `__`
///
/// `DROWSY__DMS__EAR_CLOSED_THRESHOLD=0.18` overrides `dms.ear_closed_threshold`.
pub const ENV_PREFIX: &str = "DROWSY";

/// Sink channel sizing and snapshot throttling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Tick records buffered per broadcast subscriber
    pub record_capacity: usize,
    /// Pulses buffered for the audio consumer
    pub pulse_capacity: usize,
    /// Snapshots buffered for the cloud consumer
    pub snapshot_capacity: usize,
    /// Minimum spacing of routine snapshots (seconds)
    pub snapshot_interval_seconds: f64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            record_capacity: 256,
            pulse_capacity: 64,
            snapshot_capacity: 64,
            snapshot_interval_seconds: 5.0,
        }
    }
}

impl SinkConfig {
    pub fn validate(&self) -> Result<(), MonitorError> {
        validate_range("sink.record_capacity", self.record_capacity as f64, 1.0, 1_000_000.0)?;
        validate_range("sink.pulse_capacity", self.pulse_capacity as f64, 1.0, 1_000_000.0)?;
        validate_range("sink.snapshot_capacity", self.snapshot_capacity as f64, 1.0, 1_000_000.0)?;
        validate_positive("sink.snapshot_interval_seconds", self.snapshot_interval_seconds)?;
        Ok(())
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub dms: DmsConfig,
    pub alert: AlertConfig,
    pub sink: SinkConfig,
}

impl MonitorConfig {
    /// Earlier detection
    pub fn strict() -> Self {
        Self {
            dms: DmsConfig::strict(),
            ..Default::default()
        }
    }

    /// Fewer false positives
    pub fn lenient() -> Self {
        Self {
            dms: DmsConfig::lenient(),
            ..Default::default()
        }
    }

    /// Load defaults, then an optional TOML/JSON file, then `DROWSY__*` variables
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let config: MonitorConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        info!(path = ?path, "Monitor configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        self.dms.validate().map_err(dms::DmsError::from)?;
        self.alert.validate()?;
        self.sink.validate()
    }
}
