//! Drowsiness Monitor
//!
//! Wires the DMS trackers and the alert engine into a single-threaded tick:
//! - `DrowsinessMonitor::tick` turns one frame into one `TickRecord`
//! - `ResetHandle` requests a manual alert reset from any thread
//! - `SinkHub` fans records and pulses out to consumers without blocking
//! - `MonitorConfig::load` layers defaults, a config file and environment

pub mod config;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod telemetry;

pub use config::{MonitorConfig, SinkConfig};
pub use error::MonitorError;
pub use pipeline::{DrowsinessMonitor, ResetHandle, TickRecord};
pub use sink::{SinkHub, SinkStats};
