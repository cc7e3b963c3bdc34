//! Time-Bounded Sliding Window
//!
//! Provides the ordered, evicting sample window shared by every per-frame
//! tracker (PERCLOS, blinks, microsleeps, yawns, alert escalation history).

mod window;

pub use window::{Sample, TimeWindow, DEFAULT_MAX_RATE_HZ};

use thiserror::Error;

/// Errors raised when a sample cannot enter a window
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum WindowError {
    /// Sample is older than the newest sample already held
    #[error("sample at {timestamp:.3}s is older than latest sample at {latest:.3}s")]
    OutOfOrder { timestamp: f64, latest: f64 },

    /// Timestamp is NaN or infinite
    #[error("sample timestamp is not finite")]
    NonFinite,
}
