//! Signal Conditioning and Validation
//!
//! Small reusable primitives for noisy per-frame signals:
//! - Moving average and EWMA smoothing
//! - Confirmed-after-N-consecutive debouncing
//! - Sustained-for-duration timers
//! - Range validation for configuration values

mod debounce;
mod error;
mod smoothing;
mod validator;

pub use debounce::{ConsecutiveDebouncer, SustainedCondition};
pub use error::ValidationError;
pub use smoothing::{Ewma, MovingAverage, Smoother, SmoothingKind};
pub use validator::{validate_fraction, validate_min, validate_positive, validate_range};
