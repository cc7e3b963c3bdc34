//! Moving Average and EWMA Smoothing

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed-length moving average over the most recent samples
///
/// Until the window is full the average is taken over the samples seen so far.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: Vec<f64>,
    size: usize,
    position: usize,
    filled: bool,
    sum: f64,
}

impl MovingAverage {
    /// Create a moving average over `size` samples (a size of 0 is treated as 1)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            window: vec![0.0; size],
            size,
            position: 0,
            filled: false,
            sum: 0.0,
        }
    }

    /// Add a value and get the smoothed output
    ///
    /// Non-finite values are skipped and the current average is returned.
    pub fn update(&mut self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            debug!("Skipping non-finite sample in moving average");
            return self.value();
        }

        if self.filled {
            self.sum -= self.window[self.position];
        }
        self.window[self.position] = value;
        self.sum += value;
        self.position = (self.position + 1) % self.size;

        if self.position == 0 {
            self.filled = true;
            // Re-sum once per lap so floating point drift cannot accumulate
            self.sum = self.window.iter().sum();
        }

        self.value()
    }

    /// Current smoothed value, `None` before the first sample
    pub fn value(&self) -> Option<f64> {
        let count = self.len();
        if count == 0 {
            None
        } else {
            Some(self.sum / count as f64)
        }
    }

    /// Number of samples currently averaged
    pub fn len(&self) -> usize {
        if self.filled {
            self.size
        } else {
            self.position
        }
    }

    /// Check if no sample has been seen
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reset the filter
    pub fn reset(&mut self) {
        self.window.fill(0.0);
        self.position = 0;
        self.filled = false;
        self.sum = 0.0;
    }
}

/// Exponentially weighted moving average
#[derive(Debug, Clone)]
pub struct Ewma {
    /// Current estimate
    value: Option<f64>,
    /// Smoothing factor (0-1, higher = more weight on recent)
    alpha: f64,
}

impl Ewma {
    /// Create a new EWMA with the given smoothing factor
    pub fn new(alpha: f64) -> Self {
        Self {
            value: None,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Add a value and get the smoothed output
    pub fn update(&mut self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return self.value;
        }
        let next = match self.value {
            Some(current) => current + self.alpha * (value - current),
            None => value,
        };
        self.value = Some(next);
        self.value
    }

    /// Current smoothed value
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Reset the estimate
    pub fn reset(&mut self) {
        self.value = None;
    }
}

/// Smoothing method selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SmoothingKind {
    /// Plain average of the last `frames` samples
    MovingAverage { frames: usize },
    /// Exponential smoothing with factor `alpha`
    Exponential { alpha: f64 },
}

impl Default for SmoothingKind {
    fn default() -> Self {
        SmoothingKind::MovingAverage { frames: 5 }
    }
}

/// Runtime smoother built from a [`SmoothingKind`]
#[derive(Debug, Clone)]
pub enum Smoother {
    Moving(MovingAverage),
    Exponential(Ewma),
}

impl Smoother {
    /// Build a smoother for the configured method
    pub fn new(kind: SmoothingKind) -> Self {
        match kind {
            SmoothingKind::MovingAverage { frames } => Smoother::Moving(MovingAverage::new(frames)),
            SmoothingKind::Exponential { alpha } => Smoother::Exponential(Ewma::new(alpha)),
        }
    }

    /// Add a value and get the smoothed output
    pub fn update(&mut self, value: f64) -> Option<f64> {
        match self {
            Smoother::Moving(avg) => avg.update(value),
            Smoother::Exponential(ewma) => ewma.update(value),
        }
    }

    /// Current smoothed value
    pub fn value(&self) -> Option<f64> {
        match self {
            Smoother::Moving(avg) => avg.value(),
            Smoother::Exponential(ewma) => ewma.value(),
        }
    }

    /// Reset the smoother
    pub fn reset(&mut self) {
        match self {
            Smoother::Moving(avg) => avg.reset(),
            Smoother::Exponential(ewma) => ewma.reset(),
        }
    }
}
