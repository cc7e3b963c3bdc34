//! PERCLOS: percentage of eye closure over a trailing window

use sliding_window::{TimeWindow, WindowError};
use tracing::warn;

/// Tracks closed/open eye samples over a trailing time window
///
/// The closed count is kept in step with pushes and evictions so `perclos()`
/// never rescans the window.
#[derive(Debug, Clone)]
pub struct PerclosTracker {
    samples: TimeWindow<bool>,
    closed: usize,
    closed_threshold: f64,
    min_span_seconds: f64,
}

impl PerclosTracker {
    pub fn new(window_seconds: f64, closed_threshold: f64, min_span_seconds: f64, max_rate_hz: f64) -> Self {
        Self {
            samples: TimeWindow::with_rate(window_seconds, max_rate_hz),
            closed: 0,
            closed_threshold,
            min_span_seconds,
        }
    }

    /// Record one EAR sample
    ///
    /// Out-of-order samples are dropped with a warning.
    pub fn update(&mut self, timestamp: f64, ear: f64) -> f64 {
        let is_closed = ear < self.closed_threshold;
        if let Err(e) = self.push(timestamp, is_closed) {
            warn!(timestamp, error = %e, "PERCLOS sample rejected");
        }
        self.perclos()
    }

    fn push(&mut self, timestamp: f64, is_closed: bool) -> Result<(), WindowError> {
        let closed = &mut self.closed;
        self.samples.push_evicting(timestamp, is_closed, |evicted| {
            if evicted.value {
                *closed = closed.saturating_sub(1);
            }
        })?;
        if is_closed {
            self.closed += 1;
        }

        let closed = &mut self.closed;
        self.samples.evict_expired(timestamp, |evicted| {
            if evicted.value {
                *closed = closed.saturating_sub(1);
            }
        });
        Ok(())
    }

    /// Closed share of the window (0-100), 0 when empty
    pub fn perclos(&self) -> f64 {
        let total = self.samples.len();
        if total == 0 {
            return 0.0;
        }
        (self.closed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Fraction of the window spanned by samples so far (0-1)
    pub fn coverage(&self) -> f64 {
        self.samples.coverage()
    }

    /// Whether enough history exists for the PERCLOS band to be trusted
    pub fn is_warmed_up(&self) -> bool {
        !self.samples.is_empty() && self.samples.span() >= self.min_span_seconds
    }

    pub fn closed_samples(&self) -> usize {
        self.closed
    }

    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.closed = 0;
    }
}
