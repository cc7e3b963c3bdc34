//! Sliding Window Implementation

use crate::WindowError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Highest frame rate a window is sized for when no rate is given (Hz)
pub const DEFAULT_MAX_RATE_HZ: f64 = 60.0;

/// A timestamped value held by a window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample<T> {
    /// Sample time (seconds)
    pub timestamp: f64,
    /// Sample payload
    pub value: T,
}

/// Ordered window of samples restricted to `[now - window, now]`
///
/// Samples must arrive with non-decreasing timestamps. Memory is bounded by a
/// hard capacity of `window × max_rate` samples; when the capacity is reached
/// the oldest sample is evicted even if it is still inside the time range.
#[derive(Debug, Clone)]
pub struct TimeWindow<T> {
    /// Samples, oldest first
    samples: VecDeque<Sample<T>>,
    /// Window length (seconds)
    window_seconds: f64,
    /// Hard sample bound
    capacity: usize,
    /// Total samples accepted (for statistics)
    total_pushed: usize,
}

impl<T> TimeWindow<T> {
    /// Create a window sized for the default maximum frame rate
    pub fn new(window_seconds: f64) -> Self {
        Self::with_rate(window_seconds, DEFAULT_MAX_RATE_HZ)
    }

    /// Create a window sized for `window_seconds × max_rate_hz` samples
    pub fn with_rate(window_seconds: f64, max_rate_hz: f64) -> Self {
        let window_seconds = window_seconds.max(0.0);
        let capacity = (window_seconds * max_rate_hz.max(1.0)).ceil() as usize + 1;
        Self::with_capacity(window_seconds, capacity)
    }

    /// Create a window with an explicit sample bound
    pub fn with_capacity(window_seconds: f64, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(4096)),
            window_seconds: window_seconds.max(0.0),
            capacity,
            total_pushed: 0,
        }
    }

    /// Append a sample, discarding the oldest one if the window is full
    pub fn push(&mut self, timestamp: f64, value: T) -> Result<(), WindowError> {
        self.push_evicting(timestamp, value, |_| {})
    }

    /// Append a sample, handing any capacity-evicted sample to `on_evict`
    pub fn push_evicting<F>(&mut self, timestamp: f64, value: T, mut on_evict: F) -> Result<(), WindowError>
    where
        F: FnMut(Sample<T>),
    {
        if !timestamp.is_finite() {
            return Err(WindowError::NonFinite);
        }
        if let Some(latest) = self.latest_timestamp() {
            if timestamp < latest {
                return Err(WindowError::OutOfOrder { timestamp, latest });
            }
        }

        while self.samples.len() >= self.capacity {
            match self.samples.pop_front() {
                Some(old) => on_evict(old),
                None => break,
            }
        }

        self.samples.push_back(Sample { timestamp, value });
        self.total_pushed += 1;
        Ok(())
    }

    /// Drop every sample older than `now - window`, handing each to `on_evict`
    ///
    /// Returns the number of evicted samples.
    pub fn evict_expired<F>(&mut self, now: f64, mut on_evict: F) -> usize
    where
        F: FnMut(Sample<T>),
    {
        let cutoff = now - self.window_seconds;
        let mut evicted = 0;
        while self.samples.front().is_some_and(|s| s.timestamp < cutoff) {
            if let Some(old) = self.samples.pop_front() {
                on_evict(old);
                evicted += 1;
            }
        }
        evicted
    }

    /// Drop every sample older than `now - window`
    pub fn advance(&mut self, now: f64) -> usize {
        self.evict_expired(now, |_| {})
    }

    /// Count samples inside `[now - window, now]` without mutating the window
    pub fn count_in_window(&self, now: f64) -> usize {
        let cutoff = now - self.window_seconds;
        self.samples
            .iter()
            .filter(|s| s.timestamp >= cutoff && s.timestamp <= now)
            .count()
    }

    /// Count samples at or after `since`
    pub fn count_since(&self, since: f64) -> usize {
        self.samples.iter().rev().take_while(|s| s.timestamp >= since).count()
    }

    /// Iterate samples, oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample<T>> {
        self.samples.iter()
    }

    /// Timestamps of held samples, oldest first
    pub fn timestamps(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.timestamp)
    }

    /// Newest sample
    pub fn latest(&self) -> Option<&Sample<T>> {
        self.samples.back()
    }

    /// Oldest sample
    pub fn oldest(&self) -> Option<&Sample<T>> {
        self.samples.front()
    }

    /// Timestamp of the newest sample
    pub fn latest_timestamp(&self) -> Option<f64> {
        self.samples.back().map(|s| s.timestamp)
    }

    /// Time between the oldest and newest sample (seconds)
    pub fn span(&self) -> f64 {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }

    /// Fraction of the window duration covered by held samples (0.0 to 1.0)
    pub fn coverage(&self) -> f64 {
        if self.window_seconds <= 0.0 {
            return if self.samples.is_empty() { 0.0 } else { 1.0 };
        }
        (self.span() / self.window_seconds).clamp(0.0, 1.0)
    }

    /// Number of held samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the window holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Hard sample bound
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Window length (seconds)
    pub fn window_seconds(&self) -> f64 {
        self.window_seconds
    }

    /// Total samples accepted since creation
    pub fn total_pushed(&self) -> usize {
        self.total_pushed
    }

    /// Remove all samples
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
