//! Blink and microsleep detection from the eye aspect ratio

use serde::{Deserialize, Serialize};
use sliding_window::TimeWindow;
use tracing::{debug, info};

/// How a completed eye closure was counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureKind {
    /// Too short to be a blink
    Jitter,
    /// Normal blink, entered the blink window
    Blink,
    /// Blink-length closure too soon after the previous blink
    Suppressed,
    /// Long closure, counted as a microsleep
    Microsleep,
    /// Longer than a blink but short of a microsleep
    Prolonged,
}

/// One completed eye closure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeClosureEvent {
    pub start_time: f64,
    pub end_time: f64,
    pub kind: ClosureKind,
}

impl EyeClosureEvent {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EyePhase {
    Open,
    Closed { since: f64, microsleep_counted: bool },
}

/// Blink analyzer settings
#[derive(Debug, Clone, Copy)]
pub struct BlinkSettings {
    pub closed_threshold: f64,
    pub window_seconds: f64,
    pub min_blink_seconds: f64,
    pub max_blink_seconds: f64,
    pub min_interval_seconds: f64,
    pub microsleep_seconds: f64,
    pub max_frame_gap_seconds: f64,
    pub max_rate_hz: f64,
}

/// Open/closed eye state machine producing blink and microsleep statistics
#[derive(Debug, Clone)]
pub struct BlinkAnalyzer {
    settings: BlinkSettings,
    phase: EyePhase,
    last_sample: Option<f64>,
    /// Blink durations keyed by blink end time
    blinks: TimeWindow<f64>,
    blink_duration_sum: f64,
    last_blink_end: Option<f64>,
    /// Closure start times keyed by the time the microsleep was counted
    microsleeps: TimeWindow<f64>,
    total_microsleeps: u64,
}

impl BlinkAnalyzer {
    pub fn new(settings: BlinkSettings) -> Self {
        let blinks = TimeWindow::with_rate(settings.window_seconds, settings.max_rate_hz);
        let microsleeps = TimeWindow::with_rate(settings.window_seconds, settings.max_rate_hz);
        Self {
            settings,
            phase: EyePhase::Open,
            last_sample: None,
            blinks,
            blink_duration_sum: 0.0,
            last_blink_end: None,
            microsleeps,
            total_microsleeps: 0,
        }
    }

    /// Feed one EAR sample, returning the closure that ended on this sample
    pub fn update(&mut self, timestamp: f64, ear: f64) -> Option<EyeClosureEvent> {
        if self.last_sample.is_some_and(|last| timestamp < last) {
            return None;
        }
        if let (Some(last), EyePhase::Closed { since, .. }) = (self.last_sample, self.phase) {
            if timestamp - last > self.settings.max_frame_gap_seconds {
                debug!(
                    closed_since = since,
                    gap = timestamp - last,
                    "Frame gap, abandoning eye closure"
                );
                self.phase = EyePhase::Open;
            }
        }
        self.last_sample = Some(timestamp);
        self.evict(timestamp);

        let closed = ear < self.settings.closed_threshold;
        match (self.phase, closed) {
            (EyePhase::Open, true) => {
                self.phase = EyePhase::Closed {
                    since: timestamp,
                    microsleep_counted: false,
                };
                None
            }
            (EyePhase::Closed { since, microsleep_counted }, true) => {
                if !microsleep_counted && timestamp - since >= self.settings.microsleep_seconds {
                    self.record_microsleep(since, timestamp);
                    self.phase = EyePhase::Closed {
                        since,
                        microsleep_counted: true,
                    };
                }
                None
            }
            (EyePhase::Closed { since, microsleep_counted }, false) => {
                self.phase = EyePhase::Open;
                Some(self.complete(since, timestamp, microsleep_counted))
            }
            (EyePhase::Open, false) => None,
        }
    }

    fn complete(&mut self, start_time: f64, end_time: f64, microsleep_counted: bool) -> EyeClosureEvent {
        let duration = end_time - start_time;
        let s = &self.settings;

        let kind = if microsleep_counted || duration >= s.microsleep_seconds {
            if !microsleep_counted {
                self.record_microsleep(start_time, end_time);
            }
            ClosureKind::Microsleep
        } else if duration < s.min_blink_seconds {
            ClosureKind::Jitter
        } else if duration > s.max_blink_seconds {
            ClosureKind::Prolonged
        } else if self
            .last_blink_end
            .is_some_and(|prev| end_time - prev < s.min_interval_seconds)
        {
            ClosureKind::Suppressed
        } else {
            if self.blinks.push(end_time, duration).is_ok() {
                self.blink_duration_sum += duration;
            }
            self.last_blink_end = Some(end_time);
            ClosureKind::Blink
        };

        EyeClosureEvent {
            start_time,
            end_time,
            kind,
        }
    }

    fn record_microsleep(&mut self, start_time: f64, at: f64) {
        if self.microsleeps.push(at, start_time).is_ok() {
            self.total_microsleeps += 1;
            info!(
                closed_since = start_time,
                duration = at - start_time,
                total = self.total_microsleeps,
                "Microsleep detected"
            );
        }
    }

    fn evict(&mut self, now: f64) {
        let sum = &mut self.blink_duration_sum;
        self.blinks.evict_expired(now, |expired| *sum -= expired.value);
        if self.blinks.is_empty() {
            // Clear accumulated rounding error
            self.blink_duration_sum = 0.0;
        }
        self.microsleeps.advance(now);
    }

    /// Completed blinks per minute over the window
    pub fn blink_rate(&self) -> f64 {
        self.blinks.len() as f64 * 60.0 / self.settings.window_seconds
    }

    pub fn blink_count(&self) -> usize {
        self.blinks.len()
    }

    /// Mean duration of windowed blinks, 0 when none
    pub fn average_blink_duration(&self) -> f64 {
        if self.blinks.is_empty() {
            0.0
        } else {
            (self.blink_duration_sum / self.blinks.len() as f64).max(0.0)
        }
    }

    /// Microsleeps within the window
    pub fn microsleep_count(&self) -> usize {
        self.microsleeps.len()
    }

    /// Microsleeps since the last reset
    pub fn total_microsleeps(&self) -> u64 {
        self.total_microsleeps
    }

    /// Length of the closure still in progress at `now` (0 when open)
    pub fn current_closure_duration(&self, now: f64) -> f64 {
        match self.phase {
            EyePhase::Closed { since, .. } => (now - since).max(0.0),
            EyePhase::Open => 0.0,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.phase, EyePhase::Closed { .. })
    }

    pub fn reset(&mut self) {
        self.phase = EyePhase::Open;
        self.last_sample = None;
        self.blinks.clear();
        self.blink_duration_sum = 0.0;
        self.last_blink_end = None;
        self.microsleeps.clear();
        self.total_microsleeps = 0;
    }
}
