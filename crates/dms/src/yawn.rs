//! Yawn detection from the lip aspect ratio

use crate::state::YawnRisk;
use signal_filter::{ConsecutiveDebouncer, Smoother, SmoothingKind};
use sliding_window::TimeWindow;
use tracing::{debug, info};

/// Yawn analyzer settings
#[derive(Debug, Clone, Copy)]
pub struct YawnSettings {
    pub lar_threshold: f64,
    pub smoothing: SmoothingKind,
    pub consecutive_frames: usize,
    pub min_duration_seconds: f64,
    pub window_seconds: f64,
    pub moderate_per_minute: f64,
    pub high_per_minute: f64,
    pub critical_per_minute: f64,
    pub max_frame_gap_seconds: f64,
}

/// A completed yawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YawnEvent {
    pub start_time: f64,
    pub end_time: f64,
}

impl YawnEvent {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Smoothed, debounced mouth-open tracker with a rolling yawn window
#[derive(Debug, Clone)]
pub struct YawnAnalyzer {
    settings: YawnSettings,
    smoother: Smoother,
    debouncer: ConsecutiveDebouncer,
    /// First frame of the current raw open streak
    streak_start: Option<f64>,
    /// Start of the confirmed mouth-open episode
    open_since: Option<f64>,
    last_sample: Option<f64>,
    /// Yawn durations keyed by yawn end time
    yawns: TimeWindow<f64>,
    smoothed_lar: Option<f64>,
}

impl YawnAnalyzer {
    pub fn new(settings: YawnSettings) -> Self {
        Self {
            settings,
            smoother: Smoother::new(settings.smoothing),
            debouncer: ConsecutiveDebouncer::new(settings.consecutive_frames),
            streak_start: None,
            open_since: None,
            last_sample: None,
            // A yawn takes at least a second, so a 1 Hz budget bounds the window
            yawns: TimeWindow::with_rate(settings.window_seconds, 1.0),
            smoothed_lar: None,
        }
    }

    /// Feed one LAR sample, returning the yawn that ended on this sample
    ///
    /// An absent LAR only ages the window.
    pub fn update(&mut self, timestamp: f64, lar: Option<f64>) -> Option<YawnEvent> {
        if self.last_sample.is_some_and(|last| timestamp < last) {
            return None;
        }
        self.yawns.advance(timestamp);
        let lar = lar.filter(|v| v.is_finite())?;

        if self
            .last_sample
            .is_some_and(|last| timestamp - last > self.settings.max_frame_gap_seconds)
        {
            if let Some(since) = self.open_since {
                debug!(open_since = since, "Frame gap, abandoning mouth-open episode");
            }
            self.abandon();
        }
        self.last_sample = Some(timestamp);

        let smoothed = self.smoother.update(lar);
        self.smoothed_lar = smoothed;
        let raw_open = smoothed.is_some_and(|v| v > self.settings.lar_threshold);

        if raw_open && self.streak_start.is_none() {
            self.streak_start = Some(timestamp);
        } else if !raw_open {
            self.streak_start = None;
        }

        let confirmed = self.debouncer.update(raw_open);
        if confirmed {
            if self.open_since.is_none() {
                self.open_since = self.streak_start.or(Some(timestamp));
            }
            return None;
        }

        let since = self.open_since.take()?;
        let event = YawnEvent {
            start_time: since,
            end_time: timestamp,
        };
        if event.duration() < self.settings.min_duration_seconds {
            debug!(duration = event.duration(), "Mouth opening too short for a yawn");
            return None;
        }
        if self.yawns.push(timestamp, event.duration()).is_err() {
            return None;
        }
        info!(
            duration = event.duration(),
            frequency = self.yawn_frequency(),
            "Yawn detected"
        );
        Some(event)
    }

    fn abandon(&mut self) {
        self.smoother.reset();
        self.debouncer.reset();
        self.streak_start = None;
        self.open_since = None;
        self.smoothed_lar = None;
    }

    /// Yawns within the window
    pub fn yawn_count(&self) -> usize {
        self.yawns.len()
    }

    /// Yawns per minute over the window
    pub fn yawn_frequency(&self) -> f64 {
        self.yawns.len() as f64 * 60.0 / self.settings.window_seconds
    }

    pub fn risk(&self) -> YawnRisk {
        let freq = self.yawn_frequency();
        let s = &self.settings;
        if freq >= s.critical_per_minute {
            YawnRisk::Critical
        } else if freq >= s.high_per_minute {
            YawnRisk::High
        } else if freq >= s.moderate_per_minute {
            YawnRisk::Moderate
        } else {
            YawnRisk::Normal
        }
    }

    /// Length of the mouth-open episode in progress (0 when closed)
    pub fn current_yawn_duration(&self, now: f64) -> f64 {
        self.open_since.map_or(0.0, |since| (now - since).max(0.0))
    }

    /// Mouth open for at least the minimum yawn duration
    pub fn is_yawning(&self, now: f64) -> bool {
        self.open_since.is_some() && self.current_yawn_duration(now) >= self.settings.min_duration_seconds
    }

    pub fn smoothed_lar(&self) -> Option<f64> {
        self.smoothed_lar
    }

    pub fn reset(&mut self) {
        self.abandon();
        self.last_sample = None;
        self.yawns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOSED: f64 = 0.2;
    const OPEN: f64 = 0.9;

    fn settings() -> YawnSettings {
        YawnSettings {
            lar_threshold: 0.65,
            smoothing: SmoothingKind::MovingAverage { frames: 5 },
            consecutive_frames: 3,
            min_duration_seconds: 1.5,
            window_seconds: 60.0,
            moderate_per_minute: 2.0,
            high_per_minute: 3.0,
            critical_per_minute: 4.0,
            max_frame_gap_seconds: 1.0,
        }
    }

    fn feed(a: &mut YawnAnalyzer, start: f64, end: f64, lar: f64) -> Vec<YawnEvent> {
        let mut events = Vec::new();
        let mut i = 0;
        loop {
            let ts = start + i as f64 / 30.0;
            if ts >= end - 1e-9 {
                break;
            }
            events.extend(a.update(ts, Some(lar)));
            i += 1;
        }
        events
    }

    fn yawn_at(a: &mut YawnAnalyzer, t: f64) -> Vec<YawnEvent> {
        let mut events = feed(a, t, t + 2.5, OPEN);
        events.extend(feed(a, t + 2.5, t + 5.0, CLOSED));
        events
    }

    #[test]
    fn test_yawn_detected() {
        let mut a = YawnAnalyzer::new(settings());
        feed(&mut a, 0.0, 1.0, CLOSED);
        let events = yawn_at(&mut a, 1.0);
        assert_eq!(events.len(), 1);
        assert!(events[0].duration() >= 1.5);
        assert_eq!(a.yawn_count(), 1);
        assert_eq!(a.risk(), YawnRisk::Normal);
    }

    #[test]
    fn test_yawning_reported_after_min_duration() {
        let mut a = YawnAnalyzer::new(settings());
        feed(&mut a, 0.0, 1.0, CLOSED);
        feed(&mut a, 1.0, 2.0, OPEN);
        assert!(!a.is_yawning(2.0));
        assert!(a.current_yawn_duration(2.0) > 0.0);
        feed(&mut a, 2.0, 3.0, OPEN);
        assert!(a.is_yawning(3.0));
    }

    #[test]
    fn test_short_opening_not_a_yawn() {
        let mut a = YawnAnalyzer::new(settings());
        feed(&mut a, 0.0, 1.0, CLOSED);
        let mut events = feed(&mut a, 1.0, 1.8, OPEN);
        events.extend(feed(&mut a, 1.8, 3.0, CLOSED));
        assert!(events.is_empty());
        assert_eq!(a.yawn_count(), 0);
    }

    #[test]
    fn test_flapping_mouth_debounced() {
        let mut a = YawnAnalyzer::new(YawnSettings {
            smoothing: SmoothingKind::MovingAverage { frames: 1 },
            ..settings()
        });
        for i in 0..90 {
            let lar = if i % 2 == 0 { OPEN } else { CLOSED };
            a.update(i as f64 / 30.0, Some(lar));
        }
        assert_eq!(a.current_yawn_duration(3.0), 0.0);
        assert_eq!(a.yawn_count(), 0);
    }

    #[test]
    fn test_risk_bands() {
        let mut a = YawnAnalyzer::new(settings());
        for k in 0..4 {
            yawn_at(&mut a, k as f64 * 5.0);
            let expected = match k {
                0 => YawnRisk::Normal,
                1 => YawnRisk::Moderate,
                2 => YawnRisk::High,
                _ => YawnRisk::Critical,
            };
            assert_eq!(a.risk(), expected);
        }
        assert_eq!(a.yawn_frequency(), 4.0);

        // Window expiry lowers the risk again
        feed(&mut a, 20.0, 90.0, CLOSED);
        assert_eq!(a.yawn_count(), 0);
        assert_eq!(a.risk(), YawnRisk::Normal);
    }

    #[test]
    fn test_absent_lar_keeps_episode() {
        let mut a = YawnAnalyzer::new(settings());
        feed(&mut a, 0.0, 1.0, OPEN);
        let before = a.current_yawn_duration(1.0);
        assert!(a.update(1.0, None).is_none());
        assert!(a.current_yawn_duration(1.0) >= before);
    }
}
