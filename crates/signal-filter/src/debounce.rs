//! Debouncing Primitives

/// Confirms a boolean signal only after it holds for N consecutive samples
///
/// Rejects single-frame spikes: a streak is broken by any inactive sample.
#[derive(Debug, Clone)]
pub struct ConsecutiveDebouncer {
    required: usize,
    streak: usize,
}

impl ConsecutiveDebouncer {
    /// Create a debouncer requiring `required` consecutive active samples
    pub fn new(required: usize) -> Self {
        Self {
            required: required.max(1),
            streak: 0,
        }
    }

    /// Feed one sample, returning whether the signal is confirmed
    pub fn update(&mut self, active: bool) -> bool {
        if active {
            self.streak = self.streak.saturating_add(1);
        } else {
            self.streak = 0;
        }
        self.is_confirmed()
    }

    /// Whether the current streak reaches the requirement
    pub fn is_confirmed(&self) -> bool {
        self.streak >= self.required
    }

    /// Length of the current active streak
    pub fn streak(&self) -> usize {
        self.streak
    }

    /// Clear the streak
    pub fn reset(&mut self) {
        self.streak = 0;
    }
}

/// Tracks whether a condition has held continuously for a minimum duration
#[derive(Debug, Clone)]
pub struct SustainedCondition {
    /// Required hold time (seconds)
    duration: f64,
    /// Start of the current continuous hold
    since: Option<f64>,
}

impl SustainedCondition {
    /// Create a timer requiring `duration_seconds` of continuous hold
    pub fn new(duration_seconds: f64) -> Self {
        Self {
            duration: duration_seconds.max(0.0),
            since: None,
        }
    }

    /// Feed the condition at `now`, returning whether it is sustained
    pub fn update(&mut self, active: bool, now: f64) -> bool {
        if active {
            let since = *self.since.get_or_insert(now);
            now - since >= self.duration
        } else {
            self.since = None;
            false
        }
    }

    /// Whether the condition is currently sustained at `now`
    pub fn is_sustained(&self, now: f64) -> bool {
        self.since.is_some_and(|since| now - since >= self.duration)
    }

    /// How long the condition has held at `now` (0 if inactive)
    pub fn held_for(&self, now: f64) -> f64 {
        self.since.map_or(0.0, |since| (now - since).max(0.0))
    }

    /// Start of the current hold
    pub fn since(&self) -> Option<f64> {
        self.since
    }

    /// Required hold time (seconds)
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Forget any hold in progress
    pub fn reset(&mut self) {
        self.since = None;
    }
}
