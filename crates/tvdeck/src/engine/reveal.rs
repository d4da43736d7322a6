use std::time::{Duration, Instant};

/// Cadence shared by every slide's progressive disclosure.
pub const REVEAL_INTERVAL: Duration = Duration::from_secs(2);

/// Fixed-cadence step counter for a slide's sections.
///
/// The step is derived from the moment the owning slide became active, so a
/// slide always starts from the top no matter how long it was shown before.
#[derive(Debug, Clone)]
pub struct RevealSequencer {
    step_count: usize,
    interval: Duration,
    started_at: Instant,
}

impl RevealSequencer {
    pub fn new(step_count: usize, now: Instant) -> Self {
        Self::with_interval(step_count, REVEAL_INTERVAL, now)
    }

    pub fn with_interval(step_count: usize, interval: Duration, now: Instant) -> Self {
        Self {
            step_count,
            interval: interval.max(Duration::from_millis(1)),
            started_at: now,
        }
    }

    /// Change how many steps the slide has without restarting its cadence.
    pub fn set_step_count(&mut self, step_count: usize) {
        self.step_count = step_count;
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Steps elapsed since the slide became active, capped at `step_count`.
    pub fn step(&self, now: Instant) -> usize {
        let elapsed = now.saturating_duration_since(self.started_at);
        let steps = elapsed.as_millis() / self.interval.as_millis();
        (steps as usize).min(self.step_count)
    }

    /// When the next step lands, or `None` once every section is visible.
    pub fn next_step_at(&self, now: Instant) -> Option<Instant> {
        let step = self.step(now);
        if step >= self.step_count {
            return None;
        }
        Some(self.started_at + self.interval * (step as u32 + 1))
    }
}

/// Whether a section that needs `min_step` is visible at `step`.
/// Hidden sections still take their space in the layout.
pub fn is_revealed(step: usize, min_step: usize) -> bool {
    step >= min_step
}
