use std::time::{Duration, Instant};

/// A transient flag that switches itself off a fixed time after the latest trigger.
///
/// The deadline lives in the value, so dropping or resetting it cancels the
/// pending clear. Triggering again restarts the countdown.
#[derive(Debug, Clone)]
pub struct FeedbackTimer {
    /// How long the flag stays on
    duration: Duration,
    /// When the flag turns off, if it is on
    deadline: Option<Instant>,
}

impl FeedbackTimer {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration: Duration::from_millis(duration_ms),
            deadline: None,
        }
    }

    /// Turn the flag on, restarting the countdown
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.duration);
    }

    /// Advance to `now`; returns true if the flag just turned off
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left before the flag clears
    pub fn time_remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Cancel any pending clear and turn the flag off
    pub fn reset(&mut self) {
        self.deadline = None;
    }
}
