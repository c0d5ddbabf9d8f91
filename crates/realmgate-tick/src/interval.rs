//! Per-task countdown timers.

use std::time::Duration;

/// A countdown for one periodic obligation.
///
/// The world advances every timer once per tick by the elapsed wall-clock
/// milliseconds; when the remaining time reaches zero or below the owner
/// resets the timer and fires the task.
///
/// [`reset`](Self::reset) adds the period back onto whatever remains, so an
/// overshoot of a few milliseconds shortens the next cycle instead of being
/// lost — periods stay drift-free across many firings. A stall longer than a
/// full extra period clamps to zero instead: the task fires once to catch up
/// and then realigns, rather than replaying the whole backlog in a burst.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    /// The configured period, in milliseconds.
    interval: u64,
    /// Milliseconds until the next firing. Negative = overdue.
    remaining: i64,
}

impl IntervalTimer {
    /// Creates a timer that first fires after one full `interval`.
    pub fn new(interval: Duration) -> Self {
        let interval = interval.as_millis() as u64;
        Self {
            interval,
            remaining: interval as i64,
        }
    }

    /// Counts down by `elapsed_ms`.
    pub fn advance(&mut self, elapsed_ms: u64) {
        self.remaining -= elapsed_ms as i64;
    }

    /// Whether the timer is due (remaining time at or below zero).
    pub fn elapsed(&self) -> bool {
        self.remaining <= 0
    }

    /// Re-arms the timer for the next cycle, preserving overshoot up to one
    /// full period. Call after observing [`elapsed`](Self::elapsed).
    pub fn reset(&mut self) {
        self.remaining += self.interval as i64;
        if self.remaining < 0 {
            // Stalled for more than a whole extra period: drop the backlog.
            self.remaining = 0;
        }
    }

    /// Replaces the period and restarts the countdown from it. Used by
    /// tasks whose next firing is computed, not fixed (event windows,
    /// maintenance checks).
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval.as_millis() as u64;
        self.remaining = self.interval as i64;
    }

    /// The configured period.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval)
    }

    /// Milliseconds until the next firing (negative when overdue).
    pub fn remaining_ms(&self) -> i64 {
        self.remaining
    }
}
