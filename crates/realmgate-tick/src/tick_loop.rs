//! The paced driver for the world update.
//!
//! One `TickLoop` drives one world. It wakes at a fixed interval and
//! reports *real* elapsed time — the world update consumes wall-clock
//! deltas, not a fixed dt, because its interval timers and shutdown
//! countdown are specified in wall time.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, warn};

/// Configuration for the tick loop.
#[derive(Debug, Clone)]
pub struct TickLoopConfig {
    /// Target interval between ticks, in milliseconds.
    pub interval_ms: u64,
    /// Budget warning threshold (0.0–1.0): a warning is logged when one
    /// update consumes more than this fraction of the interval.
    pub budget_warn_threshold: f64,
    /// Random jitter (0–max µs) added to the first tick so several worlds
    /// started at the same instant don't wake in lockstep.
    pub initial_jitter_us: u64,
}

impl Default for TickLoopConfig {
    fn default() -> Self {
        Self {
            interval_ms: 50,
            budget_warn_threshold: 0.80,
            initial_jitter_us: 2_000,
        }
    }
}

impl TickLoopConfig {
    /// Shortest supported interval.
    pub const MIN_INTERVAL_MS: u64 = 10;

    /// Clamps out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        if self.interval_ms < Self::MIN_INTERVAL_MS {
            warn!(
                interval_ms = self.interval_ms,
                min = Self::MIN_INTERVAL_MS,
                "tick interval below minimum, clamping"
            );
            self.interval_ms = Self::MIN_INTERVAL_MS;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }
}

/// Fixed-rate async pacer.
///
/// ```ignore
/// let mut pacer = TickLoop::new(TickLoopConfig::default());
/// loop {
///     let elapsed_ms = pacer.wait().await;
///     world.update(elapsed_ms);
///     pacer.record_tick_end();
/// }
/// ```
pub struct TickLoop {
    config: TickLoopConfig,
    interval: Duration,
    tick_count: u64,
    /// When the next tick should fire.
    next_tick: TokioInstant,
    /// Instant of the previous wake, for elapsed reporting.
    last_wake: Option<TokioInstant>,
    /// Start of the current update, consumed by `record_tick_end`.
    tick_start: Option<Instant>,
}

impl TickLoop {
    /// Creates a pacer; the first tick fires after one interval plus
    /// jitter.
    pub fn new(config: TickLoopConfig) -> Self {
        let config = config.validated();
        let interval = Duration::from_millis(config.interval_ms);

        let jitter = if config.initial_jitter_us > 0 {
            Duration::from_micros(rand::rng().random_range(0..config.initial_jitter_us))
        } else {
            Duration::ZERO
        };

        debug!(interval_ms = config.interval_ms, "tick loop created");

        Self {
            next_tick: TokioInstant::now() + interval + jitter,
            config,
            interval,
            tick_count: 0,
            last_wake: None,
            tick_start: None,
        }
    }

    /// Sleeps until the next tick is due, then returns the real elapsed
    /// milliseconds since the previous wake (one interval on the first
    /// tick).
    pub async fn wait(&mut self) -> u64 {
        time::sleep_until(self.next_tick).await;

        let woke = TokioInstant::now();
        self.tick_count += 1;

        // Overrun: schedule from now rather than replaying missed ticks.
        let late_by = woke.saturating_duration_since(self.next_tick);
        if late_by > self.interval {
            warn!(
                tick = self.tick_count,
                late_ms = late_by.as_millis() as u64,
                "tick overrun, skipping ahead"
            );
            self.next_tick = woke + self.interval;
        } else {
            self.next_tick += self.interval;
        }

        let elapsed = match self.last_wake.replace(woke) {
            Some(prev) => woke.saturating_duration_since(prev),
            None => self.interval,
        };
        self.tick_start = Some(Instant::now());

        elapsed.as_millis() as u64
    }

    /// Records the end of the update started by the last
    /// [`wait`](Self::wait), logging a warning when the update ran past
    /// the budget threshold.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let spent = start.elapsed();
        let utilization = spent.as_secs_f64() / self.interval.as_secs_f64();
        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                spent_ms = spent.as_millis() as u64,
                budget_ms = self.config.interval_ms,
                "world update approaching tick budget"
            );
        }
    }

    /// Ticks completed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The target interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
