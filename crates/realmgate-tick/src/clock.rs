//! The world's deterministic clock.

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds in a day, used for the maintenance-date arithmetic.
const DAY_SECS: u64 = 86_400;

/// The game-time clock.
///
/// Anchored to a unix timestamp at startup and advanced only by the
/// milliseconds the tick loop reports — the tick path never reads the wall
/// clock directly. [`advance`](Self::advance) returns the number of *whole*
/// seconds that rolled over, which is what drives the shutdown countdown:
/// sub-second ticks accumulate until a second boundary passes.
#[derive(Debug, Clone)]
pub struct GameClock {
    /// Unix seconds at server start.
    start_unix: u64,
    /// Milliseconds elapsed since start.
    elapsed_ms: u64,
}

impl GameClock {
    /// Creates a clock anchored to the current wall-clock time.
    pub fn new() -> Self {
        let start_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::anchored_at(start_unix)
    }

    /// Creates a clock anchored to an explicit unix timestamp. Tests use
    /// this for full determinism.
    pub fn anchored_at(start_unix: u64) -> Self {
        Self {
            start_unix,
            elapsed_ms: 0,
        }
    }

    /// Advances game time by `elapsed_ms` and returns how many whole
    /// seconds rolled over.
    pub fn advance(&mut self, elapsed_ms: u64) -> u64 {
        let before = self.elapsed_ms / 1_000;
        self.elapsed_ms += elapsed_ms;
        self.elapsed_ms / 1_000 - before
    }

    /// Current game time as unix seconds.
    pub fn now_unix(&self) -> u64 {
        self.start_unix + self.elapsed_ms / 1_000
    }

    /// Seconds the server has been up.
    pub fn uptime_secs(&self) -> u64 {
        self.elapsed_ms / 1_000
    }

    /// The current date as whole days since the unix epoch. Maintenance
    /// windows are scheduled at day granularity.
    pub fn today(&self) -> u64 {
        self.now_unix() / DAY_SECS
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new()
    }
}
