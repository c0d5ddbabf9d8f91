//! Timing primitives for the Realmgate world loop.
//!
//! Three pieces:
//!
//! - [`IntervalTimer`] — one countdown per periodic obligation, advanced by
//!   the world tick. Firing carries overshoot into the next cycle so a task
//!   with a 60 s period fires every 60 s on average regardless of tick
//!   alignment.
//! - [`GameClock`] — the world's notion of time. Fed elapsed milliseconds by
//!   the tick, never read from the wall clock mid-tick, so everything driven
//!   by it (shutdown countdown, maintenance dates) is deterministic under
//!   test.
//! - [`TickLoop`] — the paced async driver that wakes at a fixed rate and
//!   reports real elapsed time, with jitter on the first tick and skip-ahead
//!   on overrun.

mod clock;
mod interval;
mod tick_loop;

pub use clock::GameClock;
pub use interval::IntervalTimer;
pub use tick_loop::{TickLoop, TickLoopConfig};
