//! Session tracking and admission control for Realmgate.
//!
//! This crate owns the answer to "who is on this realm right now":
//!
//! 1. **Session tracking** — at most one live session per account
//!    ([`SessionDirectory`])
//! 2. **Admission control** — admit immediately or queue under the
//!    configured [`SessionLimit`], with FIFO promotion and live queue
//!    position updates
//! 3. **Liveness** — per-tick session updates that reap kicked, hung-up,
//!    and idle connections
//!
//! # Concurrency note
//!
//! `SessionDirectory` is NOT thread-safe and that is deliberate: it is
//! owned by the single world-update task, which is the only mutator.
//! Freshly authenticated sessions reach it through the world's handoff
//! queue, never by direct insertion from the network layer.

mod directory;
mod error;
mod limit;
mod session;

pub use directory::{Admission, SessionDirectory};
pub use error::SessionError;
pub use limit::SessionLimit;
pub use session::{Session, SessionConfig, SessionSender};
