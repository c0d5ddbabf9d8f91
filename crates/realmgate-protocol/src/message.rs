//! Messages the core hands to the network layer for delivery.
//!
//! Two families:
//!
//! - [`AuthResponse`] — the admission handshake outcome for one session
//!   (admitted, queued with a position, or refused).
//! - [`ServerNotice`] — world-wide announcements (shutdown countdowns,
//!   cancellations, operator broadcasts).
//!
//! Notices are typed messages carrying a key and structured fields, not
//! preformatted text — the session layer localizes and formats them per
//! client. `#[serde(tag = "type")]` gives them a stable internally-tagged
//! JSON shape for layers that forward them as-is.

use serde::{Deserialize, Serialize};

/// Why a connection attempt was refused outright (neither admitted nor
/// queued).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefusalReason {
    /// The account's previous session is still loading persistent state;
    /// replacing it mid-load would tear down state the load is writing
    /// into. The client should retry shortly.
    ReconnectPending,
    /// The realm is locked to a minimum privilege tier the account does
    /// not meet.
    InsufficientTier,
}

/// The outcome of an admission attempt, delivered to the connecting client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthResponse {
    /// The session is active in the world. No extra payload.
    Admitted,

    /// The realm is full; the session is waiting in the admission queue.
    /// `position` is 1-based and re-announced whenever the queue changes;
    /// position 0 means "promoted, you are in".
    Queued { position: u32 },

    /// The connection was refused — not queued, not admitted.
    Refused { reason: RefusalReason },
}

/// A world-wide announcement. The core decides when and which; the session
/// layer decides how it looks on each client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerNotice {
    /// The server will shut down in `secs_remaining` seconds.
    ShutdownTime { secs_remaining: u64 },

    /// The server will restart in `secs_remaining` seconds.
    RestartTime { secs_remaining: u64 },

    /// A scheduled shutdown was cancelled.
    ShutdownCancelled,

    /// A scheduled restart was cancelled.
    RestartCancelled,

    /// An operator broadcast with opaque text (already localized upstream).
    Broadcast { text: String },

    /// This session is being disconnected.
    Kicked,
}

/// Everything the core can push down a session's outbound channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionMessage {
    /// An admission handshake outcome (including queue-position updates).
    Auth(AuthResponse),
    /// A world announcement.
    Notice(ServerNotice),
}
