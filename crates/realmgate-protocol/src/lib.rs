//! Shared protocol types for Realmgate.
//!
//! This crate defines what travels between the orchestration core and the
//! (external) network layer: identity newtypes, the admission handshake
//! messages, and the typed server notices used for world broadcasts.
//!
//! The core never serializes packets itself — it hands these values to the
//! session's outbound channel and the network layer picks the encoding.
//! The serde shapes defined here are the contract with that layer.

mod message;
mod types;

pub use message::{AuthResponse, RefusalReason, ServerNotice, SessionMessage};
pub use types::{AccountId, RealmId, SecurityTier};
