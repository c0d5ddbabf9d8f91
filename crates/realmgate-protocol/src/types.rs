//! Identity newtypes and the privilege ladder.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique identifier for an account.
///
/// Newtype over `u64` so an account id can't be confused with a realm id
/// (or any other numeric handle) at compile time. One account maps to at
/// most one live session — the session directory keys on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A-{}", self.0)
    }
}

/// A unique identifier for a realm (one world instance).
///
/// Used to key the population and uptime records in the store — a single
/// account database can back several realms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RealmId(pub u32);

impl fmt::Display for RealmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "realm-{}", self.0)
    }
}

/// The privilege tier of an account.
///
/// Ordered: `Player < Moderator < GameMaster < Administrator`. Tiers above
/// `Player` bypass the admission queue; a tier-locked realm refuses anyone
/// below the configured minimum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum SecurityTier {
    /// A regular account with no special rights.
    #[default]
    Player,
    /// Can moderate chat and inspect players.
    Moderator,
    /// Full in-world command access.
    GameMaster,
    /// Server administration.
    Administrator,
}

impl SecurityTier {
    /// The highest tier. Used as the clamp bound when decoding raw
    /// tier-lock config values.
    pub const MAX: SecurityTier = SecurityTier::Administrator;

    /// Decodes a tier from its numeric level, clamping out-of-range
    /// values to [`SecurityTier::MAX`].
    pub fn from_level(level: u32) -> Self {
        match level {
            0 => Self::Player,
            1 => Self::Moderator,
            2 => Self::GameMaster,
            _ => Self::Administrator,
        }
    }

    /// The numeric level of this tier.
    pub fn level(self) -> u32 {
        match self {
            Self::Player => 0,
            Self::Moderator => 1,
            Self::GameMaster => 2,
            Self::Administrator => 3,
        }
    }

    /// Whether this tier skips the admission queue on a full realm.
    pub fn bypasses_queue(self) -> bool {
        self > Self::Player
    }
}

impl fmt::Display for SecurityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::Moderator => write!(f, "moderator"),
            Self::GameMaster => write!(f, "gamemaster"),
            Self::Administrator => write!(f, "administrator"),
        }
    }
}
