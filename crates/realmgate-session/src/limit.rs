//! Capacity policy for the realm.

use realmgate_protocol::SecurityTier;
use tracing::warn;

/// How many sessions the realm accepts, decoded from the raw signed config
/// value:
///
/// - `0` — open, no limit
/// - `n > 0` — capped at `n` active sessions; regular players queue beyond
///   that, privileged tiers bypass the queue
/// - `n < 0` — tier-locked: only accounts at or above the tier with level
///   `-n` may connect at all (no queue); magnitudes past the highest tier
///   are clamped to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLimit {
    /// No capacity limit.
    Open,
    /// At most this many active sessions; overflow queues.
    Capped(u32),
    /// Closed below the given tier.
    TierLocked(SecurityTier),
}

impl SessionLimit {
    /// Decodes the raw config value, clamping out-of-range tier locks with
    /// a logged warning rather than failing.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Open,
            n if n > 0 => Self::Capped(n as u32),
            n => {
                let magnitude = n.unsigned_abs();
                if magnitude > SecurityTier::MAX.level() {
                    warn!(
                        raw,
                        clamped_to = -(SecurityTier::MAX.level() as i32),
                        "session limit below minimum, clamping"
                    );
                }
                Self::TierLocked(SecurityTier::from_level(magnitude))
            }
        }
    }

    /// The raw config encoding of this policy.
    pub fn raw(self) -> i32 {
        match self {
            Self::Open => 0,
            Self::Capped(n) => n as i32,
            Self::TierLocked(tier) => -(tier.level() as i32),
        }
    }

    /// The numeric cap, when one exists.
    pub fn cap(self) -> Option<u32> {
        match self {
            Self::Capped(n) => Some(n),
            _ => None,
        }
    }

    /// The minimum tier allowed to connect. `Player` for open and capped
    /// realms; persisted to the store so the auth server can refuse early.
    pub fn min_tier(self) -> SecurityTier {
        match self {
            Self::TierLocked(tier) => tier,
            _ => SecurityTier::Player,
        }
    }
}

impl Default for SessionLimit {
    fn default() -> Self {
        Self::Open
    }
}
