//! Collaborator traits the world drives but never implements.
//!
//! Both traits are called exclusively from the world-update task, so they
//! take `&mut self` and need no internal locking. Every tick-path method is
//! a non-blocking submission: implementations hand the work to their own
//! I/O machinery and return immediately. A failure is logged and the effect
//! skipped for this cycle; the task's periodicity is the retry mechanism.

use std::time::Duration;

use realmgate_protocol::{AccountId, RealmId, SecurityTier};

/// Errors surfaced by the persistence collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store cannot be reached right now.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The store refused the write.
    #[error("storage rejected write: {0}")]
    Rejected(String),
}

/// Persistent-storage collaborator. All writes are idempotent upserts.
pub trait WorldStore: Send + 'static {
    /// Records the realm's population ratio. Called on admission events
    /// only, never per tick.
    fn save_population(&mut self, realm: RealmId, ratio: f32) -> Result<(), StoreError>;

    /// Records uptime and the peak concurrent session count.
    fn save_uptime(
        &mut self,
        realm: RealmId,
        uptime_secs: u64,
        peak_active: u32,
    ) -> Result<(), StoreError>;

    /// Reads the next maintenance day (days since epoch). Called once at
    /// startup, before the tick loop exists; the only awaited-on read.
    fn load_maintenance_day(&mut self, realm: RealmId) -> Result<Option<u64>, StoreError>;

    /// Records the next maintenance day.
    fn save_maintenance_day(&mut self, realm: RealmId, day: u64) -> Result<(), StoreError>;

    /// Records the minimum tier allowed to log in, so the auth server can
    /// refuse early instead of bouncing connections off the realm.
    fn save_min_tier(&mut self, realm: RealmId, tier: SecurityTier) -> Result<(), StoreError>;

    /// Records an account ban.
    fn record_ban(&mut self, account: AccountId) -> Result<(), StoreError>;

    /// Lifts an account ban.
    fn clear_ban(&mut self, account: AccountId) -> Result<(), StoreError>;
}

/// Periodic-effect collaborator: the world decides *when*, the hooks do the
/// actual work against game state the core never sees.
pub trait WorldHooks: Send + 'static {
    /// Returns undeliverable mail and deletes mail past its lifetime.
    fn expire_stale_mail(&mut self) -> Result<(), StoreError>;

    /// Resolves every timed event due at `now_unix` and returns how long
    /// until the next one; the world re-arms the event timer with it.
    fn resolve_due_events(&mut self, now_unix: u64) -> Result<Duration, StoreError>;

    /// Purges aged ephemeral world state (corpses, ground items, and the
    /// like).
    fn purge_ephemeral_state(&mut self) -> Result<(), StoreError>;
}
