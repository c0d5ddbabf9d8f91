//! The session directory: the authoritative record of who is on the realm.
//!
//! Owns the active-session map and the FIFO admission wait-queue, and makes
//! every admission decision:
//!
//! - at most one live-or-queued session per account, enforced by replacing
//!   (or, mid-load, refusing) an existing session on reconnect
//! - admit-or-queue under the configured [`SessionLimit`], with privileged
//!   tiers bypassing the queue
//! - strictly FIFO promotion when capacity frees up, with 1-based queue
//!   positions re-announced on every queue mutation
//!
//! Mutated only by the world's admission drain and session pump; external
//! readers get counts and peaks between ticks.

use std::collections::{HashMap, VecDeque};

use realmgate_protocol::{
    AccountId, AuthResponse, RefusalReason, SecurityTier, ServerNotice, SessionMessage,
};

use crate::{Session, SessionConfig, SessionError, SessionLimit};

/// The outcome of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The session is active in the world.
    Admitted,
    /// The session waits in the queue at the given 1-based position.
    Queued { position: u32 },
    /// The connection was refused outright.
    Refused(RefusalReason),
}

/// Tracks every session on the realm, active and queued.
pub struct SessionDirectory {
    /// All sessions, keyed by account. Queued sessions live here too,
    /// flagged via [`Session::in_queue`].
    sessions: HashMap<AccountId, Session>,

    /// Accounts waiting for capacity, oldest first. Every entry also has a
    /// `sessions` entry; positions are this queue's 1-based indices.
    queue: VecDeque<AccountId>,

    limit: SessionLimit,
    config: SessionConfig,

    /// High-water marks, reported with the periodic uptime record.
    peak_active: u32,
    peak_queued: u32,
}

impl SessionDirectory {
    /// Creates an empty directory under the given capacity policy.
    pub fn new(limit: SessionLimit, config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            queue: VecDeque::new(),
            limit,
            config,
            peak_active: 0,
            peak_queued: 0,
        }
    }

    // -- Admission --------------------------------------------------------

    /// Admits a freshly authenticated session, queues it, or refuses it.
    ///
    /// An existing session for the same account is forcibly disconnected
    /// first — unless it is still loading persistent state, in which case
    /// the *new* connection is refused and the old load completes
    /// undisturbed.
    pub fn admit(&mut self, mut session: Session) -> Admission {
        let account = session.account();

        if let Some(old) = self.sessions.get(&account) {
            if old.is_loading() {
                tracing::info!(%account, "refusing reconnect while old session is loading");
                session.refuse(RefusalReason::ReconnectPending);
                return Admission::Refused(RefusalReason::ReconnectPending);
            }
        }

        if let SessionLimit::TierLocked(min) = self.limit {
            if session.tier() < min {
                tracing::info!(%account, tier = %session.tier(), %min, "refusing below tier lock");
                session.refuse(RefusalReason::InsufficientTier);
                return Admission::Refused(RefusalReason::InsufficientTier);
            }
        }

        // Replace any previous session for this account. The queue
        // bookkeeping runs while the old session is still in the map so the
        // active count it sees is accurate. If the old one was queued, the
        // pool already shrank by one when it left the queue, so the
        // candidate must not be excluded from the count a second time.
        let mut replaced_queued = false;
        if self.sessions.contains_key(&account) {
            replaced_queued = self.remove_queued(account);
            if let Some(mut old) = self.sessions.remove(&account) {
                old.kick();
            }
            tracing::info!(%account, was_queued = replaced_queued, "replaced session on reconnect");
        }

        let tier = session.tier();
        self.sessions.insert(account, session);

        // Effective count: active + queued, excluding the candidate itself.
        let mut effective = self.sessions.len() as u32;
        if !replaced_queued {
            effective -= 1;
        }

        if let SessionLimit::Capped(cap) = self.limit {
            if effective >= cap && !tier.bypasses_queue() {
                let position = self.enqueue(account);
                self.update_peaks();
                tracing::info!(%account, position, "session queued");
                return Admission::Queued { position };
            }
        }

        if let Some(session) = self.sessions.get(&account) {
            session.send_auth_response(AuthResponse::Admitted);
        }
        self.update_peaks();
        tracing::info!(%account, active = self.active_count(), "session admitted");
        Admission::Admitted
    }

    /// Appends to the queue tail and announces the 1-based position.
    fn enqueue(&mut self, account: AccountId) -> u32 {
        self.queue.push_back(account);
        let position = self.queue.len() as u32;
        if let Some(session) = self.sessions.get_mut(&account) {
            session.set_in_queue(true);
            session.send_auth_response(AuthResponse::Queued { position });
        }
        position
    }

    /// Removes an account from the wait-queue machinery and rebalances.
    ///
    /// Returns whether the account was actually queued. Called both for
    /// queued sessions leaving and for *active* sessions leaving — in the
    /// latter case the departure frees capacity, so the queue head is
    /// promoted (exactly one session, strictly FIFO) and every remaining
    /// position is recomputed and re-announced.
    pub fn remove_queued(&mut self, account: AccountId) -> bool {
        // Active count as if the caller's removal already happened.
        let mut active = self.active_count();

        let found = if let Some(idx) = self.queue.iter().position(|a| *a == account) {
            self.queue.remove(idx);
            if let Some(session) = self.sessions.get_mut(&account) {
                session.set_in_queue(false);
            }
            true
        } else {
            false
        };

        // Not queued: the departing session was active, so one slot frees.
        if !found && active > 0 {
            active -= 1;
        }

        let has_room = match self.limit {
            SessionLimit::Capped(cap) => active < cap,
            _ => true,
        };
        if has_room {
            if let Some(head) = self.queue.pop_front() {
                if let Some(session) = self.sessions.get_mut(&head) {
                    session.set_in_queue(false);
                    // Position 0 is the "you are in" signal.
                    session.send_auth_response(AuthResponse::Queued { position: 0 });
                }
                tracing::info!(account = %head, "promoted from admission queue");
            }
        }

        self.reannounce_positions();
        found
    }

    /// Re-sends every queued session its current 1-based position. The
    /// messages are idempotent; what matters is that none is ever stale.
    fn reannounce_positions(&self) {
        for (idx, account) in self.queue.iter().enumerate() {
            if let Some(session) = self.sessions.get(account) {
                session.send_auth_response(AuthResponse::Queued {
                    position: idx as u32 + 1,
                });
            }
        }
    }

    // -- Removal ----------------------------------------------------------

    /// Flags a session for disconnection at the next tick boundary.
    ///
    /// Rejected while the session is loading persistent state — tearing it
    /// down would race the load.
    pub fn kick(&mut self, account: AccountId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&account)
            .ok_or(SessionError::NotFound(account))?;
        if session.is_loading() {
            return Err(SessionError::NotRemovable(account));
        }
        session.kick();
        Ok(())
    }

    /// Kicks every session. The queue is cleared first so the mass removal
    /// does not trigger a cascade of promotions and position updates.
    pub fn kick_all(&mut self) {
        for account in self.queue.drain(..) {
            if let Some(session) = self.sessions.get_mut(&account) {
                session.set_in_queue(false);
            }
        }
        for session in self.sessions.values_mut() {
            session.kick();
        }
    }

    /// Kicks every session below the given tier.
    pub fn kick_all_below(&mut self, tier: SecurityTier) {
        let doomed: Vec<AccountId> = self
            .sessions
            .values()
            .filter(|s| s.tier() < tier)
            .map(|s| s.account())
            .collect();
        for account in doomed {
            // Loading sessions are skipped, same as a single kick.
            let _ = self.kick(account);
        }
    }

    // -- The session pump -------------------------------------------------

    /// Per-tick update of every session; reaps the dead ones.
    ///
    /// A dead session is deregistered from the queue machinery *first* (so
    /// queue accounting and promotion run against a consistent picture) and
    /// only then dropped from the map. Returns the reaped accounts.
    pub fn update_all(&mut self, elapsed_ms: u64) -> Vec<AccountId> {
        let idle_timeout = self.config.idle_timeout;
        let accounts: Vec<AccountId> = self.sessions.keys().copied().collect();
        let mut removed = Vec::new();

        for account in accounts {
            let alive = match self.sessions.get_mut(&account) {
                Some(session) => session.update(elapsed_ms, idle_timeout),
                None => continue,
            };
            if !alive {
                self.remove_queued(account);
                self.sessions.remove(&account);
                tracing::info!(%account, "session removed");
                removed.push(account);
            }
        }

        removed
    }

    // -- Broadcast --------------------------------------------------------

    /// Sends a notice to every active (non-queued) session.
    pub fn broadcast(&self, notice: ServerNotice) {
        for session in self.sessions.values() {
            if !session.in_queue() {
                session.send(SessionMessage::Notice(notice.clone()));
            }
        }
    }

    // -- Loading and activity passthrough ---------------------------------

    /// Marks the start of a session's persistent-state load.
    pub fn begin_loading(&mut self, account: AccountId) -> Result<(), SessionError> {
        self.sessions
            .get_mut(&account)
            .map(Session::begin_loading)
            .ok_or(SessionError::NotFound(account))
    }

    /// Marks a session's persistent-state load as complete.
    pub fn finish_loading(&mut self, account: AccountId) -> Result<(), SessionError> {
        self.sessions
            .get_mut(&account)
            .map(Session::finish_loading)
            .ok_or(SessionError::NotFound(account))
    }

    /// Records client activity for a session.
    pub fn touch(&mut self, account: AccountId) -> Result<(), SessionError> {
        self.sessions
            .get_mut(&account)
            .map(Session::touch)
            .ok_or(SessionError::NotFound(account))
    }

    // -- Snapshots --------------------------------------------------------

    /// Looks up a session by account.
    pub fn get(&self, account: &AccountId) -> Option<&Session> {
        self.sessions.get(account)
    }

    /// Active plus queued sessions.
    pub fn total_count(&self) -> u32 {
        self.sessions.len() as u32
    }

    /// Sessions active in the world (not queued).
    pub fn active_count(&self) -> u32 {
        (self.sessions.len() - self.queue.len()) as u32
    }

    /// Sessions waiting in the admission queue.
    pub fn queued_count(&self) -> u32 {
        self.queue.len() as u32
    }

    /// Whether the realm has no sessions at all, queued included. The
    /// idle-mode shutdown polls this.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// The 1-based queue position of an account, if queued.
    pub fn queue_position(&self, account: AccountId) -> Option<u32> {
        self.queue
            .iter()
            .position(|a| *a == account)
            .map(|idx| idx as u32 + 1)
    }

    /// Peak concurrent active sessions since startup.
    pub fn peak_active(&self) -> u32 {
        self.peak_active
    }

    /// Peak queue depth since startup.
    pub fn peak_queued(&self) -> u32 {
        self.peak_queued
    }

    /// The active capacity policy.
    pub fn limit(&self) -> SessionLimit {
        self.limit
    }

    /// Replaces the capacity policy. Existing queued sessions keep their
    /// places; a raised cap takes effect at the next departure or
    /// admission.
    pub fn set_limit(&mut self, limit: SessionLimit) {
        self.limit = limit;
    }

    /// The population ratio reported to the store on admission events:
    /// active sessions over the cap, scaled to the conventional 0–2 range.
    /// `None` when the realm is not capped.
    pub fn population_ratio(&self) -> Option<f32> {
        self.limit
            .cap()
            .map(|cap| self.active_count() as f32 / cap as f32 * 2.0)
    }

    fn update_peaks(&mut self) {
        self.peak_active = self.peak_active.max(self.active_count());
        self.peak_queued = self.peak_queued.max(self.queued_count());
    }
}

// =========================================================================
// Tests
// =========================================================================
