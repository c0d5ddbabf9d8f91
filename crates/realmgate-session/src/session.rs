//! A single authenticated client connection.

use std::time::Duration;

use realmgate_protocol::{
    AccountId, AuthResponse, RefusalReason, SecurityTier, ServerNotice, SessionMessage,
};
use tokio::sync::mpsc;

/// Channel sender for delivering outbound messages to a session's
/// connection handler. The network layer holds the receiving half.
pub type SessionSender = mpsc::UnboundedSender<SessionMessage>;

/// Configuration for session liveness.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Disconnect sessions with no activity for this long. `None` leaves
    /// liveness entirely to the network layer's own socket timeouts.
    pub idle_timeout: Option<Duration>,
}

/// One authenticated client connection and its server-side state.
///
/// Handed to the [`SessionDirectory`](crate::SessionDirectory) by the
/// admission drain; owned exclusively by it from then on. The network layer
/// keeps only the receiving end of the outbound channel.
#[derive(Debug)]
pub struct Session {
    account: AccountId,
    tier: SecurityTier,
    /// Set while the session waits in the admission queue.
    queued: bool,
    /// Set while persistent state is being loaded into this session.
    /// A loading session must not be torn down.
    loading: bool,
    /// Set by a kick; the session is reaped at the next tick boundary.
    kicked: bool,
    /// Milliseconds since the last recorded client activity.
    idle_ms: u64,
    outbound: SessionSender,
}

impl Session {
    /// Wraps a freshly authenticated connection.
    pub fn new(account: AccountId, tier: SecurityTier, outbound: SessionSender) -> Self {
        Self {
            account,
            tier,
            queued: false,
            loading: false,
            kicked: false,
            idle_ms: 0,
            outbound,
        }
    }

    /// The owning account.
    pub fn account(&self) -> AccountId {
        self.account
    }

    /// The account's privilege tier.
    pub fn tier(&self) -> SecurityTier {
        self.tier
    }

    /// Whether this session is waiting in the admission queue.
    pub fn in_queue(&self) -> bool {
        self.queued
    }

    pub(crate) fn set_in_queue(&mut self, queued: bool) {
        self.queued = queued;
    }

    /// Whether persistent state is currently loading into this session.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Marks the start of the persistent-state load. While set, kicks and
    /// same-account replacement are refused.
    pub fn begin_loading(&mut self) {
        self.loading = true;
    }

    /// Marks the load complete; the session becomes removable again.
    pub fn finish_loading(&mut self) {
        self.loading = false;
    }

    /// Records client activity, resetting the idle counter.
    pub fn touch(&mut self) {
        self.idle_ms = 0;
    }

    /// Flags the session for disconnection and tells the client. Removal
    /// happens at the next tick boundary, never mid-tick.
    pub fn kick(&mut self) {
        if !self.kicked {
            self.kicked = true;
            self.send(SessionMessage::Notice(ServerNotice::Kicked));
        }
    }

    /// Whether a kick is pending.
    pub fn is_kicked(&self) -> bool {
        self.kicked
    }

    /// Per-tick update. Returns `false` once the session is no longer
    /// alive: kicked, client hung up, or idle past the configured timeout.
    pub fn update(&mut self, elapsed_ms: u64, idle_timeout: Option<Duration>) -> bool {
        if self.kicked {
            return false;
        }
        if self.outbound.is_closed() {
            return false;
        }
        self.idle_ms += elapsed_ms;
        if let Some(timeout) = idle_timeout {
            if self.idle_ms >= timeout.as_millis() as u64 {
                tracing::info!(account = %self.account, "session idle timeout");
                return false;
            }
        }
        true
    }

    /// Sends the admission outcome to the client.
    pub(crate) fn send_auth_response(&self, response: AuthResponse) {
        self.send(SessionMessage::Auth(response));
    }

    /// Sends a refusal and flags the session dead so it is never admitted.
    pub(crate) fn refuse(&mut self, reason: RefusalReason) {
        self.send(SessionMessage::Auth(AuthResponse::Refused { reason }));
        self.kicked = true;
    }

    /// Pushes a message down the outbound channel. A closed channel means
    /// the client is gone; the next update reaps the session, so the send
    /// error is dropped here.
    pub(crate) fn send(&self, msg: SessionMessage) {
        let _ = self.outbound.send(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn session(account: u64) -> (Session, UnboundedReceiver<SessionMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Session::new(AccountId(account), SecurityTier::Player, tx), rx)
    }

    #[test]
    fn test_new_session_is_alive_and_unqueued() {
        let (mut s, _rx) = session(1);
        assert!(!s.in_queue());
        assert!(!s.is_loading());
        assert!(s.update(50, None));
    }

    #[test]
    fn test_kick_sends_notice_and_kills_next_update() {
        let (mut s, mut rx) = session(1);
        s.kick();
        assert!(s.is_kicked());
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionMessage::Notice(ServerNotice::Kicked)
        );
        assert!(!s.update(50, None));
    }

    #[test]
    fn test_kick_twice_sends_one_notice() {
        let (mut s, mut rx) = session(1);
        s.kick();
        s.kick();
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_channel_kills_session() {
        let (mut s, rx) = session(1);
        drop(rx);
        assert!(!s.update(50, None));
    }

    #[test]
    fn test_idle_timeout_kills_session() {
        let (mut s, _rx) = session(1);
        let timeout = Some(Duration::from_secs(1));
        assert!(s.update(999, timeout));
        assert!(!s.update(1, timeout));
    }

    #[test]
    fn test_touch_resets_idle_counter() {
        let (mut s, _rx) = session(1);
        let timeout = Some(Duration::from_secs(1));
        assert!(s.update(999, timeout));
        s.touch();
        assert!(s.update(999, timeout));
    }

    #[test]
    fn test_no_idle_timeout_never_idles_out() {
        let (mut s, _rx) = session(1);
        assert!(s.update(u64::from(u32::MAX), None));
    }

    #[test]
    fn test_refuse_sends_response_and_kills() {
        let (mut s, mut rx) = session(1);
        s.refuse(RefusalReason::ReconnectPending);
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionMessage::Auth(AuthResponse::Refused {
                reason: RefusalReason::ReconnectPending
            })
        );
        assert!(!s.update(1, None));
    }
}
