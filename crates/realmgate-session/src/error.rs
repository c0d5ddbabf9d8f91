//! Error types for the session layer.

use realmgate_protocol::AccountId;

/// Errors that can occur while managing sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the given account.
    #[error("no session for account {0}")]
    NotFound(AccountId),

    /// The session is still loading persistent state and cannot be torn
    /// down yet. Retry once the load completes.
    #[error("session for account {0} is loading and not yet removable")]
    NotRemovable(AccountId),
}
