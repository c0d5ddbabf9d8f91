//! Unified error type for the Realmgate core.

use realmgate_session::SessionError;

use crate::store::StoreError;

/// Top-level error that wraps all crate-specific errors.
///
/// Admin command callbacks and the world entry points report this single
/// type; the `#[from]` variants let `?` convert sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A session-level error (unknown account, not removable).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A persistence-collaborator error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The world-update task is no longer running; submissions through a
    /// [`WorldHandle`](crate::WorldHandle) can never be consumed.
    #[error("world task has stopped")]
    Closed,
}
