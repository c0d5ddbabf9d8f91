//! The operator command surface.
//!
//! Commands are submitted from any task through the world handle and
//! executed by the world-update task, in submission order, once per tick.
//! An optional oneshot callback reports the outcome to the submitter.

use realmgate_protocol::AccountId;
use tokio::sync::oneshot;

use crate::shutdown::{ExitCode, ShutdownFlags};
use crate::WorldError;

/// An operator instruction to the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// Begin a shutdown countdown (or fire immediately at zero delay).
    Shutdown {
        delay_secs: u64,
        flags: ShutdownFlags,
        exit_code: ExitCode,
    },
    /// Cancel a running countdown. Succeeds even when none is running.
    CancelShutdown,
    /// Disconnect one session at the next tick boundary.
    Kick { account: AccountId },
    /// Record a ban and kick any matching live session.
    Ban { account: AccountId },
    /// Lift a ban.
    Unban { account: AccountId },
    /// Replace the capacity policy with a freshly decoded raw value.
    SetLimit { raw: i32 },
    /// Broadcast an operator message to every active session.
    Announce { text: String },
}

/// A command plus its completion callback.
#[derive(Debug)]
pub struct CommandRequest {
    pub command: AdminCommand,
    pub(crate) done: Option<oneshot::Sender<Result<(), WorldError>>>,
}

impl CommandRequest {
    /// Fire-and-forget: nobody waits on the outcome.
    pub fn new(command: AdminCommand) -> Self {
        Self {
            command,
            done: None,
        }
    }

    /// A request paired with a receiver that resolves once the command has
    /// executed. Dropping the receiver is fine; the result is discarded.
    pub fn with_callback(command: AdminCommand) -> (Self, oneshot::Receiver<Result<(), WorldError>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                command,
                done: Some(tx),
            },
            rx,
        )
    }

    pub(crate) fn complete(self, result: Result<(), WorldError>) {
        if let Err(error) = &result {
            tracing::warn!(command = ?self.command, %error, "admin command failed");
        }
        if let Some(done) = self.done {
            let _ = done.send(result);
        }
    }
}
