//! The shutdown controller: a timed, cancellable countdown state machine.
//!
//! The world evaluates it once per tick, after everything else, feeding it
//! the whole seconds that elapsed. The controller never touches sessions or
//! sockets itself; it hands back [`ShutdownEvent`]s for the world to act on.

use realmgate_protocol::ServerNotice;

/// Process exit code fixed at the moment the shutdown fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Normal stop.
    Shutdown,
    /// Abnormal stop.
    Error,
    /// Stop with the supervisor expected to start a fresh process.
    Restart,
}

impl ExitCode {
    /// The numeric code handed to the process exit.
    pub fn code(self) -> i32 {
        match self {
            Self::Shutdown => 0,
            Self::Error => 1,
            Self::Restart => 2,
        }
    }
}

/// Modifiers on a shutdown request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownFlags {
    /// The supervisor should restart the server after exit; notices and
    /// the default exit code are keyed off this.
    pub restart: bool,
    /// Wait-for-idle mode: hold fire while any session (active or queued)
    /// remains, re-polling every second. Idle countdowns are silent.
    pub idle: bool,
}

/// What the world must do in response to a controller transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownEvent {
    /// Broadcast this notice to active sessions.
    Notice(ServerNotice),
    /// The countdown fired; terminate with this code.
    Fire(ExitCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Counting {
        remaining_secs: u64,
        flags: ShutdownFlags,
        exit_code: ExitCode,
    },
    /// Terminal. Further requests and cancels are ignored.
    Firing { exit_code: ExitCode },
}

/// Tri-state countdown: Idle → Counting → Firing, with Counting → Idle on
/// cancel and nothing ever leaving Firing.
#[derive(Debug)]
pub struct ShutdownController {
    state: State,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Starts (or replaces) a countdown. Ignored once Firing.
    ///
    /// A zero delay fires immediately — unless `flags.idle` holds and
    /// sessions remain, in which case the countdown arms at one second so
    /// the idle check re-polls every tick.
    pub fn request(
        &mut self,
        delay_secs: u64,
        flags: ShutdownFlags,
        exit_code: ExitCode,
        population: u32,
    ) -> Option<ShutdownEvent> {
        if matches!(self.state, State::Firing { .. }) {
            tracing::debug!("shutdown request ignored, already firing");
            return None;
        }

        if delay_secs == 0 {
            return self.fire_or_repoll(flags, exit_code, population);
        }

        self.state = State::Counting {
            remaining_secs: delay_secs,
            flags,
            exit_code,
        };
        tracing::info!(
            delay_secs,
            restart = flags.restart,
            idle = flags.idle,
            "shutdown countdown started"
        );
        if flags.idle {
            return None;
        }
        Some(ShutdownEvent::Notice(time_notice(flags, delay_secs)))
    }

    /// Advances the countdown by whole elapsed seconds.
    ///
    /// `population` is the active-plus-queued session count, consulted only
    /// when the timer reaches zero in idle mode.
    pub fn tick(&mut self, elapsed_secs: u64, population: u32) -> Option<ShutdownEvent> {
        let State::Counting {
            remaining_secs,
            flags,
            exit_code,
        } = self.state
        else {
            return None;
        };
        if elapsed_secs == 0 {
            return None;
        }

        if remaining_secs <= elapsed_secs {
            return self.fire_or_repoll(flags, exit_code, population);
        }

        let remaining_secs = remaining_secs - elapsed_secs;
        self.state = State::Counting {
            remaining_secs,
            flags,
            exit_code,
        };
        tracing::debug!(remaining_secs, "shutdown countdown");

        if !flags.idle && on_milestone(remaining_secs) {
            return Some(ShutdownEvent::Notice(time_notice(flags, remaining_secs)));
        }
        None
    }

    /// Cancels a running countdown. No-op in Idle; ignored once Firing.
    pub fn cancel(&mut self) -> Option<ShutdownEvent> {
        let State::Counting { flags, .. } = self.state else {
            return None;
        };
        self.state = State::Idle;
        tracing::info!(restart = flags.restart, "shutdown cancelled");
        if flags.idle {
            return None;
        }
        let notice = if flags.restart {
            ServerNotice::RestartCancelled
        } else {
            ServerNotice::ShutdownCancelled
        };
        Some(ShutdownEvent::Notice(notice))
    }

    fn fire_or_repoll(
        &mut self,
        flags: ShutdownFlags,
        exit_code: ExitCode,
        population: u32,
    ) -> Option<ShutdownEvent> {
        if flags.idle && population > 0 {
            // Sessions remain; hold at one second and check again next tick.
            self.state = State::Counting {
                remaining_secs: 1,
                flags,
                exit_code,
            };
            return None;
        }
        self.state = State::Firing { exit_code };
        tracing::info!(code = exit_code.code(), "shutdown firing");
        Some(ShutdownEvent::Fire(exit_code))
    }

    pub fn is_counting(&self) -> bool {
        matches!(self.state, State::Counting { .. })
    }

    pub fn is_firing(&self) -> bool {
        matches!(self.state, State::Firing { .. })
    }

    /// Seconds left on a running countdown.
    pub fn remaining_secs(&self) -> Option<u64> {
        match self.state {
            State::Counting { remaining_secs, .. } => Some(remaining_secs),
            _ => None,
        }
    }

    /// Flags of a running countdown.
    pub fn flags(&self) -> Option<ShutdownFlags> {
        match self.state {
            State::Counting { flags, .. } => Some(flags),
            _ => None,
        }
    }

    /// The exit code, once Firing.
    pub fn exit_code(&self) -> Option<ExitCode> {
        match self.state {
            State::Firing { exit_code } => Some(exit_code),
            _ => None,
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

fn time_notice(flags: ShutdownFlags, secs_remaining: u64) -> ServerNotice {
    if flags.restart {
        ServerNotice::RestartTime { secs_remaining }
    } else {
        ServerNotice::ShutdownTime { secs_remaining }
    }
}

/// Whether the remaining time lands on a broadcast milestone. One bracket
/// table, checked smallest-first:
/// every 15 s under 5 min, every minute under 15 min, every 5 min under
/// 30 min, every hour under 12 h, every 12 h beyond that.
fn on_milestone(secs: u64) -> bool {
    let bracket = match secs {
        s if s < 300 => 15,
        s if s < 900 => 60,
        s if s < 1_800 => 300,
        s if s < 43_200 => 3_600,
        _ => 43_200,
    };
    secs % bracket == 0
}
