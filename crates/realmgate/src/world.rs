//! The world orchestrator: one heartbeat driving every subsystem.
//!
//! A `World` owns the session directory, the periodic timers, the game
//! clock, and the shutdown controller outright; there is no shared-state
//! locking because only the world-update task ever touches them. Everything
//! else in the process talks to the world through a clonable
//! [`WorldHandle`]: the network layer hands over freshly authenticated
//! sessions, operator tooling submits [`AdminCommand`]s, and both are
//! drained once per tick.

use std::time::Duration;

use realmgate_protocol::{SecurityTier, ServerNotice};
use realmgate_session::{
    Admission, Session, SessionConfig, SessionDirectory, SessionError, SessionLimit,
};
use realmgate_tick::{GameClock, IntervalTimer, TickLoop, TickLoopConfig};
use tokio::sync::mpsc;

use crate::command::{AdminCommand, CommandRequest};
use crate::config::WorldConfig;
use crate::shutdown::{ExitCode, ShutdownController, ShutdownEvent, ShutdownFlags};
use crate::store::{WorldHooks, WorldStore};
use crate::WorldError;

/// Days rolled forward after a maintenance window passes.
const MAINTENANCE_PERIOD_DAYS: u64 = 7;

/// Clonable submission endpoint for tasks outside the world-update loop.
#[derive(Debug, Clone)]
pub struct WorldHandle {
    session_tx: mpsc::UnboundedSender<Session>,
    command_tx: mpsc::UnboundedSender<CommandRequest>,
}

impl WorldHandle {
    /// Hands a freshly authenticated session to the world. It is admitted,
    /// queued, or refused during the next tick.
    pub fn submit_session(&self, session: Session) -> Result<(), WorldError> {
        self.session_tx.send(session).map_err(|_| WorldError::Closed)
    }

    /// Submits an operator command, executed during the next tick.
    pub fn submit_command(&self, request: CommandRequest) -> Result<(), WorldError> {
        self.command_tx.send(request).map_err(|_| WorldError::Closed)
    }
}

/// One countdown per periodic obligation.
struct PeriodicTimers {
    uptime: IntervalTimer,
    mail: IntervalTimer,
    events: IntervalTimer,
    purge: IntervalTimer,
    maintenance: IntervalTimer,
}

impl PeriodicTimers {
    fn new(config: &WorldConfig) -> Self {
        let secs = Duration::from_secs;
        Self {
            uptime: IntervalTimer::new(secs(config.uptime_interval_secs)),
            mail: IntervalTimer::new(secs(config.mail_interval_secs)),
            events: IntervalTimer::new(secs(config.event_interval_secs)),
            purge: IntervalTimer::new(secs(config.purge_interval_secs)),
            maintenance: IntervalTimer::new(secs(config.maintenance_check_secs)),
        }
    }

    fn advance_all(&mut self, elapsed_ms: u64) {
        self.uptime.advance(elapsed_ms);
        self.mail.advance(elapsed_ms);
        self.events.advance(elapsed_ms);
        self.purge.advance(elapsed_ms);
        self.maintenance.advance(elapsed_ms);
    }
}

/// The realm's orchestration core.
pub struct World<S: WorldStore, H: WorldHooks> {
    config: WorldConfig,
    directory: SessionDirectory,
    clock: GameClock,
    shutdown: ShutdownController,
    timers: PeriodicTimers,
    /// Next maintenance window, as whole days since the unix epoch.
    maintenance_day: u64,
    store: S,
    hooks: H,
    session_rx: mpsc::UnboundedReceiver<Session>,
    command_rx: mpsc::UnboundedReceiver<CommandRequest>,
}

impl<S: WorldStore, H: WorldHooks> World<S, H> {
    /// Builds a world and its submission handle.
    ///
    /// Reads the maintenance date from the store — the one awaited-on store
    /// access, made before the tick loop exists. A missing or unreadable
    /// date defaults to one week out.
    pub fn new(config: WorldConfig, mut store: S, hooks: H) -> (Self, WorldHandle) {
        let config = config.validated();
        let clock = GameClock::new();
        let limit = SessionLimit::from_raw(config.session_limit);
        let directory = SessionDirectory::new(
            limit,
            SessionConfig {
                idle_timeout: config.idle_timeout_secs.map(Duration::from_secs),
            },
        );

        let maintenance_day = match store.load_maintenance_day(config.realm) {
            Ok(Some(day)) => day,
            Ok(None) => {
                let day = clock.today() + MAINTENANCE_PERIOD_DAYS;
                if let Err(error) = store.save_maintenance_day(config.realm, day) {
                    tracing::warn!(%error, "initial maintenance date save failed");
                }
                day
            }
            Err(error) => {
                tracing::warn!(%error, "maintenance date load failed, defaulting");
                clock.today() + MAINTENANCE_PERIOD_DAYS
            }
        };

        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let handle = WorldHandle {
            session_tx,
            command_tx,
        };

        tracing::info!(
            realm = %config.realm,
            limit = ?limit,
            maintenance_day,
            "world created"
        );

        let timers = PeriodicTimers::new(&config);
        let world = Self {
            config,
            directory,
            clock,
            shutdown: ShutdownController::new(),
            timers,
            maintenance_day,
            store,
            hooks,
            session_rx,
            command_rx,
        };
        (world, handle)
    }

    /// Runs the world at the configured tick rate until a shutdown fires.
    /// Returns the exit code the process should terminate with.
    pub async fn run(mut self) -> ExitCode {
        let mut pacer = TickLoop::new(TickLoopConfig {
            interval_ms: self.config.tick_interval_ms,
            ..TickLoopConfig::default()
        });
        tracing::info!(realm = %self.config.realm, "world running");

        loop {
            let elapsed_ms = pacer.wait().await;
            if let Some(code) = self.update(elapsed_ms) {
                self.stop();
                return code;
            }
            pacer.record_tick_end();
        }
    }

    /// One world update. The step order is a correctness requirement:
    ///
    /// 1. advance every interval timer
    /// 2. advance the game clock, capturing the whole-second delta
    /// 3. drain pending admissions
    /// 4. update sessions, reaping the dead
    /// 5. fire due periodic tasks
    /// 6. drain operator commands
    /// 7. evaluate the shutdown countdown
    ///
    /// Returns the exit code once a shutdown has fired.
    pub fn update(&mut self, elapsed_ms: u64) -> Option<ExitCode> {
        self.timers.advance_all(elapsed_ms);
        let elapsed_secs = self.clock.advance(elapsed_ms);

        self.drain_admissions();
        self.directory.update_all(elapsed_ms);
        self.run_periodic_tasks();
        self.drain_commands();

        let event = self
            .shutdown
            .tick(elapsed_secs, self.directory.total_count());
        self.apply_shutdown_event(event);

        // Covers fires from the tick above and from commands in step 6.
        self.shutdown.exit_code()
    }

    fn drain_admissions(&mut self) {
        while let Ok(session) = self.session_rx.try_recv() {
            let admission = self.directory.admit(session);
            // The population ratio is recomputed on admission events only.
            if admission == Admission::Admitted {
                if let Some(ratio) = self.directory.population_ratio() {
                    if let Err(error) = self.store.save_population(self.config.realm, ratio) {
                        tracing::warn!(%error, "population save failed");
                    }
                }
            }
        }
    }

    /// Fires every due periodic task. Timers are reset *before* the effect
    /// runs, so a failing task still retries on its normal period; failures
    /// never touch the other tasks or the tick.
    fn run_periodic_tasks(&mut self) {
        if self.timers.uptime.elapsed() {
            self.timers.uptime.reset();
            if let Err(error) = self.store.save_uptime(
                self.config.realm,
                self.clock.uptime_secs(),
                self.directory.peak_active(),
            ) {
                tracing::warn!(%error, "uptime save failed");
            }
        }

        if self.timers.mail.elapsed() {
            self.timers.mail.reset();
            if let Err(error) = self.hooks.expire_stale_mail() {
                tracing::warn!(%error, "mail expiry failed");
            }
        }

        if self.timers.events.elapsed() {
            self.timers.events.reset();
            match self.hooks.resolve_due_events(self.clock.now_unix()) {
                Ok(next) if !next.is_zero() => self.timers.events.set_interval(next),
                Ok(_) => {}
                Err(error) => tracing::warn!(%error, "event resolution failed"),
            }
        }

        if self.timers.purge.elapsed() {
            self.timers.purge.reset();
            if let Err(error) = self.hooks.purge_ephemeral_state() {
                tracing::warn!(%error, "ephemeral purge failed");
            }
        }

        if self.timers.maintenance.elapsed() {
            self.timers.maintenance.reset();
            self.check_maintenance();
        }
    }

    /// When today reaches the stored maintenance day, requests a restart
    /// countdown and rolls the date forward a week (repeatedly, if the
    /// server slept through several windows).
    fn check_maintenance(&mut self) {
        if self.clock.today() < self.maintenance_day {
            return;
        }

        // An operator countdown already in flight takes precedence.
        if !self.shutdown.is_counting() && !self.shutdown.is_firing() {
            tracing::info!(day = self.maintenance_day, "maintenance window reached");
            let event = self.shutdown.request(
                self.config.maintenance_delay_secs,
                ShutdownFlags {
                    restart: true,
                    idle: false,
                },
                ExitCode::Restart,
                self.directory.total_count(),
            );
            self.apply_shutdown_event(event);
        }

        while self.maintenance_day <= self.clock.today() {
            self.maintenance_day += MAINTENANCE_PERIOD_DAYS;
        }
        if let Err(error) = self
            .store
            .save_maintenance_day(self.config.realm, self.maintenance_day)
        {
            tracing::warn!(%error, "maintenance date save failed");
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(request) = self.command_rx.try_recv() {
            let result = self.execute(request.command.clone());
            request.complete(result);
        }
    }

    fn execute(&mut self, command: AdminCommand) -> Result<(), WorldError> {
        match command {
            AdminCommand::Shutdown {
                delay_secs,
                flags,
                exit_code,
            } => {
                let event = self.shutdown.request(
                    delay_secs,
                    flags,
                    exit_code,
                    self.directory.total_count(),
                );
                self.apply_shutdown_event(event);
                Ok(())
            }
            AdminCommand::CancelShutdown => {
                let event = self.shutdown.cancel();
                self.apply_shutdown_event(event);
                Ok(())
            }
            AdminCommand::Kick { account } => Ok(self.directory.kick(account)?),
            AdminCommand::Ban { account } => {
                self.store.record_ban(account)?;
                // A ban with no live session is still a success.
                match self.directory.kick(account) {
                    Ok(()) | Err(SessionError::NotFound(_)) => Ok(()),
                    Err(error) => Err(error.into()),
                }
            }
            AdminCommand::Unban { account } => Ok(self.store.clear_ban(account)?),
            AdminCommand::SetLimit { raw } => {
                let limit = SessionLimit::from_raw(raw);
                let old_tier = self.directory.limit().min_tier();
                self.directory.set_limit(limit);

                let tier = limit.min_tier();
                if tier > SecurityTier::Player {
                    self.directory.kick_all_below(tier);
                }
                if tier != old_tier {
                    self.store.save_min_tier(self.config.realm, tier)?;
                }
                tracing::info!(?limit, "session limit changed");
                Ok(())
            }
            AdminCommand::Announce { text } => {
                self.directory.broadcast(ServerNotice::Broadcast { text });
                Ok(())
            }
        }
    }

    fn apply_shutdown_event(&mut self, event: Option<ShutdownEvent>) {
        match event {
            Some(ShutdownEvent::Notice(notice)) => self.directory.broadcast(notice),
            // The exit code is picked up at the end of the tick.
            Some(ShutdownEvent::Fire(_)) | None => {}
        }
    }

    /// Final teardown once the shutdown has fired: every remaining session
    /// is kicked and reaped, queue first.
    fn stop(&mut self) {
        self.directory.kick_all();
        self.directory.update_all(0);
        tracing::info!(realm = %self.config.realm, "world stopped");
    }

    /// The session directory, for between-tick snapshots.
    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    /// The shutdown controller, for between-tick snapshots.
    pub fn shutdown(&self) -> &ShutdownController {
        &self.shutdown
    }

    /// The game clock.
    pub fn clock(&self) -> &GameClock {
        &self.clock
    }
}
