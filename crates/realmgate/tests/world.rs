//! Integration tests for the world orchestrator: admission handoff, tick
//! ordering, periodic tasks, the admin command surface, and shutdown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use realmgate::protocol::{
    AccountId, AuthResponse, RealmId, SecurityTier, ServerNotice, SessionMessage,
};
use realmgate::session::Session;
use realmgate::{
    AdminCommand, CommandRequest, ExitCode, ShutdownFlags, StoreError, World, WorldConfig,
    WorldError, WorldHandle, WorldHooks, WorldStore,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

// =========================================================================
// Mock collaborators
// =========================================================================

#[derive(Default)]
struct Recording {
    populations: Vec<f32>,
    uptimes: Vec<(u64, u32)>,
    maintenance_days: Vec<u64>,
    min_tiers: Vec<SecurityTier>,
    bans: Vec<AccountId>,
    unbans: Vec<AccountId>,
    mail_attempts: u32,
    event_runs: u32,
    purge_runs: u32,
}

type Shared = Arc<Mutex<Recording>>;

#[derive(Clone, Default)]
struct MockStore {
    recording: Shared,
    stored_maintenance_day: Option<u64>,
}

impl WorldStore for MockStore {
    fn save_population(&mut self, _realm: RealmId, ratio: f32) -> Result<(), StoreError> {
        self.recording.lock().unwrap().populations.push(ratio);
        Ok(())
    }

    fn save_uptime(
        &mut self,
        _realm: RealmId,
        uptime_secs: u64,
        peak_active: u32,
    ) -> Result<(), StoreError> {
        self.recording
            .lock()
            .unwrap()
            .uptimes
            .push((uptime_secs, peak_active));
        Ok(())
    }

    fn load_maintenance_day(&mut self, _realm: RealmId) -> Result<Option<u64>, StoreError> {
        Ok(self.stored_maintenance_day)
    }

    fn save_maintenance_day(&mut self, _realm: RealmId, day: u64) -> Result<(), StoreError> {
        self.recording.lock().unwrap().maintenance_days.push(day);
        Ok(())
    }

    fn save_min_tier(&mut self, _realm: RealmId, tier: SecurityTier) -> Result<(), StoreError> {
        self.recording.lock().unwrap().min_tiers.push(tier);
        Ok(())
    }

    fn record_ban(&mut self, account: AccountId) -> Result<(), StoreError> {
        self.recording.lock().unwrap().bans.push(account);
        Ok(())
    }

    fn clear_ban(&mut self, account: AccountId) -> Result<(), StoreError> {
        self.recording.lock().unwrap().unbans.push(account);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct MockHooks {
    recording: Shared,
    fail_mail: bool,
    next_event_window: Option<Duration>,
}

impl WorldHooks for MockHooks {
    fn expire_stale_mail(&mut self) -> Result<(), StoreError> {
        self.recording.lock().unwrap().mail_attempts += 1;
        if self.fail_mail {
            return Err(StoreError::Unavailable("mail table locked".into()));
        }
        Ok(())
    }

    fn resolve_due_events(&mut self, _now_unix: u64) -> Result<Duration, StoreError> {
        self.recording.lock().unwrap().event_runs += 1;
        Ok(self.next_event_window.unwrap_or(Duration::ZERO))
    }

    fn purge_ephemeral_state(&mut self) -> Result<(), StoreError> {
        self.recording.lock().unwrap().purge_runs += 1;
        Ok(())
    }
}

// =========================================================================
// Harness helpers
// =========================================================================

/// Config with every periodic task on a one-second period, so a single
/// one-second update fires them all.
fn fast_config(session_limit: i32) -> WorldConfig {
    WorldConfig {
        session_limit,
        uptime_interval_secs: 1,
        mail_interval_secs: 1,
        event_interval_secs: 1,
        purge_interval_secs: 1,
        maintenance_check_secs: 1,
        ..WorldConfig::default()
    }
}

fn build(
    config: WorldConfig,
) -> (World<MockStore, MockHooks>, WorldHandle, Shared) {
    let recording = Shared::default();
    let store = MockStore {
        recording: Arc::clone(&recording),
        stored_maintenance_day: None,
    };
    let hooks = MockHooks {
        recording: Arc::clone(&recording),
        ..MockHooks::default()
    };
    let (world, handle) = World::new(config, store, hooks);
    (world, handle, recording)
}

fn connect(handle: &WorldHandle, id: u64) -> UnboundedReceiver<SessionMessage> {
    connect_tier(handle, id, SecurityTier::Player)
}

fn connect_tier(
    handle: &WorldHandle,
    id: u64,
    tier: SecurityTier,
) -> UnboundedReceiver<SessionMessage> {
    let (tx, rx) = mpsc::unbounded_channel();
    handle
        .submit_session(Session::new(AccountId(id), tier, tx))
        .unwrap();
    rx
}

fn drain(rx: &mut UnboundedReceiver<SessionMessage>) -> Vec<SessionMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

fn submit(handle: &WorldHandle, command: AdminCommand) -> tokio::sync::oneshot::Receiver<Result<(), WorldError>> {
    let (request, done) = CommandRequest::with_callback(command);
    handle.submit_command(request).unwrap();
    done
}

// =========================================================================
// Admission handoff
// =========================================================================

#[test]
fn test_submitted_sessions_admitted_on_next_tick() {
    let (mut world, handle, recording) = build(fast_config(10));
    let mut a = connect(&handle, 1);
    let mut b = connect(&handle, 2);

    // Nothing happens until the tick drains the handoff queue.
    assert_eq!(world.directory().total_count(), 0);

    world.update(50);
    assert_eq!(world.directory().active_count(), 2);
    assert_eq!(
        drain(&mut a),
        vec![SessionMessage::Auth(AuthResponse::Admitted)]
    );
    assert_eq!(
        drain(&mut b),
        vec![SessionMessage::Auth(AuthResponse::Admitted)]
    );

    // Population ratio reported per admission: 2 of 10, scaled by two.
    let rec = recording.lock().unwrap();
    assert_eq!(rec.populations.len(), 2);
    assert_eq!(rec.populations[1], 0.4);
}

#[test]
fn test_queueing_and_promotion_through_world() {
    let (mut world, handle, _) = build(fast_config(1));
    let a = connect(&handle, 1);
    let mut b = connect(&handle, 2);
    world.update(50);

    assert_eq!(
        drain(&mut b),
        vec![SessionMessage::Auth(AuthResponse::Queued { position: 1 })]
    );

    // a hangs up; the next tick reaps it and promotes b.
    drop(a);
    world.update(50);
    assert_eq!(world.directory().active_count(), 1);
    assert_eq!(world.directory().queued_count(), 0);
    assert_eq!(
        drain(&mut b),
        vec![SessionMessage::Auth(AuthResponse::Queued { position: 0 })]
    );
}

// =========================================================================
// Periodic tasks
// =========================================================================

#[test]
fn test_failed_task_isolated_and_retried() {
    // One failing hook must not stop the other due tasks, and its timer is
    // still reset so it retries a period later.
    let recording = Shared::default();
    let store = MockStore {
        recording: Arc::clone(&recording),
        stored_maintenance_day: None,
    };
    let hooks = MockHooks {
        recording: Arc::clone(&recording),
        fail_mail: true,
        next_event_window: None,
    };
    let (mut world, _handle) = World::new(fast_config(0), store, hooks);

    world.update(1_000);
    {
        let rec = recording.lock().unwrap();
        assert_eq!(rec.mail_attempts, 1);
        assert_eq!(rec.uptimes.len(), 1);
        assert_eq!(rec.purge_runs, 1);
        assert_eq!(rec.event_runs, 1);
    }

    world.update(1_000);
    assert_eq!(recording.lock().unwrap().mail_attempts, 2);
}

#[test]
fn test_uptime_record_carries_peak_sessions() {
    let (mut world, handle, recording) = build(fast_config(10));
    let _a = connect(&handle, 1);
    let _b = connect(&handle, 2);
    world.update(1_000);

    let rec = recording.lock().unwrap();
    assert_eq!(rec.uptimes, vec![(1, 2)]);
}

#[test]
fn test_event_hook_rearms_timer_with_reported_window() {
    let recording = Shared::default();
    let store = MockStore {
        recording: Arc::clone(&recording),
        stored_maintenance_day: None,
    };
    let hooks = MockHooks {
        recording: Arc::clone(&recording),
        fail_mail: false,
        next_event_window: Some(Duration::from_secs(5)),
    };
    let (mut world, _handle) = World::new(fast_config(0), store, hooks);

    world.update(1_000);
    assert_eq!(recording.lock().unwrap().event_runs, 1);

    // The hook reported five seconds to the next event; four more seconds
    // pass without a firing.
    for _ in 0..4 {
        world.update(1_000);
    }
    assert_eq!(recording.lock().unwrap().event_runs, 1);

    world.update(1_000);
    assert_eq!(recording.lock().unwrap().event_runs, 2);
}

#[test]
fn test_maintenance_day_requests_restart_and_rolls_forward() {
    // A maintenance day far in the past: the first check requests a
    // restart countdown and rolls the date past today in one go.
    let recording = Shared::default();
    let store = MockStore {
        recording: Arc::clone(&recording),
        stored_maintenance_day: Some(0),
    };
    let hooks = MockHooks {
        recording: Arc::clone(&recording),
        ..MockHooks::default()
    };
    let (mut world, _handle) = World::new(fast_config(0), store, hooks);

    world.update(1_000);
    assert!(world.shutdown().is_counting());
    assert_eq!(
        world.shutdown().flags(),
        Some(ShutdownFlags {
            restart: true,
            idle: false
        })
    );
    // The countdown started at 300 during this tick; the tick's own second
    // has already been consumed by the shutdown evaluation step.
    assert_eq!(world.shutdown().remaining_secs(), Some(299));

    let today = world.clock().today();
    let rec = recording.lock().unwrap();
    let rolled = *rec.maintenance_days.last().unwrap();
    assert!(rolled > today);
    assert!(rolled - today <= 7);
    assert_eq!(rolled % 7, 0);
}

// =========================================================================
// Admin commands
// =========================================================================

#[test]
fn test_kick_command_completes_and_removes_session() {
    let (mut world, handle, _) = build(fast_config(0));
    let mut a = connect(&handle, 1);
    world.update(50);
    drain(&mut a);

    let mut done = submit(&handle, AdminCommand::Kick {
        account: AccountId(1),
    });
    world.update(50);
    assert!(matches!(done.try_recv(), Ok(Ok(()))));
    assert_eq!(
        drain(&mut a),
        vec![SessionMessage::Notice(ServerNotice::Kicked)]
    );

    // Removal lands at the next tick boundary.
    world.update(50);
    assert!(world.directory().is_empty());
}

#[test]
fn test_kick_unknown_account_reports_error() {
    let (mut world, handle, _) = build(fast_config(0));
    let mut done = submit(&handle, AdminCommand::Kick {
        account: AccountId(99),
    });
    world.update(50);
    assert!(matches!(
        done.try_recv(),
        Ok(Err(WorldError::Session(_)))
    ));
}

#[test]
fn test_ban_records_and_kicks_live_session() {
    let (mut world, handle, recording) = build(fast_config(0));
    let _a = connect(&handle, 1);
    world.update(50);

    let mut done = submit(&handle, AdminCommand::Ban {
        account: AccountId(1),
    });
    world.update(50);
    assert!(matches!(done.try_recv(), Ok(Ok(()))));
    assert_eq!(recording.lock().unwrap().bans, vec![AccountId(1)]);

    world.update(50);
    assert!(world.directory().is_empty());

    // Banning an offline account is still a success.
    let mut done = submit(&handle, AdminCommand::Ban {
        account: AccountId(2),
    });
    world.update(50);
    assert!(matches!(done.try_recv(), Ok(Ok(()))));

    let mut done = submit(&handle, AdminCommand::Unban {
        account: AccountId(2),
    });
    world.update(50);
    assert!(matches!(done.try_recv(), Ok(Ok(()))));
    assert_eq!(recording.lock().unwrap().unbans, vec![AccountId(2)]);
}

#[test]
fn test_set_limit_tier_lock_kicks_below_and_persists() {
    let (mut world, handle, recording) = build(fast_config(0));
    let _player = connect(&handle, 1);
    let _gm = connect_tier(&handle, 2, SecurityTier::GameMaster);
    world.update(50);

    let mut done = submit(&handle, AdminCommand::SetLimit { raw: -2 });
    world.update(50);
    assert!(matches!(done.try_recv(), Ok(Ok(()))));
    assert_eq!(
        recording.lock().unwrap().min_tiers,
        vec![SecurityTier::GameMaster]
    );

    world.update(50);
    assert!(world.directory().get(&AccountId(1)).is_none());
    assert!(world.directory().get(&AccountId(2)).is_some());
}

#[test]
fn test_announce_reaches_active_sessions_only() {
    let (mut world, handle, _) = build(fast_config(1));
    let mut active = connect(&handle, 1);
    let mut queued = connect(&handle, 2);
    world.update(50);
    drain(&mut active);
    drain(&mut queued);

    submit(&handle, AdminCommand::Announce {
        text: "realm restarting for maintenance tonight".into(),
    });
    world.update(50);

    assert_eq!(
        drain(&mut active),
        vec![SessionMessage::Notice(ServerNotice::Broadcast {
            text: "realm restarting for maintenance tonight".into()
        })]
    );
    assert!(drain(&mut queued).is_empty());
}

// =========================================================================
// Shutdown
// =========================================================================

#[test]
fn test_shutdown_countdown_broadcasts_then_fires() {
    let (mut world, handle, _) = build(fast_config(0));
    let mut a = connect(&handle, 1);
    world.update(50);
    drain(&mut a);

    submit(&handle, AdminCommand::Shutdown {
        delay_secs: 2,
        flags: ShutdownFlags::default(),
        exit_code: ExitCode::Shutdown,
    });
    assert_eq!(world.update(50), None);
    assert_eq!(
        drain(&mut a),
        vec![SessionMessage::Notice(ServerNotice::ShutdownTime {
            secs_remaining: 2
        })]
    );

    assert_eq!(world.update(1_000), None);
    assert_eq!(world.update(1_000), Some(ExitCode::Shutdown));
}

#[test]
fn test_cancel_restart_notifies_and_resets() {
    let (mut world, handle, _) = build(fast_config(0));
    let mut a = connect(&handle, 1);
    world.update(50);
    drain(&mut a);

    submit(&handle, AdminCommand::Shutdown {
        delay_secs: 600,
        flags: ShutdownFlags {
            restart: true,
            idle: false,
        },
        exit_code: ExitCode::Restart,
    });
    world.update(50);
    assert!(world.shutdown().is_counting());

    submit(&handle, AdminCommand::CancelShutdown);
    world.update(50);
    assert!(!world.shutdown().is_counting());

    let messages = drain(&mut a);
    assert_eq!(
        messages,
        vec![
            SessionMessage::Notice(ServerNotice::RestartTime { secs_remaining: 600 }),
            SessionMessage::Notice(ServerNotice::RestartCancelled),
        ]
    );
}

#[test]
fn test_cancel_with_no_countdown_succeeds_quietly() {
    let (mut world, handle, _) = build(fast_config(0));
    let mut done = submit(&handle, AdminCommand::CancelShutdown);
    world.update(50);
    assert!(matches!(done.try_recv(), Ok(Ok(()))));
    assert!(!world.shutdown().is_counting());
}

#[test]
fn test_idle_shutdown_waits_for_realm_to_empty() {
    // Zero delay plus wait-for-idle with sessions online: the world keeps
    // ticking; the moment the realm empties, it fires.
    let (mut world, handle, _) = build(fast_config(0));
    let clients: Vec<_> = (1..=3).map(|id| connect(&handle, id)).collect();
    world.update(50);

    submit(&handle, AdminCommand::Shutdown {
        delay_secs: 0,
        flags: ShutdownFlags {
            restart: false,
            idle: true,
        },
        exit_code: ExitCode::Shutdown,
    });
    assert_eq!(world.update(50), None);
    assert!(world.shutdown().is_counting());
    assert_eq!(world.shutdown().remaining_secs(), Some(1));

    // Still occupied a second later.
    assert_eq!(world.update(1_000), None);

    // Everyone hangs up; the session pump runs before the shutdown check
    // within the same tick, so this tick fires.
    drop(clients);
    assert_eq!(world.update(1_000), Some(ExitCode::Shutdown));
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_stops_with_requested_exit_code() {
    let (world, handle, _) = build(fast_config(0));
    let mut a = connect(&handle, 1);

    submit(&handle, AdminCommand::Shutdown {
        delay_secs: 0,
        flags: ShutdownFlags {
            restart: true,
            idle: false,
        },
        exit_code: ExitCode::Restart,
    });

    let code = world.run().await;
    assert_eq!(code, ExitCode::Restart);
    assert_eq!(code.code(), 2);

    // Teardown kicked the surviving session on the way out.
    let messages = drain(&mut a);
    assert!(messages.contains(&SessionMessage::Notice(ServerNotice::Kicked)));
}
