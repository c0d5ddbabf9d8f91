//! World configuration.

use realmgate_protocol::RealmId;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tunables for the world orchestrator.
///
/// Loaded from the server's config file by the host binary; every field has
/// a workable default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// This realm's identity in the shared store.
    pub realm: RealmId,

    /// Raw capacity value, decoded by
    /// [`SessionLimit::from_raw`](realmgate_session::SessionLimit::from_raw):
    /// `0` open, positive cap, negative tier lock.
    pub session_limit: i32,

    /// Disconnect sessions idle for this many seconds. `None` disables the
    /// idle check.
    pub idle_timeout_secs: Option<u64>,

    /// Heartbeat period of the world-update loop, in milliseconds.
    pub tick_interval_ms: u64,

    /// How often the uptime record is persisted.
    pub uptime_interval_secs: u64,

    /// How often stale mail is expired.
    pub mail_interval_secs: u64,

    /// Initial period of the timed-event check; after the first firing the
    /// hooks report the real time to the next event.
    pub event_interval_secs: u64,

    /// How often aged ephemeral world state is purged.
    pub purge_interval_secs: u64,

    /// How often the maintenance date is compared against today.
    pub maintenance_check_secs: u64,

    /// Countdown length of the restart requested when a maintenance day
    /// arrives.
    pub maintenance_delay_secs: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            realm: RealmId(1),
            session_limit: 0,
            idle_timeout_secs: None,
            tick_interval_ms: 50,
            uptime_interval_secs: 600,
            mail_interval_secs: 3_600,
            event_interval_secs: 60,
            purge_interval_secs: 1_200,
            maintenance_check_secs: 3_600,
            maintenance_delay_secs: 300,
        }
    }
}

impl WorldConfig {
    /// Returns a copy with out-of-range values clamped to workable ones.
    /// Logs a warning for each adjustment; bad config is never fatal.
    pub fn validated(&self) -> Self {
        let mut config = self.clone();
        for (name, value) in [
            ("uptime_interval_secs", &mut config.uptime_interval_secs),
            ("mail_interval_secs", &mut config.mail_interval_secs),
            ("event_interval_secs", &mut config.event_interval_secs),
            ("purge_interval_secs", &mut config.purge_interval_secs),
            ("maintenance_check_secs", &mut config.maintenance_check_secs),
        ] {
            if *value == 0 {
                warn!(field = name, "interval of zero clamped to 1s");
                *value = 1;
            }
        }
        config
    }
}
