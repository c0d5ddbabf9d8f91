//! # Realmgate
//!
//! Orchestration core for a persistent, always-on multiplayer realm server.
//!
//! Realmgate admits and tracks client sessions under a hard capacity limit,
//! drives every periodic subsystem from a single heartbeat, and manages an
//! orderly, cancellable shutdown. It deliberately does *not* know about
//! sockets, packets, or game rules: the network layer hands it
//! authenticated sessions through a [`WorldHandle`], and persistent storage
//! and game-state effects sit behind the [`WorldStore`] and [`WorldHooks`]
//! traits.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use realmgate::{World, WorldConfig};
//! # use realmgate::{WorldStore, WorldHooks};
//! # fn demo(store: impl WorldStore, hooks: impl WorldHooks) {
//! realmgate::init_tracing();
//!
//! let (world, handle) = World::new(WorldConfig::default(), store, hooks);
//! // Hand `handle` to the network layer and operator tooling, then:
//! // let exit_code = world.run().await;
//! # let _ = (world, handle);
//! # }
//! ```

mod command;
mod config;
mod error;
mod shutdown;
mod store;
mod world;

pub use command::{AdminCommand, CommandRequest};
pub use config::WorldConfig;
pub use error::WorldError;
pub use shutdown::{ExitCode, ShutdownController, ShutdownEvent, ShutdownFlags};
pub use store::{StoreError, WorldHooks, WorldStore};
pub use world::{World, WorldHandle};

pub use realmgate_protocol as protocol;
pub use realmgate_session as session;
pub use realmgate_tick as tick;

/// Initializes the process-wide `tracing` subscriber, honoring `RUST_LOG`
/// and defaulting to `info`. Safe to call more than once; later calls are
/// no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
