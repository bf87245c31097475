//! The Nocturne core engine.
//!
//! Each room is owned by an isolated Tokio task (actor model): every
//! mutating operation is funneled through that single owner, which keeps
//! turn order and role bookkeeping race-free without multi-key store
//! transactions. The external store is used purely for persistence and
//! broadcast — after each successful mutation the actor writes only the
//! paths that changed.
//!
//! # Key types
//!
//! - [`RoomRecord`] — the authoritative in-memory room state
//! - [`NightAction`] — the tagged night-action vocabulary
//! - [`RoomManager`] — spawns/hydrates/destroys room actors, routes ops
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`Clock`] — wall-clock seam for the phase timer model

mod actor;
mod lifecycle;
mod manager;
mod night;
mod state;
mod timer;
mod vote;

pub use actor::{spawn_room, RoomHandle, RoomInfo};
pub use manager::RoomManager;
pub use night::NightAction;
pub use state::{
    Dirty, NightRecord, Outcome, PendingAction, PhaseDeadlines, Player, RoleState, RoomMeta,
    RoomRecord, RoomSettings, RoomStatus, WinningSide,
};
pub use timer::{Clock, ManualClock, SystemClock};
