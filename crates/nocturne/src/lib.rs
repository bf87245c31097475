//! # Nocturne
//!
//! Round orchestration for a one-night hidden-role party game: secret role
//! deals, strictly ordered night actions that swap roles around the table,
//! a discussion-and-voting day, and outcome computation from the final
//! role assignment.
//!
//! [`GameService`] is the entry point for the UI/API layer. Every
//! operation returns a structured [`ActionReply`] and all room state is
//! mirrored into a subscribable [`Store`](nocturne_store::Store).
//!
//! ```rust,no_run
//! use nocturne::prelude::*;
//!
//! # async fn demo() {
//! let service = GameService::in_memory();
//! service
//!     .create_room(RoomId::from("moon-7"), PlayerId::from("p1"), "Ada".into())
//!     .await;
//! # }
//! ```

mod service;
mod telemetry;

pub use service::GameService;
pub use telemetry::init_tracing;

pub mod prelude {
    pub use nocturne_engine::{NightAction, RoomSettings, RoomStatus, WinningSide};
    pub use nocturne_protocol::{ActionReply, GameError, PlayerId, RoomId};
    pub use nocturne_roles::RoleId;
    pub use nocturne_store::{MemoryStore, Store};

    pub use crate::GameService;
}
