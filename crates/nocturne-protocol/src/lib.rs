//! Shared vocabulary for the Nocturne game core.
//!
//! Every layer of the engine speaks in terms of the types defined here:
//!
//! - [`RoomId`] / [`PlayerId`] — opaque identity newtypes
//! - [`GameError`] — the error taxonomy returned to callers
//! - [`ActionReply`] — the uniform `{ success, error?, data? }` result
//!   shape exposed to the UI/API layer

mod error;
mod reply;
mod types;

pub use error::GameError;
pub use reply::ActionReply;
pub use types::{PlayerId, RoomId};
