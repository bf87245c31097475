//! The Nocturne role catalog.
//!
//! Pure data plus derivation: every role the engine knows about is described
//! by a static [`RoleDefinition`], and the night order is *computed* by
//! sorting the wake-enabled roles by their order index — there is no
//! hand-maintained sequence to drift out of sync.
//!
//! # Key types
//!
//! - [`RoleId`] — the role enum (travels through the store as a snake_case string)
//! - [`RoleDefinition`] — team, wake behavior, targeting rules
//! - [`night_order`] — the derived wake sequence
//! - [`default_role_set`] — the stock deal for a given player count

mod catalog;

pub use catalog::{
    default_role_set, night_order, RoleCategory, RoleDefinition, RoleId, Team, CENTER_SIZE,
};
