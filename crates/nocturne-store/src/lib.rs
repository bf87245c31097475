//! Store adapter layer for Nocturne.
//!
//! Provides the [`Store`] trait that abstracts over the external realtime
//! key-value store: per-path read/write/subscribe and best-effort partial
//! updates, with **no** cross-path transactions. All cross-field consistency
//! is engineered by the caller (the room actor serializes its own writes).
//!
//! Values are JSON trees addressed by `/`-separated paths, e.g.
//! `rooms/moon-7/players/p1`. Writing a path creates missing intermediate
//! objects; reading a missing path yields `None`.
//!
//! [`MemoryStore`] is the shipped implementation, used by tests and local
//! play. A production deployment implements [`Store`] against the hosted
//! backend instead.

#![allow(async_fn_in_trait)]

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use std::future::Future;

use serde_json::{Map, Value};
use tokio::sync::broadcast;

/// A change notification for a subscribed subtree.
///
/// `value` is the new value at `path`, or `None` when the path was removed.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub path: String,
    pub value: Option<Value>,
}

/// The store seam: everything the engine needs from the external
/// key-value store, and nothing more.
pub trait Store: Send + Sync + 'static {
    /// Reads the value at `path`. `Ok(None)` if nothing is there.
    fn read(&self, path: &str) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    /// Replaces the value at `path`, creating intermediate objects.
    fn write(&self, path: &str, value: Value) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Merges `fields` into the object at `path` without touching sibling
    /// keys. Creates the object if it does not exist yet. This is the
    /// partial update the engine relies on to avoid clobbering concurrent
    /// unrelated writes.
    fn update(
        &self,
        path: &str,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes the value at `path`. Removing a missing path is a no-op.
    fn remove(&self, path: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Whether anything exists at `path`.
    fn exists(&self, path: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Subscribes to changes under `path` (the path itself, its
    /// descendants, and replacements of its ancestors). Best effort:
    /// a slow consumer may observe a lagged receiver.
    fn subscribe(&self, path: &str) -> broadcast::Receiver<StoreEvent>;
}
