//! In-memory [`Store`] implementation.
//!
//! One JSON tree behind a mutex, plus a broadcast channel per subscribed
//! path. Good enough for tests and single-process deployments; the hosted
//! backend adapter replaces this in production.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{broadcast, Mutex};

use crate::{Store, StoreError, StoreEvent};

/// Buffered events per subscriber before the channel lags.
const SUBSCRIBE_BUFFER: usize = 64;

struct Inner {
    root: Mutex<Value>,
    subscribers: std::sync::Mutex<HashMap<String, broadcast::Sender<StoreEvent>>>,
}

/// A process-local store holding one JSON tree.
///
/// Cheap to clone — clones share the same tree.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                root: Mutex::new(Value::Object(Map::new())),
                subscribers: std::sync::Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Notifies every subscriber whose subtree overlaps `path`.
    ///
    /// Overlap is prefix containment in either direction: a subscriber of
    /// `rooms/r1` sees a write to `rooms/r1/meta`, and a subscriber of
    /// `rooms/r1/meta` sees `rooms/r1` being replaced or removed.
    fn notify(&self, path: &str, value: Option<Value>) {
        let mut subs = self
            .inner
            .subscribers
            .lock()
            .expect("subscriber map poisoned");
        subs.retain(|sub_path, sender| {
            if sender.receiver_count() == 0 {
                return false;
            }
            if overlaps(sub_path, path) {
                tracing::trace!(%path, subscriber = %sub_path, "store change fan-out");
                let _ = sender.send(StoreEvent {
                    path: path.to_string(),
                    value: value.clone(),
                });
            }
            true
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn overlaps(a: &str, b: &str) -> bool {
    a == b
        || (b.len() > a.len() && b.starts_with(a) && b.as_bytes()[a.len()] == b'/')
        || (a.len() > b.len() && a.starts_with(b) && a.as_bytes()[b.len()] == b'/')
}

fn segments(path: &str) -> Result<Vec<&str>, StoreError> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    let segs: Vec<&str> = path.split('/').collect();
    if segs.iter().any(|s| s.is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segs)
}

/// Descends to the object that should contain the final segment, creating
/// missing intermediates. Returns the parent object and the final key.
fn descend_mut<'a>(
    root: &'a mut Value,
    segs: &[&str],
    path: &str,
) -> Result<(&'a mut Map<String, Value>, String), StoreError> {
    let mut node = root;
    for seg in &segs[..segs.len() - 1] {
        let map = node
            .as_object_mut()
            .ok_or_else(|| StoreError::NotAnObject(path.to_string()))?;
        node = map
            .entry(seg.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let map = node
        .as_object_mut()
        .ok_or_else(|| StoreError::NotAnObject(path.to_string()))?;
    Ok((map, segs[segs.len() - 1].to_string()))
}

impl Store for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let segs = segments(path)?;
        let root = self.inner.root.lock().await;
        let mut node = &*root;
        for seg in segs {
            match node.as_object().and_then(|m| m.get(seg)) {
                Some(next) => node = next,
                None => return Ok(None),
            }
        }
        Ok(Some(node.clone()))
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let segs = segments(path)?;
        {
            let mut root = self.inner.root.lock().await;
            let (parent, key) = descend_mut(&mut root, &segs, path)?;
            parent.insert(key, value.clone());
        }
        self.notify(path, Some(value));
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let segs = segments(path)?;
        let merged = {
            let mut root = self.inner.root.lock().await;
            let (parent, key) = descend_mut(&mut root, &segs, path)?;
            let slot = parent
                .entry(key)
                .or_insert_with(|| Value::Object(Map::new()));
            let map = slot
                .as_object_mut()
                .ok_or_else(|| StoreError::NotAnObject(path.to_string()))?;
            for (k, v) in fields {
                map.insert(k, v);
            }
            slot.clone()
        };
        self.notify(path, Some(merged));
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let segs = segments(path)?;
        let removed = {
            let mut root = self.inner.root.lock().await;
            let mut node = &mut *root;
            for seg in &segs[..segs.len() - 1] {
                match node.as_object_mut().and_then(|m| m.get_mut(*seg)) {
                    Some(next) => node = next,
                    None => return Ok(()),
                }
            }
            match node.as_object_mut() {
                Some(map) => map.remove(segs[segs.len() - 1]).is_some(),
                None => false,
            }
        };
        if removed {
            self.notify(path, None);
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.read(path).await?.is_some())
    }

    fn subscribe(&self, path: &str) -> broadcast::Receiver<StoreEvent> {
        let mut subs = self
            .inner
            .subscribers
            .lock()
            .expect("subscriber map poisoned");
        subs.entry(path.to_string())
            .or_insert_with(|| broadcast::channel(SUBSCRIBE_BUFFER).0)
            .subscribe()
    }
}
