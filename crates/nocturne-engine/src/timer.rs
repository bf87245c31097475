//! Phase timer model.
//!
//! The core stores absolute deadlines and nothing else: no background task
//! ever advances a phase. Clients derive remaining time from the stored
//! timestamp, and a participant (typically the host) invokes the advance
//! operation once the deadline has passed. This keeps the engine free of
//! wall-clock-driven background execution — the same event-driven stance
//! the rest of the actor loop takes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock seam. Production uses [`SystemClock`]; tests pin time with
/// [`ManualClock`] instead of sleeping.
pub trait Clock: Send + Sync + 'static {
    /// Milliseconds since the unix epoch.
    fn now_ms(&self) -> u64;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A hand-advanced clock for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn at(now_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now_ms)),
        }
    }

    pub fn advance_ms(&self, delta: u64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, delta: u64) {
        self.advance_ms(delta * 1000);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// The absolute deadline `secs` from `now_ms`.
pub(crate) fn deadline_after(now_ms: u64, secs: u64) -> u64 {
    now_ms + secs * 1000
}

/// Whether a stored deadline has passed. A missing deadline never expires.
pub(crate) fn expired(deadline: Option<u64>, now_ms: u64) -> bool {
    deadline.is_some_and(|d| now_ms >= d)
}
