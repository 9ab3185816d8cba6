//! Wall clock sources
//!
//! Everything time-dependent reads "now" through `WallClock`, so tests and the
//! simulator can drive virtual time.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time in ms since the UNIX epoch
pub trait WallClock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// System wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now_millis(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_millis() as i64,
            // Clock set before 1970
            Err(e) => -(e.duration().as_millis() as i64),
        }
    }
}

/// Manually driven clock. Clones share the same instant.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock starting at `start_millis`
    pub fn new(start_millis: i64) -> Self {
        ManualClock {
            now: Arc::new(AtomicI64::new(start_millis)),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Move forward by `delta_millis` and return the new instant
    pub fn advance(&self, delta_millis: i64) -> i64 {
        self.now.fetch_add(delta_millis, Ordering::SeqCst) + delta_millis
    }
}

impl WallClock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: WallClock + ?Sized> WallClock for Arc<C> {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}
