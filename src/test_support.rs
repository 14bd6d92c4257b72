//! Test doubles shared across unit tests

use aliri_clock::{Clock, UnixTime};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A clock that multiple holders can advance in concert
#[derive(Clone, Debug, Default)]
pub(crate) struct SharedClock(Arc<AtomicU64>);

impl SharedClock {
    pub(crate) fn at(start: u64) -> Self {
        let clock = Self::default();
        clock.0.store(start, Ordering::SeqCst);
        clock
    }

    pub(crate) fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for SharedClock {
    fn now(&self) -> UnixTime {
        UnixTime(self.0.load(Ordering::SeqCst))
    }
}
