//! In-flight write counter
//!
//! Counts events that have been enqueued but not yet durably committed or
//! failed. Producers increment at enqueue time; the commit worker decrements
//! at commit-completion time, success or failure alike, so `wait()` is a
//! correct flush barrier and cannot deadlock on a write error.

use parking_lot::{Condvar, Mutex};

/// Counter with a blocking wait-for-zero
#[derive(Debug, Default)]
pub struct PendingWrites {
    count: Mutex<u64>,
    zero: Condvar,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge one in-flight write (called by the enqueueing thread)
    pub fn add(&self) {
        *self.count.lock() += 1;
    }

    /// Retire one in-flight write (called by the commit worker)
    pub fn done(&self) {
        let mut count = self.count.lock();
        debug_assert!(*count > 0, "pending-write counter underflow");
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.zero.notify_all();
        }
    }

    /// Block until the counter reaches zero
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.zero.wait(&mut count);
        }
    }

    /// Current in-flight count (racy; for logging and tests)
    pub fn in_flight(&self) -> u64 {
        *self.count.lock()
    }
}
