//! Sync clock and epoch lock
//!
//! [`SyncClock`] owns the time origin ("epoch") that relative frame
//! timestamps are computed against. Before the first Sync the epoch sits at
//! process start, so timestamps count from zero. [`LockGuard`] protects the
//! epoch from accidental resets: once Sync engages the lock, releasing it
//! takes two unlock taps within [`UNLOCK_DEBOUNCE`] of each other. A lone
//! tap only arms the guard. The inversion of the usual double-click rule is
//! intentional: a stray touch must never unlock.

use std::time::Instant;

use crate::constants::UNLOCK_DEBOUNCE;

/// Monotonic clock with a settable epoch
#[derive(Debug, Clone)]
pub struct SyncClock {
    /// Baseline instant, captured at construction
    start: Instant,
    /// Epoch as seconds since `start`; 0.0 means "no epoch set"
    epoch: f64,
}

impl SyncClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            epoch: 0.0,
        }
    }

    /// Seconds elapsed since clock construction
    pub fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Current time relative to the epoch, in seconds
    pub fn relative_timestamp(&self) -> f64 {
        self.relative_at(self.now())
    }

    fn relative_at(&self, now: f64) -> f64 {
        now - self.epoch
    }

    /// Move the epoch to the present moment
    pub fn set_epoch(&mut self) {
        self.epoch = self.now();
    }

    /// Reset the epoch back to clock start
    pub fn clear_epoch(&mut self) {
        self.epoch = 0.0;
    }

    pub fn has_epoch(&self) -> bool {
        self.epoch != 0.0
    }
}

impl Default for SyncClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Debounced guard over the sync epoch
#[derive(Debug, Clone, Default)]
pub struct LockGuard {
    locked: bool,
    last_attempt: Option<Instant>,
}

impl LockGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engage the lock (called by Sync)
    pub fn engage(&mut self) {
        self.locked = true;
        self.last_attempt = None;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Register one unlock tap. Returns `true` if this tap released the lock.
    pub fn unlock_attempt(&mut self) -> bool {
        self.unlock_attempt_at(Instant::now())
    }

    /// Same as [`Self::unlock_attempt`] with an explicit clock reading.
    ///
    /// The first tap, or any tap more than the debounce window after the
    /// previous one, only arms the guard. A tap within the window confirms
    /// and unlocks.
    pub fn unlock_attempt_at(&mut self, now: Instant) -> bool {
        match self.last_attempt {
            Some(prev) if now.duration_since(prev) <= UNLOCK_DEBOUNCE => {
                self.locked = false;
                self.last_attempt = Some(now);
                true
            }
            _ => {
                self.last_attempt = Some(now);
                false
            }
        }
    }
}
