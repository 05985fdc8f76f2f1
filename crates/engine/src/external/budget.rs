//! Shared external-call counter.
//!
//! One `TrialBudget` is shared (via `Arc`) by every solve running in the
//! process, so concurrent requests cannot jointly overrun the service quota.
//! The check and the increment happen in a single atomic update.

use std::sync::atomic::{AtomicU32, Ordering};

/// Atomic counter of external solver calls.
#[derive(Debug, Default)]
pub struct TrialBudget {
    used: AtomicU32,
}

impl TrialBudget {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims one call if fewer than `limit` have been made.
    ///
    /// Returns the 1-based number of the claimed call, or `None` when the
    /// budget is exhausted.
    pub fn try_acquire(&self, limit: u32) -> Option<u32> {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < limit).then_some(used + 1)
            })
            .ok()
            .map(|previous| previous + 1)
    }

    /// Counts a call without enforcing a cap. Returns the new total.
    pub fn record(&self) -> u32 {
        self.used.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }

    #[must_use]
    pub fn used(&self) -> u32 {
        self.used.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn remaining(&self, limit: u32) -> u32 {
        limit.saturating_sub(self.used())
    }

    #[must_use]
    pub fn is_exhausted(&self, limit: u32) -> bool {
        self.used() >= limit
    }

    /// Sets the counter back to zero.
    pub fn reset(&self) {
        self.used.store(0, Ordering::Release);
    }
}
