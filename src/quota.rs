//! Per-session provider request quota

use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, info};

/// Counts billable provider fetches against a fixed session ceiling.
///
/// The counter only moves through [`record_fetch`](Self::record_fetch),
/// [`try_acquire`](Self::try_acquire) and [`reset`](Self::reset); nothing
/// resets it on a timer.
#[derive(Debug)]
pub struct QuotaGuard {
    used: AtomicU32,
    limit: u32,
}

/// Point-in-time view of the quota
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
}

impl QuotaGuard {
    pub fn new(limit: u32) -> Self {
        Self {
            used: AtomicU32::new(0),
            limit,
        }
    }

    /// True iff another fetch fits in the session budget.
    pub fn can_fetch(&self) -> bool {
        self.used.load(Ordering::Acquire) < self.limit
    }

    /// Count one fetch attempt.
    pub fn record_fetch(&self) {
        let used = self.used.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(used, limit = self.limit, "Recorded provider fetch");
    }

    /// Check and record in one atomic step. Returns false, without
    /// recording, when the budget is already spent.
    pub fn try_acquire(&self) -> bool {
        let acquired = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.limit).then_some(used + 1)
            })
            .is_ok();
        if acquired {
            debug!(used = self.used(), limit = self.limit, "Reserved provider fetch");
        }
        acquired
    }

    /// Start a new session budget.
    pub fn reset(&self) {
        let previous = self.used.swap(0, Ordering::AcqRel);
        info!(previous, limit = self.limit, "Photo quota reset");
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used())
    }

    pub fn snapshot(&self) -> QuotaSnapshot {
        let used = self.used();
        QuotaSnapshot {
            used,
            limit: self.limit,
            remaining: self.limit.saturating_sub(used),
        }
    }
}
