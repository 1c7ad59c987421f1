//! ## dtnpool-core::alloc::stats
//! **Block pool usage counters**
//!
//! Counters are atomics so a shared [`Pool`](crate::shared::Pool) can report
//! them without taking the admin lock.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

/// Usage counters of one block pool.
#[derive(Debug, Default)]
pub struct PoolStats {
    allocations: AtomicUsize,
    alloc_failures: AtomicUsize,
    recycles: AtomicUsize,
    collected: AtomicUsize,
    quarantined: AtomicUsize,
    jobs_activated: AtomicUsize,
    jobs_dispatched: AtomicUsize,
    high_water: AtomicUsize,
}

/// Point-in-time copy of [`PoolStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub allocations: usize,
    pub alloc_failures: usize,
    pub recycles: usize,
    pub collected: usize,
    pub quarantined: usize,
    pub jobs_activated: usize,
    pub jobs_dispatched: usize,
    pub high_water: usize,
}

impl PoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one allocation; `in_use` is the count after it.
    #[inline]
    pub(crate) fn record_allocation(&self, in_use: usize) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.high_water.fetch_max(in_use, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_alloc_failure(&self) {
        self.alloc_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_recycles(&self, count: usize) {
        self.recycles.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_collected(&self, count: usize) {
        self.collected.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_quarantine(&self) {
        self.quarantined.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_activation(&self) {
        self.jobs_activated.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dispatch(&self) {
        self.jobs_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn alloc_failures(&self) -> usize {
        self.alloc_failures.load(Ordering::Relaxed)
    }

    pub fn recycles(&self) -> usize {
        self.recycles.load(Ordering::Relaxed)
    }

    pub fn collected(&self) -> usize {
        self.collected.load(Ordering::Relaxed)
    }

    pub fn quarantined(&self) -> usize {
        self.quarantined.load(Ordering::Relaxed)
    }

    pub fn jobs_activated(&self) -> usize {
        self.jobs_activated.load(Ordering::Relaxed)
    }

    pub fn jobs_dispatched(&self) -> usize {
        self.jobs_dispatched.load(Ordering::Relaxed)
    }

    /// Highest number of simultaneously lent blocks seen so far.
    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            allocations: self.allocations(),
            alloc_failures: self.alloc_failures(),
            recycles: self.recycles(),
            collected: self.collected(),
            quarantined: self.quarantined(),
            jobs_activated: self.jobs_activated(),
            jobs_dispatched: self.jobs_dispatched(),
            high_water: self.high_water(),
        }
    }
}
