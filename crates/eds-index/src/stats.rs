//! Index statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for index mutations.
///
/// All counters are atomic and safe to read from any thread. These are
/// in-process introspection numbers; the contractual metrics are emitted
/// through the `metrics` facade by the orchestrator and push paths.
#[derive(Debug, Default)]
pub struct IndexStats {
    upserts: AtomicU64,
    shard_removals: AtomicU64,
    service_removals: AtomicU64,
    full_push_triggers: AtomicU64,
}

impl IndexStats {
    /// Create zeroed statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a shard upsert (including empty-list upserts).
    #[inline]
    pub fn record_upsert(&self) {
        self.upserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a shard removal.
    #[inline]
    pub fn record_shard_removal(&self) {
        self.shard_removals.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a service removal.
    #[inline]
    pub fn record_service_removal(&self) {
        self.service_removals.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an upsert that warranted a full push.
    #[inline]
    pub fn record_full_push_trigger(&self) {
        self.full_push_triggers.fetch_add(1, Ordering::Relaxed);
    }

    /// Total shard upserts.
    #[inline]
    #[must_use]
    pub fn upserts(&self) -> u64 {
        self.upserts.load(Ordering::Relaxed)
    }

    /// Total shard removals.
    #[inline]
    #[must_use]
    pub fn shard_removals(&self) -> u64 {
        self.shard_removals.load(Ordering::Relaxed)
    }

    /// Total service removals.
    #[inline]
    #[must_use]
    pub fn service_removals(&self) -> u64 {
        self.service_removals.load(Ordering::Relaxed)
    }

    /// Total full-push triggers.
    #[inline]
    #[must_use]
    pub fn full_push_triggers(&self) -> u64 {
        self.full_push_triggers.load(Ordering::Relaxed)
    }
}
