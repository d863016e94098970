use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between producers and the batching worker.
#[derive(Debug, Default)]
pub struct AdapterStats {
    /// Records handed to the adapter, before any filtering.
    pub submitted: AtomicU64,
    /// Discarded because the adapter is disabled or the level is too low.
    pub filtered: AtomicU64,
    /// Successfully enqueued into the ingest queue.
    pub enqueued: AtomicU64,
    /// Dropped because the queue was full or the adapter was stopped.
    pub dropped: AtomicU64,
    /// Batches delivered with a 2xx response.
    pub flushes: AtomicU64,
    /// Batches dropped after exhausting retries or failing to encode.
    pub failed_flushes: AtomicU64,
    /// Lines contained in delivered batches.
    pub sent_entries: AtomicU64,
    /// Entries skipped while grouping (unencodable labels or timestamp).
    pub skipped_entries: AtomicU64,
}

/// Point-in-time copy of [`AdapterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub filtered: u64,
    pub enqueued: u64,
    pub dropped: u64,
    pub flushes: u64,
    pub failed_flushes: u64,
    pub sent_entries: u64,
    pub skipped_entries: u64,
}

impl AdapterStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            failed_flushes: self.failed_flushes.load(Ordering::Relaxed),
            sent_entries: self.sent_entries.load(Ordering::Relaxed),
            skipped_entries: self.skipped_entries.load(Ordering::Relaxed),
        }
    }
}
