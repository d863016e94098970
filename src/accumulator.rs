//! The batching worker: drains the ingest queue into the buffer and decides
//! when a buffer is worth flushing.

use crate::record::LogEntry;
use crate::sender::{send_with_retry, FlushOutcome, RetryPolicy};
use crate::stats::AdapterStats;
use crate::stream::group_entries;
use crate::transport::Transport;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

/// Entries not yet flushed, plus the time of the last delivered batch.
#[derive(Debug)]
pub(crate) struct Buffer {
    pub(crate) entries: Vec<LogEntry>,
    pub(crate) last_flush: Instant,
}

/// Buffer shared with the adapter handle, which only reads its length.
/// The lock is held for an append or a take, never across a send.
#[derive(Debug, Clone)]
pub(crate) struct SharedBuffer(Arc<Mutex<Buffer>>);

impl SharedBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        SharedBuffer(Arc::new(Mutex::new(Buffer {
            entries: Vec::with_capacity(capacity),
            last_flush: Instant::now(),
        })))
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Buffer> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().entries.len()
    }
}

pub(crate) struct Accumulator {
    pub(crate) buffer: SharedBuffer,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) stats: Arc<AdapterStats>,
    pub(crate) batch_size: usize,
    pub(crate) batch_interval: Duration,
    pub(crate) retry: RetryPolicy,
}

impl Accumulator {
    /// Worker loop. Returns after the shutdown signal (or once every
    /// producer is gone) and a final flush of whatever was accepted.
    pub(crate) async fn run(
        self,
        mut queue: mpsc::Receiver<LogEntry>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let start = Instant::now()
            .checked_add(self.batch_interval)
            .unwrap_or_else(far_future);
        let mut ticker = interval_at(start, self.batch_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,
                entry = queue.recv() => match entry {
                    Some(entry) => self.ingest(entry).await,
                    None => break,
                },
                _ = ticker.tick() => {
                    if self.flush_due() {
                        self.flush().await;
                    }
                }
            }
        }

        // Entries already accepted by `log` are still in the queue.
        queue.close();
        while let Some(entry) = queue.recv().await {
            self.ingest(entry).await;
        }
        if self.buffer.len() > 0 {
            self.flush().await;
        }
        tracing::debug!("loki batch worker stopped");
    }

    async fn ingest(&self, entry: LogEntry) {
        let len = {
            let mut buf = self.buffer.lock();
            buf.entries.push(entry);
            buf.entries.len()
        };
        if len >= self.batch_size {
            self.flush().await;
        }
    }

    fn flush_due(&self) -> bool {
        let buf = self.buffer.lock();
        !buf.entries.is_empty() && buf.last_flush.elapsed() >= self.batch_interval
    }

    /// Take the buffer, group it into streams and send it. Returns `None`
    /// when there was nothing to send.
    pub(crate) async fn flush(&self) -> Option<FlushOutcome> {
        let snapshot = {
            let mut buf = self.buffer.lock();
            if buf.entries.is_empty() {
                return None;
            }
            std::mem::replace(&mut buf.entries, Vec::with_capacity(self.batch_size))
        };

        let grouped = group_entries(snapshot);
        AdapterStats::add(&self.stats.skipped_entries, grouped.skipped);
        if grouped.request.is_empty() {
            return None;
        }

        let outcome = send_with_retry(&*self.transport, &grouped.request, self.retry).await;
        if outcome.is_success() {
            self.buffer.lock().last_flush = Instant::now();
            AdapterStats::incr(&self.stats.flushes);
            AdapterStats::add(&self.stats.sent_entries, grouped.request.entry_count());
        } else {
            AdapterStats::incr(&self.stats.failed_flushes);
        }
        Some(outcome)
    }
}

// Roughly 30 years out; stands in for an interval too large to add to now.
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}
