//! Lock-free counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Process-wide monotonic counters.
///
/// Every mutation is a single atomic add. There is no read-modify-write path
/// and no lock; readers may see a stale value but never a torn one.
///
/// Operation latencies are kept as total nanoseconds next to an operation
/// count, so averages over any window are a difference of two snapshots.
#[derive(Debug, Default)]
pub struct Counters {
    items_processed: AtomicU64,
    bytes_processed: AtomicU64,
    requests_started: AtomicU64,
    requests_completed: AtomicU64,
    tokens_produced: AtomicU64,
    single_puts: AtomicU64,
    single_put_nanos: AtomicU64,
    batches: AtomicU64,
    batched_docs: AtomicU64,
    batch_nanos: AtomicU64,
    query_nanos: AtomicU64,
}

/// Point-in-time copy of [`Counters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub items_processed: u64,
    pub bytes_processed: u64,
    pub requests_started: u64,
    pub requests_completed: u64,
    pub tokens_produced: u64,
    /// Documents indexed through single puts
    pub single_puts: u64,
    pub single_put_nanos: u64,
    /// Batch operations applied
    pub batches: u64,
    /// Documents indexed through batches
    pub batched_docs: u64,
    pub batch_nanos: u64,
    /// Time spent in completed searches
    pub query_nanos: u64,
}

/// Average operation latencies in milliseconds.
///
/// A kind of operation that did not run reports zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySample {
    /// Mean time of one single-document put
    pub single_doc_ms: f64,
    /// Mean batch time divided by the documents in the batch
    pub batched_doc_ms: f64,
    /// Mean time of one search
    pub query_ms: f64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` processed items, returning the updated total
    pub fn add_items(&self, n: u64) -> u64 {
        self.items_processed.fetch_add(n, Ordering::Relaxed) + n
    }

    /// Add `n` bytes of plain text, returning the updated total
    pub fn add_bytes(&self, n: u64) -> u64 {
        self.bytes_processed.fetch_add(n, Ordering::Relaxed) + n
    }

    pub fn request_started(&self) {
        self.requests_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a finished search that took `took`
    pub fn request_completed(&self, took: Duration) {
        self.query_nanos.fetch_add(nanos(took), Ordering::Relaxed);
        self.requests_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_tokens(&self, n: u64) -> u64 {
        self.tokens_produced.fetch_add(n, Ordering::Relaxed) + n
    }

    /// Record the time of one single-document put
    pub fn record_single_put(&self, took: Duration) {
        self.single_put_nanos.fetch_add(nanos(took), Ordering::Relaxed);
        self.single_puts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the time of one batch of `docs` documents
    pub fn record_batch(&self, docs: u64, took: Duration) {
        self.batch_nanos.fetch_add(nanos(took), Ordering::Relaxed);
        self.batched_docs.fetch_add(docs, Ordering::Relaxed);
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn items_processed(&self) -> u64 {
        self.items_processed.load(Ordering::Relaxed)
    }

    /// Zero every counter.
    ///
    /// Only for starting a new measurement phase while no worker is running;
    /// a concurrent add may survive or be lost.
    pub fn reset(&self) {
        for counter in [
            &self.items_processed,
            &self.bytes_processed,
            &self.requests_started,
            &self.requests_completed,
            &self.tokens_produced,
            &self.single_puts,
            &self.single_put_nanos,
            &self.batches,
            &self.batched_docs,
            &self.batch_nanos,
            &self.query_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Load every counter.
    ///
    /// Each field is read atomically on its own; the snapshot as a whole is
    /// not a consistent cut across counters.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            items_processed: self.items_processed.load(Ordering::Relaxed),
            bytes_processed: self.bytes_processed.load(Ordering::Relaxed),
            requests_started: self.requests_started.load(Ordering::Relaxed),
            requests_completed: self.requests_completed.load(Ordering::Relaxed),
            tokens_produced: self.tokens_produced.load(Ordering::Relaxed),
            single_puts: self.single_puts.load(Ordering::Relaxed),
            single_put_nanos: self.single_put_nanos.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            batched_docs: self.batched_docs.load(Ordering::Relaxed),
            batch_nanos: self.batch_nanos.load(Ordering::Relaxed),
            query_nanos: self.query_nanos.load(Ordering::Relaxed),
        }
    }
}

impl CounterSnapshot {
    /// What was added between `earlier` and this snapshot
    pub fn since(&self, earlier: &CounterSnapshot) -> CounterSnapshot {
        CounterSnapshot {
            items_processed: self.items_processed.saturating_sub(earlier.items_processed),
            bytes_processed: self.bytes_processed.saturating_sub(earlier.bytes_processed),
            requests_started: self.requests_started.saturating_sub(earlier.requests_started),
            requests_completed: self
                .requests_completed
                .saturating_sub(earlier.requests_completed),
            tokens_produced: self.tokens_produced.saturating_sub(earlier.tokens_produced),
            single_puts: self.single_puts.saturating_sub(earlier.single_puts),
            single_put_nanos: self.single_put_nanos.saturating_sub(earlier.single_put_nanos),
            batches: self.batches.saturating_sub(earlier.batches),
            batched_docs: self.batched_docs.saturating_sub(earlier.batched_docs),
            batch_nanos: self.batch_nanos.saturating_sub(earlier.batch_nanos),
            query_nanos: self.query_nanos.saturating_sub(earlier.query_nanos),
        }
    }

    /// Average latencies over everything this snapshot counted
    pub fn latency(&self) -> LatencySample {
        LatencySample {
            single_doc_ms: average_ms(self.single_put_nanos, self.single_puts),
            batched_doc_ms: average_ms(self.batch_nanos, self.batched_docs),
            query_ms: average_ms(self.query_nanos, self.requests_completed),
        }
    }
}

fn nanos(took: Duration) -> u64 {
    u64::try_from(took.as_nanos()).unwrap_or(u64::MAX)
}

fn average_ms(total_nanos: u64, operations: u64) -> f64 {
    if operations == 0 {
        0.0
    } else {
        total_nanos as f64 / operations as f64 / 1e6
    }
}
