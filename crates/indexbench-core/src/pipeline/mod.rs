//! Concurrent workload pipeline
//!
//! One producer on the calling thread reads the [`WorkSource`](crate::source)
//! and feeds a [`work_queue`]; a fixed [`WorkerPool`] drains it and applies
//! each [`WorkItem`] to the index or analyzer, adding to the shared
//! [`Counters`]. A [`StatsReporter`] thread samples the counters while the
//! run is in flight and writes the terminal row once every worker joined.
//!
//! ```text
//! source ─▶ batcher ─▶ queue ─┬─▶ worker 0 ─┐
//!                             ├─▶ worker 1 ─┼─▶ index + counters ─▶ stats CSV
//!                             └─▶ worker N ─┘
//! ```
//!
//! Any worker error fails the whole run: the remaining workers stop before
//! their next item, the producer stops at its next send, and no terminal
//! statistics row is written.

mod analyzing;
mod checkpoint;
mod indexing;
mod pool;
mod querying;
mod queue;
mod stop;
mod work;

pub use analyzing::run_analysis;
pub use checkpoint::{CheckpointResult, QueryCheckpoint};
pub use indexing::run_indexing;
pub use pool::WorkerPool;
pub use querying::{load_index, run_queries, run_query_phases, QueryBound, QuerySettings};
pub use queue::{work_queue, QueueCapacity};
pub use stop::{stop_signal, StopSignal, StopTrigger};
pub use work::WorkItem;

use crossbeam_channel::Sender;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::batch::{BatchPolicy, Batcher};
use crate::error::{BenchError, Result};
use crate::metrics::{CounterSnapshot, Counters};
use crate::reporter::{ReporterHandle, StatsReporter, StatsSample, Workload};
use crate::source::Record;

/// Sizing and reporting knobs shared by the index and analyze workloads
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSettings {
    /// Consumer threads
    pub workers: usize,
    pub queue: QueueCapacity,
    /// Records per batch; 0 or 1 sends records one at a time
    pub batch_size: usize,
    /// Stop after this many records; `None` reads the whole source
    pub count: Option<u64>,
    /// Statistics row interval; `None` writes only the terminal row
    pub report_interval: Option<Duration>,
    /// Log progress every this many indexed records; 0 disables
    pub print_count: u64,
    /// Timed searches during an index run; ignored by the analyze workload
    pub checkpoint: Option<QueryCheckpoint>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: 8,
            queue: QueueCapacity::default(),
            batch_size: 100,
            count: None,
            report_interval: Some(Duration::from_secs(5)),
            print_count: 1000,
            checkpoint: None,
        }
    }
}

impl PipelineSettings {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(BenchError::config("workers", "at least one worker is required"));
        }
        if let Some(checkpoint) = &self.checkpoint {
            checkpoint.validate()?;
        }
        Ok(())
    }
}

/// What a finished run measured
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The terminal statistics row
    pub final_sample: StatsSample,
    pub counters: CounterSnapshot,
    pub elapsed: Duration,
    /// Work units the workers completed (items, batches or queries)
    pub work_units: u64,
    /// Checkpoint searches of an index run, by document count
    pub checkpoints: Vec<CheckpointResult>,
}

/// Start the statistics reporter for a workload
pub(crate) fn start_reporter<W>(
    workload: Workload,
    counters: &Arc<Counters>,
    stats: W,
    started: Instant,
    interval: Option<Duration>,
) -> Result<ReporterHandle>
where
    W: Write + Send + 'static,
{
    StatsReporter::new(workload, Arc::clone(counters), stats, started)?.spawn(interval)
}

/// Write the terminal row on success; stop the reporter silently on failure
pub(crate) fn conclude(
    reporter: ReporterHandle,
    result: Result<u64>,
    started: Instant,
) -> Result<PipelineOutcome> {
    match result {
        Ok(work_units) => {
            let final_sample = reporter.finish()?;
            let outcome = PipelineOutcome {
                counters: final_sample.snapshot,
                elapsed: started.elapsed(),
                work_units,
                final_sample,
                checkpoints: Vec::new(),
            };
            info!(
                "Run finished in {:.3}s: {:?}",
                outcome.elapsed.as_secs_f64(),
                outcome.counters
            );
            Ok(outcome)
        }
        Err(e) => {
            reporter.abort();
            Err(e)
        }
    }
}

/// Read records and send them to the workers.
///
/// Record ids are the record's 0-based position in the source. Returns the
/// number of work items sent. A closed queue means the workers gave up, so
/// production stops quietly and the pool reports why.
pub(crate) fn produce<S>(
    source: S,
    sender: &Sender<WorkItem>,
    policy: BatchPolicy,
    count: Option<u64>,
) -> Result<u64>
where
    S: IntoIterator<Item = Result<Record>>,
{
    let limit = count.map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
    let records = source.into_iter().take(limit).enumerate();
    let mut sent = 0u64;

    match policy {
        BatchPolicy::Single => {
            for (ordinal, record) in records {
                let item = WorkItem::Single {
                    id: ordinal.to_string(),
                    record: record?,
                };
                if sender.send(item).is_err() {
                    warn!("Work queue closed, stopping producer after {} items", sent);
                    return Ok(sent);
                }
                sent += 1;
            }
        }
        BatchPolicy::Batched(size) => {
            let mut batcher = Batcher::new(size);
            for (ordinal, record) in records {
                if let Some(batch) = batcher.push(ordinal.to_string(), record?) {
                    if sender.send(WorkItem::Batch(batch)).is_err() {
                        warn!("Work queue closed, stopping producer after {} batches", sent);
                        return Ok(sent);
                    }
                    sent += 1;
                }
            }
            if let Some(batch) = batcher.flush() {
                if sender.send(WorkItem::Batch(batch)).is_ok() {
                    sent += 1;
                }
            }
        }
    }

    Ok(sent)
}
