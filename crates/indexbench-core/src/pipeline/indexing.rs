//! Index workload: records into a [`DocumentIndex`].

use crossbeam_channel::{unbounded, Sender};
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::checkpoint::{crosses, CheckpointResult, QueryCheckpoint};
use super::pool::WorkerPool;
use super::queue::work_queue;
use super::work::WorkItem;
use super::{conclude, produce, start_reporter, PipelineOutcome, PipelineSettings};
use crate::batch::BatchPolicy;
use crate::error::Result;
use crate::index::DocumentIndex;
use crate::metrics::Counters;
use crate::reporter::Workload;
use crate::source::Record;

/// Index every record of `source`, writing statistics CSV to `stats`.
///
/// Batched items go through [`DocumentIndex::put_batch`], single items
/// through [`DocumentIndex::put`], and each call is timed into the single or
/// batched latency counters. The index is flushed after the workers join and
/// before the terminal statistics row is taken.
///
/// With [`PipelineSettings::checkpoint`] set, the outcome also carries one
/// [`CheckpointResult`] per checkpoint passed, ordered by document count.
pub fn run_indexing<S, I, W>(
    source: S,
    index: Arc<I>,
    settings: &PipelineSettings,
    counters: Arc<Counters>,
    stats: W,
) -> Result<PipelineOutcome>
where
    S: IntoIterator<Item = Result<Record>>,
    I: DocumentIndex + ?Sized + 'static,
    W: Write + Send + 'static,
{
    settings.validate()?;
    let started = Instant::now();
    let reporter = start_reporter(
        Workload::Index,
        &counters,
        stats,
        started,
        settings.report_interval,
    )?;

    let (sender, receiver) = work_queue(settings.queue);
    let (results, checkpoints) = unbounded();
    let pool = WorkerPool::spawn_consumers("indexer", settings.workers, receiver, |_| {
        let indexer = Indexer {
            index: Arc::clone(&index),
            counters: Arc::clone(&counters),
            print_count: settings.print_count,
            checkpoint: settings.checkpoint.clone(),
            results: results.clone(),
            started,
        };
        move |item: WorkItem| indexer.apply(item)
    });
    drop(results);
    let pool = match pool {
        Ok(pool) => pool,
        Err(e) => return conclude(reporter, Err(e), started),
    };

    let policy = BatchPolicy::from_batch_size(settings.batch_size);
    info!(
        "Indexing with {} workers, {:?}, queue {:?}",
        settings.workers, policy, settings.queue
    );

    let produced = produce(source, &sender, policy, settings.count);
    drop(sender);
    let joined = pool.join();

    let result = produced
        .and(joined)
        .and_then(|units| index.flush().map(|()| units));
    let mut outcome = conclude(reporter, result, started)?;
    outcome.checkpoints = checkpoints.try_iter().collect();
    outcome.checkpoints.sort_by_key(|result| result.docs);
    Ok(outcome)
}

/// Per-worker handler state
struct Indexer<I: ?Sized> {
    index: Arc<I>,
    counters: Arc<Counters>,
    print_count: u64,
    checkpoint: Option<QueryCheckpoint>,
    results: Sender<CheckpointResult>,
    started: Instant,
}

impl<I: DocumentIndex + ?Sized> Indexer<I> {
    fn apply(&self, item: WorkItem) -> Result<()> {
        let added = item.len() as u64;
        let began = Instant::now();
        match &item {
            WorkItem::Single { id, record } => {
                self.index.put(id, record)?;
                self.counters.record_single_put(began.elapsed());
            }
            WorkItem::Batch(batch) => {
                self.index.put_batch(batch)?;
                self.counters.record_batch(added, began.elapsed());
            }
        }

        let total = self.counters.add_items(added);
        self.counters.add_bytes(item.plain_text_bytes());

        if crosses(self.print_count, total - added, total) {
            info!(
                "Indexed {} documents in {} ms",
                total,
                self.started.elapsed().as_millis()
            );
        }
        if let Some(checkpoint) = self.checkpoint.as_ref() {
            if checkpoint.crossed(total - added, total) {
                let result = checkpoint.run(&*self.index, total, self.started)?;
                // The receiver lives until the run returns
                let _ = self.results.send(result);
            }
        }
        Ok(())
    }
}
