//! Query workload: concurrent search clients against a loaded index.

use crossbeam_channel::{after, bounded, select};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::pool::WorkerPool;
use super::queue::{work_queue, QueueCapacity};
use super::stop::stop_signal;
use super::{conclude, start_reporter, PipelineOutcome};
use crate::error::{BenchError, Result};
use crate::index::{DocumentIndex, QueryKind};
use crate::metrics::Counters;
use crate::reporter::Workload;
use crate::source::Record;

/// When the query phase ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryBound {
    /// Issue exactly this many queries in total
    Count(u64),
    /// Keep issuing until the deadline passes
    Duration(Duration),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySettings {
    /// Concurrent search clients
    pub clients: usize,
    /// Query strings, cycled in order
    pub queries: Vec<String>,
    /// How every query string is searched
    pub kind: QueryKind,
    pub bound: QueryBound,
    /// Queue feeding count-bounded clients
    pub queue: QueueCapacity,
    pub report_interval: Option<Duration>,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            clients: 8,
            queries: vec!["water".to_string()],
            kind: QueryKind::default(),
            bound: QueryBound::Count(10_000),
            queue: QueueCapacity::default(),
            report_interval: Some(Duration::from_secs(5)),
        }
    }
}

/// Put up to `count` records into `index` one at a time, then flush.
///
/// This is setup for the query phase and is not measured.
pub fn load_index<S, I>(source: S, index: &I, count: Option<u64>) -> Result<u64>
where
    S: IntoIterator<Item = Result<Record>>,
    I: DocumentIndex + ?Sized,
{
    let limit = count.map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
    let started = Instant::now();
    let mut loaded = 0u64;
    for (ordinal, record) in source.into_iter().take(limit).enumerate() {
        index.put(&ordinal.to_string(), &record?)?;
        loaded += 1;
    }
    index.flush()?;
    info!(
        "Loaded {} documents in {} ms",
        loaded,
        started.elapsed().as_millis()
    );
    Ok(loaded)
}

/// Run search clients against `index`, writing statistics CSV to `stats`
pub fn run_queries<I, W>(
    index: Arc<I>,
    settings: &QuerySettings,
    counters: Arc<Counters>,
    stats: W,
) -> Result<PipelineOutcome>
where
    I: DocumentIndex + ?Sized + 'static,
    W: Write + Send + 'static,
{
    if settings.queries.is_empty() {
        return Err(BenchError::config("queries", "at least one query is required"));
    }
    if settings.clients == 0 {
        return Err(BenchError::config("clients", "at least one client is required"));
    }

    let started = Instant::now();
    let reporter = start_reporter(
        Workload::Query,
        &counters,
        stats,
        started,
        settings.report_interval,
    )?;
    info!(
        "Running {} queries with {} clients, {:?}",
        settings.kind, settings.clients, settings.bound
    );

    let result = match settings.bound {
        QueryBound::Count(total) => count_bounded(&index, settings, &counters, total),
        QueryBound::Duration(limit) => time_bounded(&index, settings, &counters, limit),
    };
    conclude(reporter, result, started)
}

/// Run one query phase per kind, in order.
///
/// The counters are zeroed before each phase so every phase reports its own
/// rates and latencies. `stats_for` supplies the statistics writer of each
/// phase. The first failing phase ends the sequence.
pub fn run_query_phases<I, W, F>(
    index: Arc<I>,
    settings: &QuerySettings,
    kinds: &[QueryKind],
    counters: Arc<Counters>,
    mut stats_for: F,
) -> Result<Vec<(QueryKind, PipelineOutcome)>>
where
    I: DocumentIndex + ?Sized + 'static,
    W: Write + Send + 'static,
    F: FnMut(QueryKind) -> Result<W>,
{
    if kinds.is_empty() {
        return Err(BenchError::config("query kinds", "at least one query kind is required"));
    }

    let mut phases = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        counters.reset();
        let phase = QuerySettings {
            kind,
            ..settings.clone()
        };
        let stats = stats_for(kind)?;
        let outcome = run_queries(Arc::clone(&index), &phase, Arc::clone(&counters), stats)?;
        info!(
            "Result: {} query - queries per second {:.3}, avg {:.3} ms",
            kind,
            outcome.final_sample.cumulative_rate,
            outcome.final_sample.cumulative_latency.query_ms
        );
        phases.push((kind, outcome));
    }
    Ok(phases)
}

fn search_once<I>(index: &I, counters: &Counters, kind: QueryKind, query: &str) -> Result<()>
where
    I: DocumentIndex + ?Sized,
{
    counters.request_started();
    let began = Instant::now();
    index.search(kind, query)?;
    counters.request_completed(began.elapsed());
    Ok(())
}

fn count_bounded<I>(
    index: &Arc<I>,
    settings: &QuerySettings,
    counters: &Arc<Counters>,
    total: u64,
) -> Result<u64>
where
    I: DocumentIndex + ?Sized + 'static,
{
    let (sender, receiver) = work_queue(settings.queue);
    let kind = settings.kind;
    let pool = WorkerPool::spawn_consumers("query", settings.clients, receiver, |_| {
        let index = Arc::clone(index);
        let counters = Arc::clone(counters);
        move |query: String| search_once(&*index, &counters, kind, &query)
    })?;

    for query in settings.queries.iter().cycle().take(total_len(total)) {
        if sender.send(query.clone()).is_err() {
            break;
        }
    }
    drop(sender);
    pool.join()
}

/// Clients loop until the deadline; the in-flight search of each client
/// completes, only its next iteration is skipped.
fn time_bounded<I>(
    index: &Arc<I>,
    settings: &QuerySettings,
    counters: &Arc<Counters>,
    limit: Duration,
) -> Result<u64>
where
    I: DocumentIndex + ?Sized + 'static,
{
    let (trigger, stop) = stop_signal();
    // Every client holds a sender; the channel disconnects once all exited.
    // A failing client also sends, so the others are stopped early
    let (done, all_done) = bounded::<()>(1);
    let kind = settings.kind;

    let pool = WorkerPool::spawn_tasks("query", settings.clients, |client| {
        let index = Arc::clone(index);
        let counters = Arc::clone(counters);
        let stop = stop.clone();
        let done = done.clone();
        let queries = settings.queries.clone();
        move || {
            let mut issued = 0u64;
            // Stagger clients across the query list
            let mut cycle = queries.iter().cycle().skip(client % queries.len());
            loop {
                let stopped = select! {
                    recv(stop.receiver()) -> _ => true,
                    default => false,
                };
                let Some(query) = cycle.next().filter(|_| !stopped) else {
                    break;
                };
                if let Err(e) = search_once(&*index, &counters, kind, query) {
                    let _ = done.try_send(());
                    return Err(e);
                }
                issued += 1;
            }
            Ok(issued)
        }
    })?;
    drop(done);

    let deadline = after(limit);
    select! {
        recv(deadline) -> _ => info!("Query deadline of {:?} reached", limit),
        recv(all_done) -> _ => warn!("Query clients stopped before the deadline"),
    }
    trigger.fire();
    pool.join()
}

fn total_len(total: u64) -> usize {
    usize::try_from(total).unwrap_or(usize::MAX)
}
