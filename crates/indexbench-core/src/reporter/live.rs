//! Periodic CSV statistics writer.

use chrono::Local;
use crossbeam_channel::{bounded, never, select, tick, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{BenchError, Result};
use crate::metrics::{CounterSnapshot, Counters, LatencySample};

const INDEX_HEADER: &[&str] = &[
    "date",
    "docs_indexed",
    "plaintext_bytes_indexed",
    "avg_mb_per_second",
    "mb_per_second",
    "avg_single_doc_ms",
    "single_doc_ms",
    "avg_batched_doc_ms",
    "batched_doc_ms",
    "final",
];

const QUERY_HEADER: &[&str] = &[
    "date",
    "queries_completed",
    "queries_started",
    "avg_queries_per_second",
    "queries_per_second",
    "avg_query_ms",
    "query_ms",
    "final",
];

const ANALYZE_HEADER: &[&str] = &[
    "date",
    "tokens",
    "avg_million_tokens_per_second",
    "million_tokens_per_second",
    "final",
];

/// Which counters a statistics file reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workload {
    /// Documents indexed; rates in MB of plain text per second
    Index,
    /// Searches issued; rates in completed queries per second
    Query,
    /// Tokens produced; rates in million tokens per second
    Analyze,
}

impl Workload {
    /// CSV header row, ending in the `final` completion marker.
    ///
    /// Index and query rows carry latency columns in pairs: the `avg_`
    /// column averages over the whole run, the other over the last window.
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            Workload::Index => INDEX_HEADER,
            Workload::Query => QUERY_HEADER,
            Workload::Analyze => ANALYZE_HEADER,
        }
    }

    pub fn rate_unit(&self) -> &'static str {
        match self {
            Workload::Index => "MB/s",
            Workload::Query => "queries/s",
            Workload::Analyze => "million tokens/s",
        }
    }

    /// The count the rows are keyed on
    pub fn count(&self, snapshot: &CounterSnapshot) -> u64 {
        match self {
            Workload::Index => snapshot.items_processed,
            Workload::Query => snapshot.requests_completed,
            Workload::Analyze => snapshot.tokens_produced,
        }
    }

    /// Quantity the rates are computed over
    fn rate_basis(&self, snapshot: &CounterSnapshot) -> f64 {
        match self {
            Workload::Index => snapshot.bytes_processed as f64 / 1e6,
            Workload::Query => snapshot.requests_completed as f64,
            Workload::Analyze => snapshot.tokens_produced as f64 / 1e6,
        }
    }

    fn row(&self, sample: &StatsSample) -> Vec<String> {
        let mut row = vec![sample.timestamp.clone(), sample.cumulative_count.to_string()];
        match self {
            Workload::Index => row.push(sample.snapshot.bytes_processed.to_string()),
            Workload::Query => row.push(sample.snapshot.requests_started.to_string()),
            Workload::Analyze => {}
        }
        row.push(format!("{:.6}", sample.cumulative_rate));
        row.push(format!("{:.6}", sample.windowed_rate));

        let (total, window) = (&sample.cumulative_latency, &sample.windowed_latency);
        let latencies = match self {
            Workload::Index => vec![
                total.single_doc_ms,
                window.single_doc_ms,
                total.batched_doc_ms,
                window.batched_doc_ms,
            ],
            Workload::Query => vec![total.query_ms, window.query_ms],
            Workload::Analyze => Vec::new(),
        };
        row.extend(latencies.into_iter().map(|ms| format!("{:.6}", ms)));
        row.push(sample.terminal.to_string());
        row
    }
}

/// One statistics row, derived from the counters at a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSample {
    /// RFC 3339 local time of the sample
    pub timestamp: String,
    pub snapshot: CounterSnapshot,
    /// Time since the run started
    pub elapsed: Duration,
    pub cumulative_count: u64,
    /// Count added since the previous sample
    pub windowed_count: u64,
    pub cumulative_rate: f64,
    pub windowed_rate: f64,
    /// Average operation latencies since the run started
    pub cumulative_latency: LatencySample,
    /// Average operation latencies since the previous sample
    pub windowed_latency: LatencySample,
    /// Whether this is the row written after every worker joined
    pub terminal: bool,
}

/// Samples shared counters and writes one CSV row per tick.
///
/// The header is written on construction. Each row is flushed as soon as it
/// is written so a crashed run still leaves its earlier rows behind.
pub struct StatsReporter<W: Write> {
    workload: Workload,
    counters: Arc<Counters>,
    writer: csv::Writer<W>,
    started: Instant,
    last_tick: Instant,
    last_snapshot: CounterSnapshot,
}

impl<W: Write> StatsReporter<W> {
    pub fn new(
        workload: Workload,
        counters: Arc<Counters>,
        writer: W,
        started: Instant,
    ) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(workload.header())?;
        writer.flush()?;

        Ok(Self {
            workload,
            counters,
            writer,
            started,
            last_tick: started,
            last_snapshot: CounterSnapshot::default(),
        })
    }

    pub fn workload(&self) -> Workload {
        self.workload
    }

    /// Take a sample as of `now` and write it
    pub fn sample_at(&mut self, now: Instant, terminal: bool) -> Result<StatsSample> {
        let snapshot = self.counters.snapshot();
        let elapsed = now.saturating_duration_since(self.started);
        let window = now.saturating_duration_since(self.last_tick);

        let basis = self.workload.rate_basis(&snapshot);
        let last_basis = self.workload.rate_basis(&self.last_snapshot);
        let cumulative_count = self.workload.count(&snapshot);

        let sample = StatsSample {
            timestamp: Local::now().to_rfc3339(),
            snapshot,
            elapsed,
            cumulative_count,
            windowed_count: cumulative_count
                .saturating_sub(self.workload.count(&self.last_snapshot)),
            cumulative_rate: rate(basis, elapsed),
            windowed_rate: rate(basis - last_basis, window),
            cumulative_latency: snapshot.latency(),
            windowed_latency: snapshot.since(&self.last_snapshot).latency(),
            terminal,
        };

        self.writer.write_record(self.workload.row(&sample))?;
        self.writer.flush()?;

        self.last_tick = now;
        self.last_snapshot = snapshot;
        Ok(sample)
    }

    /// Write the terminal row
    pub fn finish(&mut self) -> Result<StatsSample> {
        self.sample_at(Instant::now(), true)
    }

    /// Flush and return the underlying writer
    pub fn into_writer(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| BenchError::Io(io::Error::new(e.error().kind(), e.error().to_string())))
    }
}

impl<W: Write + Send + 'static> StatsReporter<W> {
    /// Move the reporter onto its own thread.
    ///
    /// With an interval, a row is written on every tick. With `None` or a
    /// zero interval the thread stays idle and only the terminal row is
    /// written, when [`ReporterHandle::finish`] is called.
    pub fn spawn(self, interval: Option<Duration>) -> Result<ReporterHandle> {
        let (shutdown, requests) = bounded(1);
        let handle = thread::Builder::new()
            .name("stats-reporter".to_string())
            .spawn(move || self.run(interval, requests))?;
        Ok(ReporterHandle { shutdown, handle })
    }

    fn run(
        mut self,
        interval: Option<Duration>,
        requests: Receiver<Shutdown>,
    ) -> Result<Option<StatsSample>> {
        let ticker = match interval.filter(|d| !d.is_zero()) {
            Some(every) => tick(every),
            None => never(),
        };
        debug!("Stats reporter started, interval {:?}", interval);

        let request = loop {
            let event = select! {
                recv(ticker) -> at => Event::Tick(at.unwrap_or_else(|_| Instant::now())),
                recv(requests) -> request => Event::Stop(request.unwrap_or(Shutdown::Abort)),
            };
            match event {
                Event::Tick(now) => {
                    self.sample_at(now, false)?;
                }
                Event::Stop(request) => break request,
            }
        };

        match request {
            Shutdown::Finish => self.finish().map(Some),
            Shutdown::Abort => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shutdown {
    Finish,
    Abort,
}

enum Event {
    Tick(Instant),
    Stop(Shutdown),
}

/// Handle to a reporter running on its own thread
#[derive(Debug)]
pub struct ReporterHandle {
    shutdown: Sender<Shutdown>,
    handle: JoinHandle<Result<Option<StatsSample>>>,
}

impl ReporterHandle {
    /// Stop ticking, write the terminal row and return it
    pub fn finish(self) -> Result<StatsSample> {
        // The thread may already have exited on a write error
        let _ = self.shutdown.send(Shutdown::Finish);
        match self.handle.join() {
            Ok(Ok(Some(sample))) => Ok(sample),
            Ok(Ok(None)) => Err(BenchError::Io(io::Error::new(
                io::ErrorKind::Other,
                "stats reporter stopped without a terminal sample",
            ))),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(BenchError::WorkerPanicked("stats-reporter".to_string())),
        }
    }

    /// Stop ticking without writing a terminal row.
    ///
    /// Used when the run failed, so the file does not claim to be complete.
    pub fn abort(self) {
        let _ = self.shutdown.send(Shutdown::Abort);
        match self.handle.join() {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Stats reporter failed: {}", e),
            Err(_) => warn!("Stats reporter panicked"),
        }
    }
}

fn rate(amount: f64, over: Duration) -> f64 {
    let secs = over.as_secs_f64();
    if secs > 0.0 {
        amount / secs
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn rows(output: &[u8]) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(output)
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_headers() {
        assert_eq!(
            Workload::Index.header().join(","),
            "date,docs_indexed,plaintext_bytes_indexed,avg_mb_per_second,mb_per_second,\
             avg_single_doc_ms,single_doc_ms,avg_batched_doc_ms,batched_doc_ms,final"
        );
        assert_eq!(
            Workload::Query.header().join(","),
            "date,queries_completed,queries_started,avg_queries_per_second,queries_per_second,\
             avg_query_ms,query_ms,final"
        );
        assert_eq!(
            Workload::Analyze.header().join(","),
            "date,tokens,avg_million_tokens_per_second,million_tokens_per_second,final"
        );
    }

    #[test]
    fn test_cumulative_and_windowed_rates() {
        let counters = Arc::new(Counters::new());
        let start = Instant::now();
        let mut reporter =
            StatsReporter::new(Workload::Index, Arc::clone(&counters), Vec::new(), start).unwrap();

        counters.add_items(10);
        counters.add_bytes(4_000_000);
        let first = reporter.sample_at(start + Duration::from_secs(2), false).unwrap();
        assert_eq!(first.cumulative_count, 10);
        assert_eq!(first.windowed_count, 10);
        assert!((first.cumulative_rate - 2.0).abs() < 1e-9);
        assert!((first.windowed_rate - 2.0).abs() < 1e-9);

        counters.add_items(5);
        counters.add_bytes(8_000_000);
        let second = reporter.sample_at(start + Duration::from_secs(4), true).unwrap();
        assert_eq!(second.cumulative_count, 15);
        assert_eq!(second.windowed_count, 5);
        // 12 MB over 4s cumulative, 8 MB over the last 2s
        assert!((second.cumulative_rate - 3.0).abs() < 1e-9);
        assert!((second.windowed_rate - 4.0).abs() < 1e-9);

        let output = reporter.into_writer().unwrap();
        let rows = rows(&output);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1..5].to_vec(), vec!["10", "4000000", "2.000000", "2.000000"]);
        assert_eq!(rows[2][1..5].to_vec(), vec!["15", "12000000", "3.000000", "4.000000"]);
        assert_eq!(rows[1].last().unwrap(), "false");
        assert_eq!(rows[2].last().unwrap(), "true");
        assert!(chrono::DateTime::parse_from_rfc3339(&rows[2][0]).is_ok());
    }

    #[test]
    fn test_single_and_batched_latency_columns() {
        let counters = Arc::new(Counters::new());
        let start = Instant::now();
        let mut reporter =
            StatsReporter::new(Workload::Index, Arc::clone(&counters), Vec::new(), start).unwrap();

        counters.record_single_put(Duration::from_millis(6));
        counters.record_batch(4, Duration::from_millis(4));
        let first = reporter.sample_at(start + Duration::from_secs(1), false).unwrap();
        assert!((first.cumulative_latency.single_doc_ms - 6.0).abs() < 1e-9);
        assert!((first.cumulative_latency.batched_doc_ms - 1.0).abs() < 1e-9);

        // Only batches in the second window
        counters.record_batch(2, Duration::from_millis(6));
        let second = reporter.sample_at(start + Duration::from_secs(2), true).unwrap();
        assert!((second.windowed_latency.batched_doc_ms - 3.0).abs() < 1e-9);
        assert_eq!(second.windowed_latency.single_doc_ms, 0.0);
        assert!((second.cumulative_latency.single_doc_ms - 6.0).abs() < 1e-9);
        // 10ms over 6 batched documents
        assert!((second.cumulative_latency.batched_doc_ms - 10.0 / 6.0).abs() < 1e-9);

        let rows = rows(&reporter.into_writer().unwrap());
        assert_eq!(
            rows[1][5..].to_vec(),
            vec!["6.000000", "6.000000", "1.000000", "1.000000", "false"]
        );
        assert_eq!(
            rows[2][5..].to_vec(),
            vec!["6.000000", "0.000000", "1.666667", "3.000000", "true"]
        );
    }

    #[test]
    fn test_query_latency_columns() {
        let counters = Arc::new(Counters::new());
        let start = Instant::now();
        let mut reporter =
            StatsReporter::new(Workload::Query, Arc::clone(&counters), Vec::new(), start).unwrap();
        for ms in [2, 4] {
            counters.request_started();
            counters.request_completed(Duration::from_millis(ms));
        }
        reporter.sample_at(start + Duration::from_secs(1), true).unwrap();

        let rows = rows(&reporter.into_writer().unwrap());
        assert_eq!(rows[0].len(), rows[1].len());
        assert_eq!(
            rows[1][1..].to_vec(),
            vec!["2", "2", "2.000000", "2.000000", "3.000000", "3.000000", "true"]
        );
    }

    #[test]
    fn test_zero_elapsed_rate_is_zero() {
        let counters = Arc::new(Counters::new());
        counters.request_started();
        counters.request_completed(Duration::from_millis(1));
        let start = Instant::now();
        let mut reporter =
            StatsReporter::new(Workload::Query, counters, Vec::new(), start).unwrap();

        let sample = reporter.sample_at(start, true).unwrap();
        assert_eq!(sample.cumulative_rate, 0.0);
        assert_eq!(sample.windowed_rate, 0.0);
    }

    #[test]
    fn test_analyze_rows_have_five_columns() {
        let counters = Arc::new(Counters::new());
        counters.add_tokens(3_000_000);
        let start = Instant::now();
        let mut reporter =
            StatsReporter::new(Workload::Analyze, Arc::clone(&counters), Vec::new(), start)
                .unwrap();
        reporter.sample_at(start + Duration::from_secs(3), true).unwrap();

        let rows = rows(&reporter.into_writer().unwrap());
        assert_eq!(rows[1].len(), 5);
        assert_eq!(rows[1][1..].to_vec(), vec!["3000000", "1.000000", "1.000000", "true"]);
    }

    #[test]
    fn test_disabled_interval_writes_only_terminal_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let counters = Arc::new(Counters::new());
        let file = fs::File::create(&path).unwrap();

        let handle = StatsReporter::new(Workload::Index, Arc::clone(&counters), file, Instant::now())
            .unwrap()
            .spawn(None)
            .unwrap();
        counters.add_items(7);
        thread::sleep(Duration::from_millis(20));
        let sample = handle.finish().unwrap();
        assert!(sample.terminal);
        assert_eq!(sample.cumulative_count, 7);

        let rows = rows(&fs::read(&path).unwrap());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "7");
        assert_eq!(rows[1].last().unwrap(), "true");
    }

    #[test]
    fn test_ticking_reporter_ends_with_terminal_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let counters = Arc::new(Counters::new());
        let file = fs::File::create(&path).unwrap();

        let handle = StatsReporter::new(Workload::Index, Arc::clone(&counters), file, Instant::now())
            .unwrap()
            .spawn(Some(Duration::from_millis(10)))
            .unwrap();
        for _ in 0..5 {
            counters.add_items(1);
            thread::sleep(Duration::from_millis(15));
        }
        handle.finish().unwrap();

        let rows = rows(&fs::read(&path).unwrap());
        assert!(rows.len() >= 3, "expected periodic rows, got {}", rows.len());
        let (last, earlier) = rows[1..].split_last().unwrap();
        assert_eq!(last[1], "5");
        assert_eq!(last.last().unwrap(), "true");
        assert!(earlier.iter().all(|row| row.last().unwrap() == "false"));
    }

    #[test]
    fn test_abort_skips_terminal_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let file = fs::File::create(&path).unwrap();

        let handle = StatsReporter::new(
            Workload::Query,
            Arc::new(Counters::new()),
            file,
            Instant::now(),
        )
        .unwrap()
        .spawn(None)
        .unwrap();
        handle.abort();

        let rows = rows(&fs::read(&path).unwrap());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "date");
    }
}
