//! Pipeline benchmark runner
//!
//! Reads a line-file corpus and drives one workload against it, writing the
//! live statistics CSV to `--stats-file` (or stdout):
//! - `index`: batched document indexing, optionally pausing every
//!   `--checkpoint-every` documents to time a search
//! - `query`: load the corpus, then run concurrent search clients once per
//!   `--query-kind`
//! - `analyze`: tokenize record bodies
//!
//! With more than one query kind, each phase writes its own statistics and
//! summary files, named `<stem>-<kind>.<ext>` after the given paths.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::{Args, Parser, Subcommand};
use indexbench_core::analysis::Analyzer;
use indexbench_core::index::{IndexSettings, QueryKind, StorageKind, TantivyIndex};
use indexbench_core::introspect::{IntrospectServer, IntrospectState};
use indexbench_core::pipeline::{
    load_index, run_analysis, run_indexing, run_query_phases, PipelineOutcome, PipelineSettings,
    QueryBound, QueryCheckpoint, QueueCapacity, QuerySettings,
};
use indexbench_core::reporter::{JsonReporter, RunSummary};
use indexbench_core::{BenchError, Counters, LineFileSource, Workload};
use indexbench_cli::{
    init_tracing, parse_args, parse_duration, parse_query_kind, phase_path, stats_writer,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "bench-pipeline")]
#[command(version, about = "Run an indexing, query or analysis workload and report live rates")]
struct Cli {
    #[command(subcommand)]
    workload: WorkloadCommand,
}

#[derive(Subcommand, Debug)]
enum WorkloadCommand {
    /// Index the corpus
    Index {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        checkpoint: CheckpointArgs,
    },
    /// Load the corpus, then run search clients against it
    Query {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Tokenize record bodies
    Analyze {
        #[command(flatten)]
        common: CommonArgs,
        /// Analyzer name: standard, whitespace, en_stem or keyword
        #[arg(long, default_value = "standard")]
        analyzer: String,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Line-file corpus
    #[arg(long)]
    source: PathBuf,

    /// Index directory (ignored for in-memory storage and for analyze)
    #[arg(long, default_value = "bench.idx")]
    target: PathBuf,

    /// Index settings file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of worker threads
    #[arg(long, default_value_t = 8)]
    workers: usize,

    /// Work queue capacity; 0 hands every item directly to a worker
    #[arg(long, default_value_t = 8)]
    queue_size: usize,

    /// Never block the producer on a full queue
    #[arg(long, conflicts_with = "queue_size")]
    unbounded_queue: bool,

    /// Records per batch; 0 or 1 indexes one record at a time
    #[arg(long, default_value_t = 100)]
    batch_size: usize,

    /// Stop after this many records
    #[arg(long)]
    count: Option<u64>,

    /// Statistics row interval (e.g. 5s, 500ms); 0 writes only the final row
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    report_interval: Duration,

    /// Statistics CSV destination (default: stdout)
    #[arg(long)]
    stats_file: Option<PathBuf>,

    /// Write the JSON run summary here
    #[arg(long)]
    summary_file: Option<PathBuf>,

    /// Serve live counters on this address (e.g. 127.0.0.1:1234)
    #[arg(long, default_value = "")]
    bind_http: String,

    /// Log progress every this many indexed records; 0 disables
    #[arg(long, default_value_t = 1000)]
    print_count: u64,

    /// Clip record bodies to this many bytes; 0 disables
    #[arg(long, default_value_t = 0)]
    max_text_size: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Number of concurrent search clients
    #[arg(long, default_value_t = 8)]
    query_threads: usize,

    /// Total searches to run
    #[arg(long, default_value_t = 10_000)]
    query_count: u64,

    /// Run searches for this long instead of a fixed count
    #[arg(long, value_parser = parse_duration)]
    duration: Option<Duration>,

    /// Query strings, cycled in order
    #[arg(long = "query", default_values_t = vec!["water".to_string()])]
    queries: Vec<String>,

    /// Query kinds to run, one phase each: term, parsed or fuzzy
    #[arg(
        long = "query-kind",
        value_parser = parse_query_kind,
        default_values_t = vec![QueryKind::Parsed]
    )]
    kinds: Vec<QueryKind>,
}

#[derive(Args, Debug)]
struct CheckpointArgs {
    /// Time a search every this many indexed documents; 0 disables
    #[arg(long, alias = "level", default_value_t = 0)]
    checkpoint_every: u64,

    /// Repeated searches after the first one at each checkpoint
    #[arg(long, alias = "qrepeat", default_value_t = 5)]
    checkpoint_repeat: u32,

    /// Checkpoint query text
    #[arg(long, default_value = "water")]
    checkpoint_query: String,

    /// Checkpoint query kind: term, parsed or fuzzy
    #[arg(long, value_parser = parse_query_kind, default_value = "term")]
    checkpoint_kind: QueryKind,
}

impl CheckpointArgs {
    fn checkpoint(&self) -> Option<QueryCheckpoint> {
        (self.checkpoint_every > 0).then(|| QueryCheckpoint {
            every: self.checkpoint_every,
            repeat: self.checkpoint_repeat,
            kind: self.checkpoint_kind,
            query: self.checkpoint_query.clone(),
        })
    }
}

impl CommonArgs {
    fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            workers: self.workers,
            queue: self.queue(),
            batch_size: self.batch_size,
            count: self.count,
            report_interval: self.interval(),
            print_count: self.print_count,
            checkpoint: None,
        }
    }

    fn queue(&self) -> QueueCapacity {
        if self.unbounded_queue {
            QueueCapacity::Unbounded
        } else {
            QueueCapacity::Bounded(self.queue_size)
        }
    }

    fn interval(&self) -> Option<Duration> {
        Some(self.report_interval).filter(|interval| !interval.is_zero())
    }

    fn source(&self) -> Result<LineFileSource<std::io::BufReader<std::fs::File>>> {
        let max = Some(self.max_text_size).filter(|&max| max > 0);
        LineFileSource::open(&self.source, max)
            .with_context(|| format!("opening corpus {}", self.source.display()))
    }

    fn open_index(&self) -> Result<Arc<TantivyIndex>> {
        let settings = match &self.config {
            Some(path) => IndexSettings::from_file(path)
                .with_context(|| format!("loading index settings {}", path.display()))?,
            None => IndexSettings::default(),
        };
        let index = match settings.storage {
            StorageKind::Ram => TantivyIndex::in_memory(&settings)?,
            StorageKind::Mmap => TantivyIndex::open(&self.target, &settings)
                .with_context(|| format!("opening index {}", self.target.display()))?,
        };
        Ok(Arc::new(index))
    }

    fn introspect(
        &self,
        counters: &Arc<Counters>,
        started: Instant,
    ) -> Result<Option<IntrospectServer>> {
        if self.bind_http.is_empty() {
            return Ok(None);
        }
        let state = IntrospectState::new(Arc::clone(counters), started);
        let server = IntrospectServer::start(&self.bind_http, state)
            .with_context(|| format!("binding introspection server to {}", self.bind_http))?;
        Ok(Some(server))
    }
}

fn run(cli: Cli) -> Result<()> {
    let started_at = Local::now();
    let started = Instant::now();
    let counters = Arc::new(Counters::new());

    match cli.workload {
        WorkloadCommand::Index { common, checkpoint } => {
            let settings = PipelineSettings {
                checkpoint: checkpoint.checkpoint(),
                ..common.pipeline_settings()
            };
            let _server = common.introspect(&counters, started)?;
            let index = common.open_index()?;
            let stats = stats_writer(common.stats_file.as_deref())?;
            let outcome = run_indexing(
                common.source()?,
                index,
                &settings,
                Arc::clone(&counters),
                stats,
            )?;
            let summary = RunSummary::new(
                Workload::Index,
                started_at,
                &outcome.final_sample,
                serde_json::to_value(&settings)?,
            )
            .with_checkpoints(outcome.checkpoints.clone());
            report(&summary, &outcome, common.summary_file.as_deref())
        }
        WorkloadCommand::Query { common, query } => {
            let index = common.open_index()?;
            let loaded = load_index(common.source()?, index.as_ref(), common.count)?;
            info!("Index holds {} documents", loaded);

            let settings = QuerySettings {
                clients: query.query_threads,
                queries: query.queries,
                kind: QueryKind::default(),
                bound: match query.duration {
                    Some(duration) => QueryBound::Duration(duration),
                    None => QueryBound::Count(query.query_count),
                },
                queue: common.queue(),
                report_interval: common.interval(),
            };
            let per_phase = |path: Option<&Path>, kind: QueryKind| {
                path.map(|path| match query.kinds.len() {
                    1 => path.to_path_buf(),
                    _ => phase_path(path, kind.name()),
                })
            };

            let _server = common.introspect(&counters, Instant::now())?;
            let phases = run_query_phases(
                index,
                &settings,
                &query.kinds,
                Arc::clone(&counters),
                |kind| {
                    let path = per_phase(common.stats_file.as_deref(), kind);
                    stats_writer(path.as_deref())
                        .map_err(|e| BenchError::Io(io::Error::other(format!("{:#}", e))))
                },
            )?;

            for (kind, outcome) in &phases {
                let phase = QuerySettings {
                    kind: *kind,
                    ..settings.clone()
                };
                let summary = RunSummary::new(
                    Workload::Query,
                    phase_start(outcome).unwrap_or(started_at),
                    &outcome.final_sample,
                    serde_json::to_value(&phase)?,
                )
                .with_query_kind(*kind);
                let summary_file = per_phase(common.summary_file.as_deref(), *kind);
                report(&summary, outcome, summary_file.as_deref())?;
            }
            Ok(())
        }
        WorkloadCommand::Analyze { common, analyzer } => {
            let analyzer = Analyzer::by_name(&analyzer)?;
            let analyzer_name = analyzer.name().to_string();
            let settings = common.pipeline_settings();
            let _server = common.introspect(&counters, started)?;
            let stats = stats_writer(common.stats_file.as_deref())?;
            let outcome = run_analysis(
                common.source()?,
                analyzer,
                &settings,
                Arc::clone(&counters),
                stats,
            )?;
            let mut settings = serde_json::to_value(&settings)?;
            settings["analyzer"] = serde_json::Value::from(analyzer_name);
            let summary = RunSummary::new(
                Workload::Analyze,
                started_at,
                &outcome.final_sample,
                settings,
            );
            report(&summary, &outcome, common.summary_file.as_deref())
        }
    }
}

/// When a query phase started, from its terminal row
fn phase_start(outcome: &PipelineOutcome) -> Option<DateTime<Local>> {
    let finished = DateTime::parse_from_rfc3339(&outcome.final_sample.timestamp).ok()?;
    let elapsed = chrono::Duration::from_std(outcome.final_sample.elapsed).ok()?;
    Some((finished - elapsed).with_timezone(&Local))
}

fn report(
    summary: &RunSummary,
    outcome: &PipelineOutcome,
    summary_file: Option<&Path>,
) -> Result<()> {
    info!("Run summary: {}", JsonReporter::format(summary, false)?);
    info!(
        "{} work units in {:.3}s, {:.3} {}",
        outcome.work_units,
        outcome.elapsed.as_secs_f64(),
        summary.avg_rate,
        summary.rate_unit
    );

    if let Some(path) = summary_file {
        JsonReporter::write_to_file(summary, path)
            .with_context(|| format!("writing summary {}", path.display()))?;
        info!("Summary written to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli: Cli = parse_args();
    let verbose = match &cli.workload {
        WorkloadCommand::Index { common, .. }
        | WorkloadCommand::Query { common, .. }
        | WorkloadCommand::Analyze { common, .. } => common.verbose,
    };
    init_tracing(verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("bench-pipeline failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
