//! Benchmark harness for document indexing and search workloads
//!
//! This crate provides the moving parts of a repeatable indexing benchmark:
//! a concurrent workload pipeline with live statistics, an orchestrator that
//! sequences configurations and repeats through external commands, and an
//! aggregator that folds repeated measurements into a shared results table.
//!
//! # Features
//!
//! - **Pipeline**: bounded producer/consumer fan-out from a line-file corpus
//!   into an index, a query load generator, or an analyzer
//! - **Live Statistics**: periodic cumulative and windowed rates written as CSV
//! - **Orchestration**: JSON-configured tests with `{{var}}` templated commands
//! - **Aggregation**: mean and population standard deviation across repeats
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use indexbench_core::index::{IndexSettings, TantivyIndex};
//! use indexbench_core::metrics::Counters;
//! use indexbench_core::pipeline::{run_indexing, PipelineSettings};
//! use indexbench_core::source::LineFileSource;
//!
//! # fn example() -> indexbench_core::Result<()> {
//! let source = LineFileSource::open("tmp/enwiki.txt", None)?;
//! let index = Arc::new(TantivyIndex::open("bench.idx", &IndexSettings::default())?);
//! let counters = Arc::new(Counters::new());
//!
//! let outcome = run_indexing(
//!     source,
//!     index,
//!     &PipelineSettings::default(),
//!     counters,
//!     std::io::stdout(),
//! )?;
//! println!("indexed {} docs", outcome.counters.items_processed);
//! # Ok(())
//! # }
//! ```
//!
//! # Orchestrator configuration
//!
//! ```json
//! {
//!   "vars": { "source": "/data/enwiki.txt" },
//!   "tests": {
//!     "indexing": {
//!       "setup": [],
//!       "tests": [
//!         { "command": "bench-pipeline",
//!           "args": ["index", "--source", "{{source}}", "--target", "{{tmpDir}}/idx",
//!                    "--stats-file", "out/{{execLabel}}/{{configName}}/{{runNumber}}/stats.csv"] }
//!       ],
//!       "repeat": 3,
//!       "configs": ["mmap", "ram"],
//!       "aggregates": [
//!         { "command": "bench-aggregate",
//!           "args": ["--testdir", "out", "--label", "{{execLabel}}", "--configs", "{{allConfigs}}",
//!                    "--column", "avg_mb_per_second", "--filename", "stats.csv",
//!                    "--source", "results.csv"] }
//!       ]
//!     }
//!   }
//! }
//! ```

pub mod aggregate;
pub mod analysis;
pub mod batch;
pub mod error;
pub mod index;
pub mod introspect;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod reporter;
pub mod source;
pub mod stats;

// Re-export main types for convenience
pub use error::{BenchError, Result};
pub use index::QueryKind;
pub use metrics::{CounterSnapshot, Counters, LatencySample};
pub use orchestrator::{RunOrchestrator, TestConfig};
pub use reporter::{StatsReporter, Workload};
pub use source::{LineFileSource, Record};
