//! Run statistics output
//!
//! Two outputs are produced for every pipeline run:
//!
//! - **Live CSV**: [`StatsReporter`] samples the shared counters on a fixed
//!   interval and appends cumulative and windowed rates. The last row is the
//!   terminal measurement, marked `final=true`.
//! - **JSON summary**: [`JsonReporter`] renders a [`RunSummary`] once the run
//!   has finished.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Instant;
//! use indexbench_core::metrics::Counters;
//! use indexbench_core::reporter::{StatsReporter, Workload};
//!
//! # fn example() -> indexbench_core::Result<()> {
//! let counters = Arc::new(Counters::new());
//! let mut reporter = StatsReporter::new(Workload::Index, counters.clone(), Vec::new(), Instant::now())?;
//! counters.add_items(10);
//! counters.add_bytes(2_000_000);
//! let sample = reporter.sample_at(Instant::now(), true)?;
//! assert!(sample.terminal);
//! # Ok(())
//! # }
//! ```

mod json;
mod live;

pub use json::{JsonReporter, RunSummary};
pub use live::{ReporterHandle, StatsReporter, StatsSample, Workload};
