//! Searches run at document-count checkpoints while indexing.
//!
//! Every `every` documents the worker whose item crosses the boundary flushes
//! the index and times the configured search, once cold and then `repeat`
//! more times. Other workers block on the index writer while this runs, so
//! checkpoints slow the indexing rate they are sampled from.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

use crate::error::{BenchError, Result};
use crate::index::{DocumentIndex, QueryKind};

/// When and what to search during an index run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryCheckpoint {
    /// Documents between checkpoints
    pub every: u64,
    /// Timed searches after the first one
    pub repeat: u32,
    pub kind: QueryKind,
    pub query: String,
}

impl Default for QueryCheckpoint {
    fn default() -> Self {
        Self {
            every: 1000,
            repeat: 5,
            kind: QueryKind::Term,
            query: "water".to_string(),
        }
    }
}

/// What one checkpoint measured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointResult {
    /// Indexed document count that triggered the checkpoint
    pub docs: u64,
    /// Time since the run started
    pub elapsed_ms: f64,
    /// Matches of the first search
    pub matches: u64,
    pub first_query_ms: f64,
    /// Mean over the repeated searches; 0 when `repeat` is 0
    pub avg_query_ms: f64,
}

impl QueryCheckpoint {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.every == 0 {
            return Err(BenchError::config(
                "checkpoint",
                "documents between checkpoints must be at least 1",
            ));
        }
        if self.query.trim().is_empty() {
            return Err(BenchError::config("checkpoint", "query must not be empty"));
        }
        Ok(())
    }

    /// Whether growing the document count from `before` to `after` passes a
    /// checkpoint
    pub(crate) fn crossed(&self, before: u64, after: u64) -> bool {
        crosses(self.every, before, after)
    }

    /// Flush `index` and time the searches
    pub(crate) fn run<I>(&self, index: &I, docs: u64, started: Instant) -> Result<CheckpointResult>
    where
        I: DocumentIndex + ?Sized,
    {
        index.flush()?;

        let first = Instant::now();
        let matches = index.search(self.kind, &self.query)?;
        let first_query = first.elapsed();

        let repeated = Instant::now();
        for _ in 0..self.repeat {
            index.search(self.kind, &self.query)?;
        }
        let avg_query = match self.repeat {
            0 => Duration::ZERO,
            n => repeated.elapsed() / n,
        };

        let result = CheckpointResult {
            docs,
            elapsed_ms: millis(started.elapsed()),
            matches,
            first_query_ms: millis(first_query),
            avg_query_ms: millis(avg_query),
        };
        info!(
            "Checkpoint at {} docs: {} query '{}' matched {}, first {:.3} ms, avg of {} {:.3} ms",
            docs,
            self.kind,
            self.query,
            matches,
            result.first_query_ms,
            self.repeat,
            result.avg_query_ms
        );
        Ok(result)
    }
}

/// Whether a count growing from `before` to `after` passes a multiple of
/// `every`; never for `every == 0`
pub(crate) fn crosses(every: u64, before: u64, after: u64) -> bool {
    every > 0 && before / every != after / every
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1e3
}
