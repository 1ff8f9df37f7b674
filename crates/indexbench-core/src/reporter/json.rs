//! JSON summary of a finished pipeline run

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::live::{StatsSample, Workload};
use crate::error::Result;
use crate::index::QueryKind;
use crate::metrics::{CounterSnapshot, LatencySample};
use crate::pipeline::CheckpointResult;

/// Final figures of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub workload: Workload,
    pub started_at: String,
    pub finished_at: String,
    pub elapsed_secs: f64,
    pub counters: CounterSnapshot,
    pub avg_rate: f64,
    pub rate_unit: String,
    /// Average operation latencies over the whole run
    pub latency: LatencySample,
    /// Kind of the query phase this run measured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_kind: Option<QueryKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checkpoints: Vec<CheckpointResult>,
    /// Settings the run was started with, as given on the command line
    pub settings: serde_json::Value,
}

impl RunSummary {
    pub fn new(
        workload: Workload,
        started_at: DateTime<Local>,
        terminal: &StatsSample,
        settings: serde_json::Value,
    ) -> Self {
        Self {
            workload,
            started_at: started_at.to_rfc3339(),
            finished_at: terminal.timestamp.clone(),
            elapsed_secs: terminal.elapsed.as_secs_f64(),
            counters: terminal.snapshot,
            avg_rate: terminal.cumulative_rate,
            rate_unit: workload.rate_unit().to_string(),
            latency: terminal.cumulative_latency,
            query_kind: None,
            checkpoints: Vec::new(),
            settings,
        }
    }

    pub fn with_query_kind(mut self, kind: QueryKind) -> Self {
        self.query_kind = Some(kind);
        self
    }

    pub fn with_checkpoints(mut self, checkpoints: Vec<CheckpointResult>) -> Self {
        self.checkpoints = checkpoints;
        self
    }
}

/// JSON format reporter
pub struct JsonReporter;

impl JsonReporter {
    /// Format a run summary as JSON
    ///
    /// # Arguments
    ///
    /// * `summary` - The summary to format
    /// * `pretty` - Whether to pretty-print the JSON
    pub fn format(summary: &RunSummary, pretty: bool) -> Result<String> {
        let output = if pretty {
            serde_json::to_string_pretty(summary)?
        } else {
            serde_json::to_string(summary)?
        };
        Ok(output)
    }

    /// Write a pretty-printed summary, creating parent directories
    pub fn write_to_file<P: AsRef<Path>>(summary: &RunSummary, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut output = Self::format(summary, true)?;
        output.push('\n');
        fs::write(path, output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_summary() -> RunSummary {
        let sample = StatsSample {
            timestamp: "2024-01-01T00:00:10+00:00".to_string(),
            snapshot: CounterSnapshot {
                items_processed: 1000,
                bytes_processed: 5_000_000,
                ..CounterSnapshot::default()
            },
            elapsed: Duration::from_secs(10),
            cumulative_count: 1000,
            windowed_count: 100,
            cumulative_rate: 0.5,
            windowed_rate: 0.4,
            cumulative_latency: LatencySample {
                single_doc_ms: 2.5,
                ..LatencySample::default()
            },
            windowed_latency: LatencySample::default(),
            terminal: true,
        };
        RunSummary::new(
            Workload::Index,
            Local::now(),
            &sample,
            serde_json::json!({ "workers": 8, "batch_size": 100 }),
        )
    }

    #[test]
    fn test_json_format_compact() {
        let output = JsonReporter::format(&create_summary(), false).unwrap();

        assert!(!output.contains('\n'));
        assert!(output.contains("\"workload\":\"index\""));
        assert!(output.contains("\"rate_unit\":\"MB/s\""));
        assert!(output.contains("\"single_doc_ms\":2.5"));
        assert!(!output.contains("checkpoints"));
        assert!(!output.contains("query_kind"));
    }

    #[test]
    fn test_query_kind_and_checkpoints_included_when_set() {
        let summary = create_summary()
            .with_query_kind(QueryKind::Fuzzy)
            .with_checkpoints(vec![CheckpointResult {
                docs: 1000,
                elapsed_ms: 812.0,
                matches: 17,
                first_query_ms: 1.5,
                avg_query_ms: 0.25,
            }]);
        let output = JsonReporter::format(&summary, false).unwrap();
        assert!(output.contains("\"query_kind\":\"fuzzy\""));
        assert!(output.contains("\"matches\":17"));

        let parsed: RunSummary = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, summary);
    }

    #[test]
    fn test_json_format_pretty() {
        let output = JsonReporter::format(&create_summary(), true).unwrap();
        assert!(output.contains('\n'));
        assert!(output.contains("  "));
    }

    #[test]
    fn test_json_roundtrip() {
        let summary = create_summary();
        let json = JsonReporter::format(&summary, false).unwrap();
        let parsed: RunSummary = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, summary);
        assert_eq!(parsed.counters.items_processed, 1000);
        assert_eq!(parsed.elapsed_secs, 10.0);
    }

    #[test]
    fn test_write_to_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("summary.json");
        JsonReporter::write_to_file(&create_summary(), &path).unwrap();

        let parsed: RunSummary = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.workload, Workload::Index);
    }
}
