//! Cross-run aggregation
//!
//! Each repeat of a config leaves one statistics CSV at
//! `<testdir>/<label>/<config>/<run>/<filename>`. The aggregator takes the
//! named column from the last row of every such file, reduces the values of
//! each config to mean and population standard deviation, and appends one
//! row for the label to a shared results table.
//!
//! A statistics file with a `final` column must end in a row marked `true`;
//! anything else is an interrupted run and is rejected.

mod results;

pub use results::ResultsTable;

use csv::StringRecord;
use glob::Pattern;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::error::{BenchError, Result};
use crate::stats::Summary;

/// Column marking the terminal row of a statistics file
pub const FINAL_COLUMN: &str = "final";

/// Inputs of one aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRequest {
    /// Root of the per-label result directories
    pub testdir: PathBuf,
    pub label: String,
    pub configs: Vec<String>,
    /// Statistics column to aggregate
    pub column: String,
    /// Statistics file name inside each run directory
    pub filename: String,
    /// Results table to append to
    pub source: PathBuf,
}

/// Per-config summaries and the row that was appended
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutcome {
    pub summaries: BTreeMap<String, Summary>,
    pub row: Vec<String>,
}

/// Aggregate every config of `request` and append the row
#[instrument(skip(request), fields(label = %request.label, column = %request.column))]
pub fn run(request: &AggregateRequest) -> Result<AggregateOutcome> {
    if request.column.is_empty() {
        return Err(BenchError::config("column", "a column to aggregate is required"));
    }
    if request.configs.is_empty() {
        return Err(BenchError::config("configs", "at least one config is required"));
    }

    let table = ResultsTable::open(&request.source)?;

    let mut summaries = BTreeMap::new();
    for config in &request.configs {
        info!("Working on config: {}", config);
        let files = files_for_config(&request.testdir, &request.label, config, &request.filename)?;
        let summary = aggregate_files(&files, &request.column)?;
        info!(
            "{}: mean {:.6}, stddev {:.6} over {} runs",
            config, summary.mean, summary.std_dev, summary.count
        );
        summaries.insert(config.clone(), summary);
    }

    let values: BTreeMap<String, String> = summaries
        .iter()
        .map(|(config, summary)| (config.clone(), summary.packed()))
        .collect();
    let row = table.append(&request.label, &values)?;

    Ok(AggregateOutcome { summaries, row })
}

/// Statistics files of every run of `config`, sorted by path.
///
/// No match at all is an error.
pub fn files_for_config(
    testdir: &Path,
    label: &str,
    config: &str,
    filename: &str,
) -> Result<Vec<PathBuf>> {
    let pattern = Path::new(&Pattern::escape(&testdir.to_string_lossy()))
        .join(Pattern::escape(label))
        .join(Pattern::escape(config))
        .join("*")
        .join(Pattern::escape(filename));
    let pattern = pattern.to_string_lossy();
    debug!("Pattern is {}", pattern);

    let paths = glob::glob(&pattern).map_err(|e| BenchError::aggregation(testdir, e))?;
    let mut files = paths
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| BenchError::aggregation(testdir, e))?;
    files.sort();

    if files.is_empty() {
        return Err(BenchError::aggregation(
            testdir,
            format!("no statistics files match '{}'", pattern),
        ));
    }
    Ok(files)
}

/// Value of `column` in the last row of the statistics file at `path`
pub fn final_value(path: &Path, column: &str) -> Result<f64> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| BenchError::aggregation(path, e))?;
    let rows = reader
        .records()
        .collect::<std::result::Result<Vec<StringRecord>, _>>()
        .map_err(|e| BenchError::aggregation(path, e))?;

    let (Some(header), Some(last)) = (rows.first(), rows.last()) else {
        return Err(BenchError::aggregation(path, "file is empty"));
    };
    if rows.len() < 2 {
        return Err(BenchError::aggregation(
            path,
            "needs a header row and at least one data row",
        ));
    }

    let index = header
        .iter()
        .position(|name| name == column)
        .ok_or_else(|| BenchError::aggregation(path, format!("column '{}' not found", column)))?;

    if let Some(marker) = header.iter().position(|name| name == FINAL_COLUMN) {
        if last.get(marker) != Some("true") {
            return Err(BenchError::aggregation(
                path,
                "last row is not marked final, the run did not complete",
            ));
        }
    }

    let raw = last.get(index).unwrap_or_default();
    raw.trim().parse::<f64>().map_err(|e| {
        BenchError::aggregation(path, format!("value '{}' of column '{}': {}", raw, column, e))
    })
}

/// Mean and population standard deviation of the final values of `files`
pub fn aggregate_files(files: &[PathBuf], column: &str) -> Result<Summary> {
    let values = files
        .iter()
        .map(|path| final_value(path, column))
        .collect::<Result<Vec<_>>>()?;
    Summary::from_samples(&values)
        .ok_or_else(|| BenchError::aggregation(PathBuf::new(), "no statistics files given"))
}
