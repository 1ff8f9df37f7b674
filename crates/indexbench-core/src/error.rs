//! Error types for the benchmark harness
//!
//! Every failure the harness can hit is a [`BenchError`] value. Nothing in the
//! library terminates the process; the binaries decide what is fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, BenchError>;

/// Harness error kinds
#[derive(Error, Debug)]
pub enum BenchError {
    /// Malformed configuration document or an invalid field value
    #[error("invalid config at '{field}': {message}")]
    ConfigParse { field: String, message: String },

    /// Template syntax error or a reference to an unknown variable
    #[error("cannot resolve template '{template}': {message}")]
    TemplateResolution { template: String, message: String },

    /// Executable not found on the search path
    #[error("failed to locate command '{command}': {message}")]
    CommandLookup { command: String, message: String },

    /// Command could not be spawned or exited unsuccessfully
    #[error("command '{command}' failed: {message}")]
    CommandExecution {
        command: String,
        message: String,
        /// Captured stdout followed by stderr
        output: String,
    },

    /// Corpus line that does not split into the expected fields
    #[error("malformed record on line {line}: expected {expected} fields, found {found}")]
    RecordParse {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Failure reported by the index or query capability
    #[error("index operation '{operation}' failed: {message}")]
    IndexOperation {
        operation: &'static str,
        message: String,
    },

    /// Statistics input that cannot be aggregated
    #[error("cannot aggregate {}: {message}", path.display())]
    AggregationInput { path: PathBuf, message: String },

    /// Worker thread that panicked instead of returning
    #[error("worker thread '{0}' panicked")]
    WorkerPanicked(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BenchError {
    pub(crate) fn config(field: impl Into<String>, message: impl ToString) -> Self {
        BenchError::ConfigParse {
            field: field.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn template(template: &str, message: impl ToString) -> Self {
        BenchError::TemplateResolution {
            template: template.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn index(operation: &'static str, message: impl ToString) -> Self {
        BenchError::IndexOperation {
            operation,
            message: message.to_string(),
        }
    }

    pub(crate) fn aggregation(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        BenchError::AggregationInput {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
