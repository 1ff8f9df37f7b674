//! Index settings file

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{BenchError, Result};

/// Where the index lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Memory-mapped files in the target directory
    #[default]
    Mmap,
    /// Entirely in RAM; the target path is ignored
    Ram,
}

/// Tunables for the index under test, typically one file per benchmark config
///
/// # Example
///
/// ```
/// use indexbench_core::index::{IndexSettings, StorageKind};
///
/// let settings = IndexSettings::from_str(r#"{ "storage": "ram", "writer_threads": 2 }"#).unwrap();
/// assert_eq!(settings.storage, StorageKind::Ram);
/// assert_eq!(settings.writer_threads, Some(2));
/// assert_eq!(settings.writer_heap_bytes, 50_000_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexSettings {
    pub storage: StorageKind,
    /// Total memory budget shared by the writer threads
    pub writer_heap_bytes: usize,
    /// Indexing threads inside the writer; `None` lets the index decide
    pub writer_threads: Option<usize>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            storage: StorageKind::Mmap,
            writer_heap_bytes: 50_000_000,
            writer_threads: None,
        }
    }
}

impl IndexSettings {
    /// Load settings from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::from_str(&content).map_err(|e| match e {
            BenchError::ConfigParse { message, .. } => {
                BenchError::config(path.display().to_string(), message)
            }
            other => other,
        })
    }

    /// Parse settings from a JSON string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let settings: IndexSettings =
            serde_json::from_str(content).map_err(|e| BenchError::config("index settings", e))?;
        if settings.writer_threads == Some(0) {
            return Err(BenchError::config(
                "writer_threads",
                "must be at least 1 when set",
            ));
        }
        Ok(settings)
    }
}
