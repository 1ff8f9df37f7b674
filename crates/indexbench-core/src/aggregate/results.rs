//! Shared results table.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{BenchError, Result};

/// CSV table with one row per label and one column per config.
///
/// The first column holds the label. The header is read once and never
/// rewritten; rows are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsTable {
    path: PathBuf,
    header: Vec<String>,
}

impl ResultsTable {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| BenchError::aggregation(path, e))?;

        let header = match reader.records().next() {
            Some(record) => record
                .map_err(|e| BenchError::aggregation(path, e))?
                .iter()
                .map(str::to_string)
                .collect(),
            None => return Err(BenchError::aggregation(path, "results table has no header row")),
        };

        Ok(Self {
            path: path.to_path_buf(),
            header,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Row for `label`: one cell per header column, empty where `values`
    /// has nothing for that column
    pub fn row_for(&self, label: &str, values: &BTreeMap<String, String>) -> Vec<String> {
        self.header
            .iter()
            .enumerate()
            .map(|(i, column)| {
                if i == 0 {
                    label.to_string()
                } else {
                    values.get(column).cloned().unwrap_or_default()
                }
            })
            .collect()
    }

    /// Append `row`, leaving every existing byte in place
    pub fn append_row(&self, row: &[String]) -> Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| BenchError::aggregation(&self.path, e))?;

        if !ends_with_newline(&mut file)? {
            file.write_all(b"\n")?;
        }

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(row)?;
        writer.flush()?;
        Ok(())
    }

    /// Build the row for `label` and append it
    pub fn append(&self, label: &str, values: &BTreeMap<String, String>) -> Result<Vec<String>> {
        let row = self.row_for(label, values);
        self.append_row(&row)?;
        info!("Appended row for '{}' to {}", label, self.path.display());
        Ok(row)
    }
}

fn ends_with_newline(file: &mut File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
