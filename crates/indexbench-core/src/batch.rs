//! Batch accumulation for amortized indexing
//!
//! A [`Batcher`] collects `(id, record)` pairs until the configured size is
//! reached. The producer then takes the full batch with [`Batcher::flush`];
//! at end of input the same call hands back whatever partial batch remains.
//!
//! Batch sizes of 0 or 1 do not batch at all: [`BatchPolicy::Single`] sends
//! every record as its own work item so single-document indexing latency is
//! measured on its own code path.

use serde::{Deserialize, Serialize};

use crate::source::Record;

/// How the producer groups records into work items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchPolicy {
    /// Every record is its own work item
    Single,
    /// Records are grouped into batches of this size
    Batched(usize),
}

impl BatchPolicy {
    pub fn from_batch_size(batch_size: usize) -> Self {
        if batch_size <= 1 {
            BatchPolicy::Single
        } else {
            BatchPolicy::Batched(batch_size)
        }
    }
}

/// Ordered group of records applied to the index as one operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    entries: Vec<(String, Record)>,
    plain_text_bytes: u64,
}

impl Batch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            plain_text_bytes: 0,
        }
    }

    pub fn push(&mut self, id: String, record: Record) {
        self.plain_text_bytes += record.plain_text_len();
        self.entries.push((id, record));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Summed title and body length of every record in the batch
    pub fn plain_text_bytes(&self) -> u64 {
        self.plain_text_bytes
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.entries.iter().map(|(id, record)| (id.as_str(), record))
    }

    pub fn into_entries(self) -> Vec<(String, Record)> {
        self.entries
    }
}

/// Accumulates records into fixed-size batches
#[derive(Debug)]
pub struct Batcher {
    batch_size: usize,
    current: Batch,
}

impl Batcher {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            current: Batch::with_capacity(batch_size),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Add a record, returning the size of the batch being built
    pub fn add(&mut self, id: String, record: Record) -> usize {
        self.current.push(id, record);
        self.current.len()
    }

    pub fn is_full(&self) -> bool {
        self.current.len() >= self.batch_size
    }

    /// Take the batch being built and start a new one.
    ///
    /// Returns `None` when nothing has been added since the last flush.
    pub fn flush(&mut self) -> Option<Batch> {
        if self.current.is_empty() {
            return None;
        }
        Some(std::mem::replace(
            &mut self.current,
            Batch::with_capacity(self.batch_size),
        ))
    }

    /// Add a record and take the batch if that filled it
    pub fn push(&mut self, id: String, record: Record) -> Option<Batch> {
        self.add(id, record);
        if self.is_full() {
            self.flush()
        } else {
            None
        }
    }
}
