//! Units of work handed from the producer to the worker pool.

use crate::batch::Batch;
use crate::source::Record;

/// A single record or a batch, consumed by exactly one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    Single { id: String, record: Record },
    Batch(Batch),
}

impl WorkItem {
    /// Number of records carried
    pub fn len(&self) -> usize {
        match self {
            WorkItem::Single { .. } => 1,
            WorkItem::Batch(batch) => batch.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Summed title and body length of every record carried
    pub fn plain_text_bytes(&self) -> u64 {
        match self {
            WorkItem::Single { record, .. } => record.plain_text_len(),
            WorkItem::Batch(batch) => batch.plain_text_bytes(),
        }
    }
}
