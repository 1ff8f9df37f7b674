//! Document index capability
//!
//! The pipeline only needs to put documents, apply batches and run searches
//! of a given [`QueryKind`]. [`DocumentIndex`] is that contract;
//! [`TantivyIndex`] is the implementation the command line tools use. Implementations must be safe to call from
//! every worker thread at once.

mod settings;
mod tantivy_index;

pub use settings::{IndexSettings, StorageKind};
pub use tantivy_index::TantivyIndex;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::batch::Batch;
use crate::error::{BenchError, Result};
use crate::source::Record;

/// How query text is turned into a search over the body field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// The text is one exact, unanalyzed term
    Term,
    /// The text goes through the query parser, so it may combine terms
    #[default]
    Parsed,
    /// Terms within one edit of the text
    Fuzzy,
}

impl QueryKind {
    pub const ALL: [QueryKind; 3] = [QueryKind::Term, QueryKind::Parsed, QueryKind::Fuzzy];

    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::Term => "term",
            QueryKind::Parsed => "parsed",
            QueryKind::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QueryKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                BenchError::config(
                    "query kind",
                    format!("unknown query kind '{}', expected term, parsed or fuzzy", s),
                )
            })
    }
}

/// Index and query operations the pipeline workers drive
pub trait DocumentIndex: Send + Sync {
    /// Add a single document
    fn put(&self, id: &str, record: &Record) -> Result<()>;

    /// Apply a batch as one all-or-nothing operation
    fn put_batch(&self, batch: &Batch) -> Result<()>;

    /// Run a query, returning the number of matching documents
    fn search(&self, kind: QueryKind, text: &str) -> Result<u64>;

    /// Make everything added so far durable and searchable
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_kind_names() {
        for kind in QueryKind::ALL {
            assert_eq!(kind.name().parse::<QueryKind>().unwrap(), kind);
        }
        assert_eq!(QueryKind::default(), QueryKind::Parsed);
        assert_eq!(serde_json::to_string(&QueryKind::Fuzzy).unwrap(), "\"fuzzy\"");
    }

    #[test]
    fn test_unknown_query_kind() {
        assert!(matches!(
            "match".parse::<QueryKind>(),
            Err(BenchError::ConfigParse { .. })
        ));
    }
}
