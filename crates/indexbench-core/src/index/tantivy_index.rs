//! Tantivy-backed [`DocumentIndex`]

use std::fs;
use std::path::Path;
use std::sync::RwLock;
use tantivy::collector::Count;
use tantivy::directory::MmapDirectory;
use tantivy::indexer::UserOperation;
use tantivy::query::{FuzzyTermQuery, Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, STORED, STRING, TEXT};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use super::{DocumentIndex, IndexSettings, QueryKind, StorageKind};
use crate::batch::Batch;
use crate::error::{BenchError, Result};
use crate::source::Record;

/// Full-text index over corpus records
///
/// # Schema
///
/// - `id`: record ordinal (STRING | STORED)
/// - `title`: exact title (STRING)
/// - `body`: tokenized body text (TEXT), the field queries run against
///
/// Term and fuzzy queries match indexed tokens, which the default tokenizer
/// lowercases, so their text should be lowercase too.
///
/// Single puts and batches share one writer. Documents become searchable
/// after [`DocumentIndex::flush`].
pub struct TantivyIndex {
    index: Index,
    writer: RwLock<IndexWriter>,
    reader: IndexReader,
    id_field: Field,
    title_field: Field,
    body_field: Field,
}

fn schema() -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_text_field("id", STRING | STORED);
    schema_builder.add_text_field("title", STRING);
    schema_builder.add_text_field("body", TEXT);
    schema_builder.build()
}

impl TantivyIndex {
    /// Open or create an index at `path` according to `settings`.
    ///
    /// With [`StorageKind::Ram`] the path is not touched.
    pub fn open<P: AsRef<Path>>(path: P, settings: &IndexSettings) -> Result<Self> {
        let path = path.as_ref();
        let index = match settings.storage {
            StorageKind::Ram => Index::create_in_ram(schema()),
            StorageKind::Mmap => {
                fs::create_dir_all(path)?;
                let directory =
                    MmapDirectory::open(path).map_err(|e| BenchError::index("open", e))?;
                Index::open_or_create(directory, schema())
                    .map_err(|e| BenchError::index("open", e))?
            }
        };
        debug!(
            "Opened {:?} index at {} with {:?}",
            settings.storage,
            path.display(),
            settings
        );
        Self::from_index(index, settings)
    }

    /// Create an in-memory index
    pub fn in_memory(settings: &IndexSettings) -> Result<Self> {
        Self::from_index(Index::create_in_ram(schema()), settings)
    }

    fn from_index(index: Index, settings: &IndexSettings) -> Result<Self> {
        let schema = index.schema();
        let field = |name: &str| schema.get_field(name).map_err(|e| BenchError::index("open", e));
        let id_field = field("id")?;
        let title_field = field("title")?;
        let body_field = field("body")?;

        let writer: IndexWriter = match settings.writer_threads {
            Some(threads) => index.writer_with_num_threads(threads, settings.writer_heap_bytes),
            None => index.writer(settings.writer_heap_bytes),
        }
        .map_err(|e| BenchError::index("open", e))?;

        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| BenchError::index("open", e))?;

        Ok(Self {
            index,
            writer: RwLock::new(writer),
            reader,
            id_field,
            title_field,
            body_field,
        })
    }

    fn document(&self, id: &str, record: &Record) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        doc.add_text(self.id_field, id);
        doc.add_text(self.title_field, &record.title);
        doc.add_text(self.body_field, &record.body);
        doc
    }

    fn body_term(&self, text: &str) -> Term {
        Term::from_field_text(self.body_field, text)
    }

    /// Documents visible to searches as of the last flush
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

impl DocumentIndex for TantivyIndex {
    fn put(&self, id: &str, record: &Record) -> Result<()> {
        let writer = self
            .writer
            .read()
            .map_err(|_| BenchError::index("put", "writer lock poisoned"))?;
        writer
            .add_document(self.document(id, record))
            .map_err(|e| BenchError::index("put", e))?;
        Ok(())
    }

    fn put_batch(&self, batch: &Batch) -> Result<()> {
        let operations: Vec<UserOperation> = batch
            .iter()
            .map(|(id, record)| UserOperation::Add(self.document(id, record)))
            .collect();

        let writer = self
            .writer
            .read()
            .map_err(|_| BenchError::index("put_batch", "writer lock poisoned"))?;
        // Operations passed to one run() call land in the same commit
        writer
            .run(operations)
            .map_err(|e| BenchError::index("put_batch", e))?;
        Ok(())
    }

    fn search(&self, kind: QueryKind, text: &str) -> Result<u64> {
        let query: Box<dyn Query> = match kind {
            QueryKind::Term => Box::new(TermQuery::new(
                self.body_term(text),
                IndexRecordOption::Basic,
            )),
            QueryKind::Fuzzy => Box::new(FuzzyTermQuery::new(self.body_term(text), 1, true)),
            QueryKind::Parsed => QueryParser::for_index(&self.index, vec![self.body_field])
                .parse_query(text)
                .map_err(|e| BenchError::index("search", e))?,
        };
        let count = self
            .reader
            .searcher()
            .search(query.as_ref(), &Count)
            .map_err(|e| BenchError::index("search", e))?;
        Ok(count as u64)
    }

    fn flush(&self) -> Result<()> {
        let mut writer = self
            .writer
            .write()
            .map_err(|_| BenchError::index("flush", "writer lock poisoned"))?;
        writer.commit().map_err(|e| BenchError::index("flush", e))?;
        self.reader
            .reload()
            .map_err(|e| BenchError::index("flush", e))?;
        Ok(())
    }
}
