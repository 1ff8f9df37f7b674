//! Statistics files written by the pipeline, aggregated into a results table
//!
//! Run with: cargo test -p indexbench-core --test pipeline_to_results

use indexbench_core::aggregate::{self, AggregateRequest};
use indexbench_core::batch::Batch;
use indexbench_core::index::{DocumentIndex, QueryKind};
use indexbench_core::pipeline::{run_indexing, PipelineSettings, QueueCapacity};
use indexbench_core::{BenchError, Counters, Record, Result};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct NullIndex {
    docs: AtomicU64,
}

impl DocumentIndex for NullIndex {
    fn put(&self, _id: &str, _record: &Record) -> Result<()> {
        self.docs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn put_batch(&self, batch: &Batch) -> Result<()> {
        self.docs.fetch_add(batch.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn search(&self, _kind: QueryKind, _text: &str) -> Result<u64> {
        Ok(self.docs.load(Ordering::Relaxed))
    }
}

fn index_run(stats_path: &Path, docs: usize) {
    fs::create_dir_all(stats_path.parent().unwrap()).unwrap();
    let records = (0..docs).map(|i| Ok(Record::new(format!("doc {}", i), "some body text")));
    let settings = PipelineSettings {
        workers: 2,
        queue: QueueCapacity::Bounded(4),
        batch_size: 10,
        report_interval: None,
        ..PipelineSettings::default()
    };
    run_indexing(
        records,
        Arc::new(NullIndex::default()),
        &settings,
        Arc::new(Counters::new()),
        fs::File::create(stats_path).unwrap(),
    )
    .unwrap();
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_docs_indexed_aggregated_per_config() {
    let dir = tempfile::tempdir().unwrap();
    let testdir = dir.path().join("out");
    for (config, counts) in [("ram", [10, 20]), ("mmap", [30, 30])] {
        for (run, docs) in counts.iter().enumerate() {
            let path = testdir.join("v1").join(config).join(run.to_string()).join("stats.csv");
            index_run(&path, *docs);
        }
    }

    let source = dir.path().join("results.csv");
    fs::write(&source, "label,ram,mmap,disk\nv0,\"1.000000,0.000000\",,\n").unwrap();

    let outcome = aggregate::run(&AggregateRequest {
        testdir,
        label: "v1".to_string(),
        configs: vec!["ram".to_string(), "mmap".to_string()],
        column: "docs_indexed".to_string(),
        filename: "stats.csv".to_string(),
        source: source.clone(),
    })
    .unwrap();

    assert_eq!(outcome.summaries["ram"].mean, 15.0);
    assert_eq!(outcome.summaries["ram"].std_dev, 5.0);
    assert_eq!(outcome.summaries["mmap"].std_dev, 0.0);
    assert_eq!(
        outcome.row,
        vec!["v1", "15.000000,5.000000", "30.000000,0.000000", ""]
    );

    assert_eq!(
        fs::read_to_string(&source).unwrap(),
        "label,ram,mmap,disk\n\
         v0,\"1.000000,0.000000\",,\n\
         v1,\"15.000000,5.000000\",\"30.000000,0.000000\",\n"
    );
}

#[test]
fn test_interrupted_run_not_aggregated() {
    let dir = tempfile::tempdir().unwrap();
    let testdir = dir.path().join("out");
    index_run(&testdir.join("v1/ram/0/stats.csv"), 5);

    // A run that died after its first periodic row
    let crashed = testdir.join("v1/ram/1/stats.csv");
    fs::create_dir_all(crashed.parent().unwrap()).unwrap();
    fs::write(
        &crashed,
        "date,docs_indexed,plaintext_bytes_indexed,avg_mb_per_second,mb_per_second,\
         avg_single_doc_ms,single_doc_ms,avg_batched_doc_ms,batched_doc_ms,final\n\
         2024-01-01T00:00:05+00:00,3,60,0.000012,0.000012,0.0,0.0,0.4,0.4,false\n",
    )
    .unwrap();

    let source = dir.path().join("results.csv");
    fs::write(&source, "label,ram\n").unwrap();

    let result = aggregate::run(&AggregateRequest {
        testdir,
        label: "v1".to_string(),
        configs: vec!["ram".to_string()],
        column: "docs_indexed".to_string(),
        filename: "stats.csv".to_string(),
        source: source.clone(),
    });

    match result {
        Err(BenchError::AggregationInput { path, message }) => {
            assert_eq!(path, crashed);
            assert!(message.contains("not marked final"));
        }
        other => panic!("Expected AggregationInput error, got {:?}", other),
    }
    // Nothing appended
    assert_eq!(fs::read_to_string(&source).unwrap(), "label,ram\n");
}

#[test]
fn test_missing_config_directory() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("results.csv");
    fs::write(&source, "label,ram\n").unwrap();

    let result = aggregate::run(&AggregateRequest {
        testdir: dir.path().join("out"),
        label: "v1".to_string(),
        configs: vec!["ram".to_string()],
        column: "docs_indexed".to_string(),
        filename: "stats.csv".to_string(),
        source,
    });
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("no statistics files match"));
}
