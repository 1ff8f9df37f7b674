//! Analyze workload: records through a tokenizer.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::pool::WorkerPool;
use super::queue::work_queue;
use super::work::WorkItem;
use super::{conclude, produce, start_reporter, PipelineOutcome, PipelineSettings};
use crate::analysis::Tokenize;
use crate::batch::BatchPolicy;
use crate::error::Result;
use crate::metrics::Counters;
use crate::reporter::Workload;
use crate::source::Record;

/// Tokenize the body of every record of `source`.
///
/// Each worker owns a clone of `analyzer`. Records are always sent one at a
/// time; the batch size setting does not apply.
pub fn run_analysis<S, A, W>(
    source: S,
    analyzer: A,
    settings: &PipelineSettings,
    counters: Arc<Counters>,
    stats: W,
) -> Result<PipelineOutcome>
where
    S: IntoIterator<Item = Result<Record>>,
    A: Tokenize + Clone + Send + 'static,
    W: Write + Send + 'static,
{
    settings.validate()?;
    let started = Instant::now();
    let reporter = start_reporter(
        Workload::Analyze,
        &counters,
        stats,
        started,
        settings.report_interval,
    )?;

    let (sender, receiver) = work_queue(settings.queue);
    let pool = WorkerPool::spawn_consumers("analyzer", settings.workers, receiver, |_| {
        let mut analyzer = analyzer.clone();
        let counters = Arc::clone(&counters);
        move |item: WorkItem| {
            let tokens = match &item {
                WorkItem::Single { record, .. } => analyzer.token_count(&record.body),
                WorkItem::Batch(batch) => batch
                    .iter()
                    .map(|(_, record)| analyzer.token_count(&record.body))
                    .sum(),
            };
            counters.add_tokens(tokens as u64);
            counters.add_items(item.len() as u64);
            counters.add_bytes(item.plain_text_bytes());
            Ok(())
        }
    });
    let pool = match pool {
        Ok(pool) => pool,
        Err(e) => return conclude(reporter, Err(e), started),
    };

    info!("Analyzing with {} workers", settings.workers);
    let produced = produce(source, &sender, BatchPolicy::Single, settings.count);
    drop(sender);
    let joined = pool.join();

    conclude(reporter, produced.and(joined), started)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;

    #[derive(Clone)]
    struct WordCounter;

    impl Tokenize for WordCounter {
        fn token_count(&mut self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            workers: 3,
            report_interval: None,
            ..PipelineSettings::default()
        }
    }

    #[test]
    fn test_tokens_are_summed() {
        let source = (0..100).map(|_| Ok(Record::new("ignored title", "one two three")));
        let outcome = run_analysis(
            source,
            WordCounter,
            &settings(),
            Arc::new(Counters::new()),
            Vec::new(),
        )
        .unwrap();

        assert_eq!(outcome.counters.tokens_produced, 300);
        assert_eq!(outcome.counters.items_processed, 100);
        assert_eq!(outcome.final_sample.cumulative_count, 300);
    }

    #[test]
    fn test_with_tantivy_analyzer() {
        let source = vec![
            Ok(Record::new("a", "Water is wet.")),
            Ok(Record::new("b", "Fire, hot!")),
        ];
        let outcome = run_analysis(
            source,
            Analyzer::by_name("standard").unwrap(),
            &settings(),
            Arc::new(Counters::new()),
            Vec::new(),
        )
        .unwrap();
        assert_eq!(outcome.counters.tokens_produced, 5);
    }
}
