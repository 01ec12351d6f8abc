use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;

use anyhow::{ensure, Result};

use crate::df::{compute_df, DfTable};
use crate::document::{calculate_tfidf, read_document, DocumentRef};
use crate::index::build_index;
use crate::matching::assign_pairs;
use crate::pipeline::{self, BlockingQueue, Line, QUEUE_SIZE_PER_THREAD};
use crate::score::{score_document, write_header, write_score, ScoreSink};
use crate::{input, RefIndex};

/// Everything the alignment pipeline needs to know, straight from the CLI.
#[derive(Debug, Clone)]
pub struct AlignConfig {
    pub translated_tokens: PathBuf,
    pub target_tokens: PathBuf,
    pub ngram_size: usize,
    pub batch_size: usize,
    pub jobs: usize,
    pub threshold: f32,
    pub min_count: usize,
    pub max_count: usize,
    /// Print every pair at or above the threshold instead of the one-to-one
    /// assignment.
    pub print_all: bool,
}

/// Run the full alignment pipeline and write the result rows to `out`.
///
/// Phases: document frequencies over both corpora (bounded memory,
/// multi-pass), DF pruning, inverted-index build over the translated corpus,
/// then the streaming scoring pass over the target corpus, and finally
/// either the already-printed `--all` rows or the greedy one-to-one
/// assignment.
pub fn run<W: Write + Send>(config: &AlignConfig, out: W) -> Result<()> {
    ensure!(config.ngram_size >= 1, "ngram size must be at least 1");
    ensure!(config.batch_size >= 1, "batch size must be at least 1");
    ensure!(config.jobs >= 1, "job count must be at least 1");

    // Frequencies are summed across both corpora, so the minimum-count
    // threshold can only be applied once both are in: the prune below uses
    // the configured minimum, the per-corpus merges keep everything.
    let mut df = DfTable::default();
    let target_count = compute_df(
        &mut df,
        &config.target_tokens,
        config.ngram_size,
        1,
        config.batch_size,
    )?;
    let translated_count = compute_df(
        &mut df,
        &config.translated_tokens,
        config.ngram_size,
        1,
        config.batch_size,
    )?;
    let document_count = target_count + translated_count;
    tracing::info!(
        translated = translated_count,
        target = target_count,
        ngrams = df.len(),
        "document frequencies computed"
    );

    let removed = df.prune(config.min_count, config.max_count);
    tracing::info!(
        removed,
        too_frequent = df.pruned_len(),
        remaining = df.len(),
        "pruned document frequency table"
    );

    let index = build_index(
        &config.translated_tokens,
        translated_count,
        document_count,
        &df,
        config.ngram_size,
        config.jobs,
    )?;
    tracing::info!(ngrams = index.len(), "reference index built");

    let out = Mutex::new(out);
    write_header(&mut *out.lock().unwrap())?;

    let sink = if config.print_all {
        ScoreSink::PrintAll(&out)
    } else {
        ScoreSink::Collect(Mutex::new(Vec::new()))
    };

    score_corpus(config, &df, &index, document_count, target_count, &sink)?;

    if !config.print_all {
        let assigned = sink.into_pairs();
        let pair_count = assigned.len();
        let assigned = assign_pairs(assigned, translated_count, target_count);
        tracing::info!(
            scored = pair_count,
            assigned = assigned.len(),
            "one-to-one assignment complete"
        );

        let mut out = out.lock().unwrap();
        for pair in assigned {
            write_score(&mut *out, pair.score, pair.translated_id, pair.target_id)?;
        }
        out.flush()?;
    } else {
        out.lock().unwrap().flush()?;
    }

    Ok(())
}

/// The final streaming pass: one producer feeds line batches to `jobs`
/// reader workers that decode and vectorize, which feed `jobs` scorer
/// workers that probe the inverted index and emit qualifying pairs.
fn score_corpus<W: Write + Send>(
    config: &AlignConfig,
    df: &DfTable,
    index: &RefIndex,
    document_count: usize,
    expected_docs: usize,
    sink: &ScoreSink<'_, W>,
) -> Result<()> {
    let jobs = config.jobs;
    let read_queue: BlockingQueue<Vec<Line>> = BlockingQueue::new(jobs * QUEUE_SIZE_PER_THREAD);
    let score_queue: BlockingQueue<Vec<DocumentRef>> =
        BlockingQueue::new(jobs * QUEUE_SIZE_PER_THREAD);

    thread::scope(|s| -> Result<()> {
        let read_workers: Vec<_> = (0..jobs)
            .map(|_| {
                s.spawn(|| -> Result<()> {
                    while let Some(line_batch) = read_queue.pop() {
                        let mut ref_batch = Vec::with_capacity(line_batch.len());
                        for line in &line_batch {
                            match read_document(&line.text, line.number, config.ngram_size) {
                                Ok(document) => {
                                    ref_batch.push(calculate_tfidf(&document, document_count, df));
                                }
                                Err(err) => {
                                    read_queue.drain();
                                    return Err(err.context(format!(
                                        "document {} of {}",
                                        line.number,
                                        config.target_tokens.display()
                                    )));
                                }
                            }
                        }
                        score_queue.push(ref_batch);
                    }
                    Ok(())
                })
            })
            .collect();

        let score_workers: Vec<_> = (0..jobs)
            .map(|_| {
                s.spawn(|| -> Result<()> {
                    while let Some(ref_batch) = score_queue.pop() {
                        for doc_ref in &ref_batch {
                            if let Err(err) =
                                score_document(doc_ref, index, config.threshold, sink)
                            {
                                score_queue.drain();
                                return Err(err);
                            }
                        }
                    }
                    Ok(())
                })
            })
            .collect();

        let queued = input::open(&config.target_tokens)
            .and_then(|reader| pipeline::queue_lines(reader, &read_queue));

        read_queue.poison(jobs);
        let read_results: Vec<_> = read_workers
            .into_iter()
            .map(|worker| worker.join().expect("reader worker panicked"))
            .collect();
        score_queue.poison(jobs);
        let score_results: Vec<_> = score_workers
            .into_iter()
            .map(|worker| worker.join().expect("scorer worker panicked"))
            .collect();

        let queued = queued?;
        for result in read_results.into_iter().chain(score_results) {
            result?;
        }
        ensure!(
            queued == expected_docs,
            "line count changed from {} to {} while reading {} in a second pass",
            expected_docs,
            queued,
            config.target_tokens.display()
        );

        tracing::debug!(
            read = %read_queue.performance(),
            score = %score_queue.performance(),
            "score queues"
        );
        Ok(())
    })
}
