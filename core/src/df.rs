use std::collections::hash_map::Entry;
use std::io::BufRead;
use std::path::Path;
use std::thread;

use ahash::{AHashMap, AHashSet};
use anyhow::{ensure, Context, Result};

use crate::document::read_document;
use crate::pipeline::{self, BlockingQueue, QUEUE_SIZE_PER_THREAD};
use crate::{input, NgramHash};

/// Worker count for the counting phase of [`compute_df`].
const COUNTING_THREADS: usize = 16;

/// Document frequencies across both corpora, plus the set of n-grams that
/// were pruned for appearing in too many documents. Pruned n-grams are kept
/// around (rather than silently dropped) because the vectorizer must be able
/// to tell "too frequent" apart from "never counted".
#[derive(Debug, Default)]
pub struct DfTable {
    counts: AHashMap<NgramHash, usize>,
    pruned: AHashSet<NgramHash>,
}

impl DfTable {
    pub fn get(&self, hash: NgramHash) -> Option<usize> {
        self.counts.get(&hash).copied()
    }

    pub fn is_pruned(&self, hash: NgramHash) -> bool {
        self.pruned.contains(&hash)
    }

    pub fn insert(&mut self, hash: NgramHash, count: usize) {
        self.counts.insert(hash, count);
    }

    /// Bump a single n-gram by one. Only useful for building small tables by
    /// hand; the streaming path inserts whole-corpus totals directly.
    pub fn increment(&mut self, hash: NgramHash) {
        *self.counts.entry(hash).or_insert(0) += 1;
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn pruned_len(&self) -> usize {
        self.pruned.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NgramHash, usize)> + '_ {
        self.counts.iter().map(|(&hash, &count)| (hash, count))
    }

    /// Drop entries below `min_count` and move entries above `max_count`
    /// into the pruned set, leaving the two disjoint. Returns the number of
    /// entries removed from the table.
    pub fn prune(&mut self, min_count: usize, max_count: usize) -> usize {
        let before = self.counts.len();
        let Self { counts, pruned } = self;
        counts.retain(|&hash, &mut count| {
            if count > max_count {
                pruned.insert(hash);
                return false;
            }
            count >= min_count
        });
        before - self.counts.len()
    }
}

/// Accumulate into `df` the document frequencies of one corpus, keeping at
/// most `batch_size` distinct n-grams per pass in memory. Returns the number
/// of documents in the corpus. Called once per corpus; an n-gram appearing
/// in several corpora ends up with the sum of its per-corpus counts.
///
/// Each outer pass reopens the input and works in two phases. The reading
/// phase collects the next `batch_size` n-grams not yet counted for this
/// corpus, counting them inline over the documents it touches. The counting
/// phase streams the rest of the corpus through parallel workers, each
/// counting occurrences in a private per-slot array; summing the arrays
/// yields totals over every document from the batch window onwards, which
/// covers all occurrences because a batch n-gram first occurs inside its
/// batch window. Entries whose combined count reaches `min_count` are merged
/// into `df`.
pub fn compute_df(
    df: &mut DfTable,
    path: &Path,
    ngram_size: usize,
    min_count: usize,
    batch_size: usize,
) -> Result<usize> {
    let mut batch = 0usize;
    let mut offset = 0usize;
    let mut document_count: Option<usize> = None;
    // N-grams already counted over this corpus, including ones whose count
    // fell below `min_count` at merge. Counts carried over from an earlier
    // corpus are not in here, so those entries get recounted and summed.
    let mut counted: AHashSet<NgramHash> = AHashSet::new();

    loop {
        let reader = input::open(path)?;
        let mut lines = reader.lines();
        for _ in 0..offset {
            lines
                .next()
                .transpose()
                .with_context(|| format!("cannot re-read {}", path.display()))?;
        }
        let old_offset = offset;

        // N-grams first seen in this pass, mapped to a slot in the counter
        // arrays.
        let mut batch_df: AHashMap<NgramHash, u32> = AHashMap::new();
        let mut reader_counts: Vec<u32> = Vec::new();

        while batch_df.len() < batch_size {
            let Some(line) = lines.next() else { break };
            let line = line?;
            offset += 1;
            let document = read_document(&line, offset, ngram_size)
                .with_context(|| format!("document {} of {}", offset, path.display()))?;

            for &hash in document.vocab.keys() {
                if counted.contains(&hash) {
                    continue;
                }
                match batch_df.entry(hash) {
                    Entry::Vacant(slot) => {
                        slot.insert(reader_counts.len() as u32);
                        reader_counts.push(1);
                    }
                    Entry::Occupied(slot) => reader_counts[*slot.get() as usize] += 1,
                }
            }
        }

        tracing::debug!(
            batch,
            read = offset - old_offset,
            ngrams = batch_df.len(),
            "collected batch vocabulary"
        );
        ensure!(
            reader_counts.len() == batch_df.len(),
            "batch vocabulary has {} entries but the counter array has {}",
            batch_df.len(),
            reader_counts.len()
        );

        // Count the batch n-grams over the remainder of the corpus. Each
        // worker owns its counter array; they are summed after the join.
        let queue: BlockingQueue<Vec<pipeline::Line>> =
            BlockingQueue::new(COUNTING_THREADS * QUEUE_SIZE_PER_THREAD);
        let batch_df_ref = &batch_df;

        let (per_worker, queued) = thread::scope(|s| -> Result<(Vec<Vec<u32>>, usize)> {
            let workers: Vec<_> = (0..COUNTING_THREADS)
                .map(|_| {
                    s.spawn(|| -> Result<Vec<u32>> {
                        let mut counts = vec![0u32; batch_df_ref.len()];
                        while let Some(line_batch) = queue.pop() {
                            for line in &line_batch {
                                let document =
                                    match read_document(&line.text, line.number, ngram_size) {
                                        Ok(document) => document,
                                        Err(err) => {
                                            queue.drain();
                                            return Err(err.context(format!(
                                                "document {} of {}",
                                                line.number,
                                                path.display()
                                            )));
                                        }
                                    };
                                for hash in document.vocab.keys() {
                                    if let Some(&slot) = batch_df_ref.get(hash) {
                                        counts[slot as usize] += 1;
                                    }
                                }
                            }
                        }
                        Ok(counts)
                    })
                })
                .collect();

            let queued = pipeline::queue_lines_from(lines, offset, &queue);
            queue.poison(COUNTING_THREADS);

            let mut per_worker = Vec::with_capacity(COUNTING_THREADS);
            let mut first_error = None;
            for worker in workers {
                match worker.join().expect("counting worker panicked") {
                    Ok(counts) => per_worker.push(counts),
                    Err(err) => first_error = first_error.or(Some(err)),
                }
            }
            if let Some(err) = first_error {
                return Err(err);
            }
            Ok((per_worker, queued?))
        })?;

        let total = offset + queued;
        match document_count {
            None => document_count = Some(total),
            Some(expected) => ensure!(
                total == expected,
                "line count of {} changed from {} to {} between passes",
                path.display(),
                expected,
                total
            ),
        }

        let mut new_ngrams = 0usize;
        for (&hash, &slot) in &batch_df {
            let mut count = reader_counts[slot as usize] as usize;
            for counts in &per_worker {
                count += counts[slot as usize] as usize;
            }
            counted.insert(hash);
            let combined = df.get(hash).unwrap_or(0) + count;
            if combined >= min_count {
                df.insert(hash, combined);
                new_ngrams += 1;
            }
        }

        tracing::debug!(
            batch,
            new_ngrams,
            read = offset,
            total = document_count.unwrap_or(0),
            "merged batch into document frequencies"
        );
        batch += 1;

        let document_count = document_count.expect("set on the first pass");
        if offset >= document_count {
            return Ok(document_count);
        }
    }
}
