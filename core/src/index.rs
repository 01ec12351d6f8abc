use std::mem;
use std::path::Path;
use std::sync::Mutex;
use std::thread;

use ahash::AHashMap;
use anyhow::{ensure, Result};

use crate::df::DfTable;
use crate::document::{calculate_tfidf, read_document};
use crate::pipeline::{self, BlockingQueue, QUEUE_SIZE_PER_THREAD};
use crate::{input, DocId, NgramHash};

/// One inverted-index entry: a reference document and the weight the indexed
/// n-gram carries in its normalized vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posting {
    pub doc_id: DocId,
    pub weight: f32,
}

/// Inverted index over the translated corpus: n-gram hash to posting list.
/// Built once, read-only while scoring.
#[derive(Debug, Default)]
pub struct RefIndex {
    postings: AHashMap<NgramHash, Vec<Posting>>,
}

impl RefIndex {
    pub fn get(&self, hash: NgramHash) -> Option<&[Posting]> {
        self.postings.get(&hash).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Fold a worker's thread-local index into this one. When the incoming
    /// posting list is longer than the resident one the two are swapped
    /// first, so the append always copies the shorter list.
    pub fn merge(&mut self, local: AHashMap<NgramHash, Vec<Posting>>) {
        for (hash, mut incoming) in local {
            let dest = self.postings.entry(hash).or_default();
            if dest.len() < incoming.len() {
                mem::swap(dest, &mut incoming);
            }
            dest.extend(incoming);
        }
    }

    /// Order posting lists by document id so that scoring accumulates dot
    /// products in an order independent of worker scheduling.
    pub fn sort_postings(&mut self) {
        for list in self.postings.values_mut() {
            list.sort_by_key(|posting| posting.doc_id);
        }
    }
}

/// Read the translated corpus and build the inverted index of its TF-IDF
/// vectors. `expected_docs` is the corpus size observed by the document
/// frequency pass; a different count here means the input changed under us.
pub fn build_index(
    path: &Path,
    expected_docs: usize,
    document_count: usize,
    df: &DfTable,
    ngram_size: usize,
    jobs: usize,
) -> Result<RefIndex> {
    let queue: BlockingQueue<Vec<pipeline::Line>> =
        BlockingQueue::new(jobs * QUEUE_SIZE_PER_THREAD);
    let shared = Mutex::new(RefIndex::default());

    thread::scope(|s| -> Result<()> {
        let workers: Vec<_> = (0..jobs)
            .map(|_| {
                s.spawn(|| -> Result<()> {
                    let mut local: AHashMap<NgramHash, Vec<Posting>> = AHashMap::new();

                    while let Some(line_batch) = queue.pop() {
                        for line in &line_batch {
                            let document = match read_document(&line.text, line.number, ngram_size)
                            {
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
                            let doc_ref = calculate_tfidf(&document, document_count, df);
                            for entry in doc_ref.wordvec {
                                local.entry(entry.hash).or_default().push(Posting {
                                    doc_id: doc_ref.id,
                                    weight: entry.weight,
                                });
                            }
                        }
                    }

                    shared.lock().unwrap().merge(local);
                    Ok(())
                })
            })
            .collect();

        let queued = input::open(path).and_then(|reader| pipeline::queue_lines(reader, &queue));
        queue.poison(jobs);

        let mut first_error = None;
        for worker in workers {
            if let Err(err) = worker.join().expect("index worker panicked") {
                first_error = first_error.or(Some(err));
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        let queued = queued?;
        ensure!(
            queued == expected_docs,
            "line count changed from {} to {} while reading {} in a second pass",
            expected_docs,
            queued,
            path.display()
        );

        tracing::debug!(performance = %queue.performance(), "load queue");
        Ok(())
    })?;

    let mut index = shared.into_inner().unwrap();
    index.sort_postings();
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_swaps_to_copy_the_shorter_list() {
        let mut index = RefIndex::default();

        let mut short: AHashMap<NgramHash, Vec<Posting>> = AHashMap::new();
        short.insert(
            7,
            vec![Posting {
                doc_id: 1,
                weight: 0.5,
            }],
        );
        index.merge(short);

        let mut long: AHashMap<NgramHash, Vec<Posting>> = AHashMap::new();
        long.insert(
            7,
            vec![
                Posting {
                    doc_id: 2,
                    weight: 0.25,
                },
                Posting {
                    doc_id: 3,
                    weight: 0.75,
                },
            ],
        );
        index.merge(long);

        index.sort_postings();
        let ids: Vec<DocId> = index.get(7).unwrap().iter().map(|p| p.doc_id).collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn missing_hash_has_no_postings() {
        let index = RefIndex::default();
        assert!(index.get(42).is_none());
        assert!(index.is_empty());
    }
}
