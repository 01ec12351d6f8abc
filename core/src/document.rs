use anyhow::Result;

use crate::df::DfTable;
use crate::{base64, ngram, DocId, NgramHash, NgramMap};

/// A transient document: constructed from one input line, consumed within
/// the same batch, then discarded.
#[derive(Debug)]
pub struct Document {
    pub id: DocId,
    /// N-gram hash -> occurrence count within this document.
    pub vocab: NgramMap<u32>,
}

/// One non-zero coordinate of a document's sparse TF-IDF vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordScore {
    pub hash: NgramHash,
    pub weight: f32,
}

/// An L2-normalized sparse TF-IDF vector plus the document id. Only terms
/// present in the document frequency table are stored, so the norm of the
/// stored vector may be below 1.
#[derive(Debug, Clone, Default)]
pub struct DocumentRef {
    pub id: DocId,
    pub wordvec: Vec<WordScore>,
}

/// Decode one base64 input line and count its n-grams.
pub fn read_document(encoded: &str, id: DocId, ngram_size: usize) -> Result<Document> {
    let body = base64::decode(encoded)?;
    let mut vocab = crate::ngram_map();
    for hash in ngram::ngrams(&body, ngram_size) {
        *vocab.entry(hash).or_insert(0) += 1;
    }
    Ok(Document { id, vocab })
}

/// Smooth TF / smooth IDF weight of a term.
#[inline]
pub fn tfidf(tf: u32, doc_count: usize, df: usize) -> f32 {
    (tf as f32 + 1.0).ln() * (doc_count as f32 / (1.0 + df as f32)).ln()
}

/// Turn a document's n-gram counts into an L2-normalized sparse vector.
///
/// Terms in the frequency table are weighted and emitted. Terms in the
/// pruned set are skipped entirely. Unknown terms are weighted as if their
/// document frequency were 1 and contribute to the norm without being
/// emitted, so a document full of rare terms does not score artificially
/// high on the few terms the table does know.
pub fn calculate_tfidf(document: &Document, doc_count: usize, df: &DfTable) -> DocumentRef {
    let mut wordvec = Vec::with_capacity(document.vocab.len());
    let mut squared_norm = 0.0f32;

    for (&hash, &count) in &document.vocab {
        if let Some(document_frequency) = df.get(hash) {
            let weight = tfidf(count, doc_count, document_frequency);
            wordvec.push(WordScore { hash, weight });
            squared_norm += weight * weight;
        } else if df.is_pruned(hash) {
            // Appeared in too many documents: no weight, no norm share.
        } else {
            let weight = tfidf(count, doc_count, 1);
            squared_norm += weight * weight;
        }
    }

    if squared_norm > 0.0 {
        let norm = squared_norm.sqrt();
        for entry in &mut wordvec {
            entry.weight /= norm;
        }
    }

    DocumentRef {
        id: document.id,
        wordvec,
    }
}
