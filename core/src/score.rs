use std::io::Write;
use std::sync::Mutex;

use ahash::AHashMap;
use anyhow::Result;

use crate::document::DocumentRef;
use crate::index::RefIndex;
use crate::DocId;

/// A candidate pairing: a translated document, a target document, and their
/// cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentPair {
    pub score: f32,
    pub translated_id: DocId,
    pub target_id: DocId,
}

/// Where qualifying pairs go. `PrintAll` writes rows as they are found,
/// under the output mutex; `Collect` gathers them for the matcher.
pub enum ScoreSink<'a, W: Write> {
    PrintAll(&'a Mutex<W>),
    Collect(Mutex<Vec<DocumentPair>>),
}

impl<W: Write> ScoreSink<'_, W> {
    pub fn mark(&self, score: f32, translated_id: DocId, target_id: DocId) -> Result<()> {
        match self {
            ScoreSink::PrintAll(out) => {
                let mut out = out.lock().unwrap();
                write_score(&mut *out, score, translated_id, target_id)?;
            }
            ScoreSink::Collect(pairs) => {
                pairs.lock().unwrap().push(DocumentPair {
                    score,
                    translated_id,
                    target_id,
                });
            }
        }
        Ok(())
    }

    /// The collected pairs; empty in `PrintAll` mode.
    pub fn into_pairs(self) -> Vec<DocumentPair> {
        match self {
            ScoreSink::PrintAll(_) => Vec::new(),
            ScoreSink::Collect(pairs) => pairs.into_inner().unwrap(),
        }
    }
}

pub fn write_header<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "mt_doc_aligner_score\tidx_translated\tidx_trg")?;
    Ok(())
}

pub fn write_score<W: Write>(
    out: &mut W,
    score: f32,
    translated_id: DocId,
    target_id: DocId,
) -> Result<()> {
    writeln!(out, "{score:.5}\t{translated_id}\t{target_id}")?;
    Ok(())
}

/// Probe the inverted index with one target document: accumulate per-candidate
/// dot products and emit every candidate scoring at least `threshold`.
pub fn score_document<W: Write>(
    doc_ref: &DocumentRef,
    index: &RefIndex,
    threshold: f32,
    sink: &ScoreSink<'_, W>,
) -> Result<()> {
    let mut candidates: AHashMap<DocId, f32> = AHashMap::new();

    for entry in &doc_ref.wordvec {
        let Some(postings) = index.get(entry.hash) else {
            continue;
        };
        for posting in postings {
            *candidates.entry(posting.doc_id).or_insert(0.0) += entry.weight * posting.weight;
        }
    }

    for (translated_id, score) in candidates {
        if score >= threshold {
            sink.mark(score, translated_id, doc_ref.id)?;
        }
    }

    Ok(())
}
