use std::collections::HashMap;
use std::path::{Path, PathBuf};

use docalign_core::base64;
use docalign_core::df::{compute_df, DfTable};
use docalign_core::index::build_index;
use docalign_core::ngram;

const DOCS: [&str; 10] = [
    "shared prefix alpha one",
    "shared prefix alpha two",
    "shared prefix beta three",
    "shared prefix beta four",
    "other words entirely here",
    "other words entirely there",
    "alpha one again alpha one",
    "beta three again beta three",
    "singleton sentence nobody repeats",
    "shared prefix gamma five",
];

fn write_corpus(dir: &Path, name: &str, docs: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let lines: String = docs
        .iter()
        .map(|doc| format!("{}\n", base64::encode(doc.as_bytes())))
        .collect();
    std::fs::write(&path, lines).unwrap();
    path
}

fn sorted_entries(df: &DfTable) -> Vec<(u64, usize)> {
    let mut entries: Vec<(u64, usize)> = df.iter().collect();
    entries.sort_unstable();
    entries
}

/// Count document frequencies the slow, obvious way.
fn brute_force_df(docs: &[&str], ngram_size: usize, min_count: usize) -> Vec<(u64, usize)> {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for doc in docs {
        let mut distinct: Vec<u64> = ngram::ngrams(doc.as_bytes(), ngram_size).collect();
        distinct.sort_unstable();
        distinct.dedup();
        for hash in distinct {
            *counts.entry(hash).or_insert(0) += 1;
        }
    }
    let mut entries: Vec<(u64, usize)> = counts
        .into_iter()
        .filter(|&(_, count)| count >= min_count)
        .collect();
    entries.sort_unstable();
    entries
}

#[test]
fn matches_a_brute_force_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_corpus(dir.path(), "corpus.tokens", &DOCS);

    let mut df = DfTable::default();
    let count = compute_df(&mut df, &path, 2, 2, 1_000_000).unwrap();

    assert_eq!(count, DOCS.len());
    assert_eq!(sorted_entries(&df), brute_force_df(&DOCS, 2, 2));
}

#[test]
fn batch_size_does_not_change_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_corpus(dir.path(), "corpus.tokens", &DOCS);

    let mut reference = DfTable::default();
    compute_df(&mut reference, &path, 2, 2, 1_000_000_000).unwrap();
    let expected = sorted_entries(&reference);

    for batch_size in [1, 2, 7] {
        let mut df = DfTable::default();
        compute_df(&mut df, &path, 2, 2, batch_size).unwrap();
        assert_eq!(sorted_entries(&df), expected, "batch_size {batch_size}");
    }
}

#[test]
fn accumulates_across_corpora_and_prunes_within_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_corpus(dir.path(), "first.tokens", &DOCS);
    let second = write_corpus(dir.path(), "second.tokens", &DOCS[..5]);

    let mut df = DfTable::default();
    let first_count = compute_df(&mut df, &first, 2, 2, 1_000_000).unwrap();
    let second_count = compute_df(&mut df, &second, 2, 2, 1_000_000).unwrap();
    assert_eq!(first_count + second_count, 15);

    // "shared prefix" appears in 5 + 4 documents; cap it at 6.
    let shared_prefix = ngram::ngrams(b"shared prefix", 2).next().unwrap();
    assert_eq!(df.get(shared_prefix), Some(9));

    df.prune(2, 6);
    assert!(df.is_pruned(shared_prefix));
    assert_eq!(df.get(shared_prefix), None);
    for (hash, count) in df.iter() {
        assert!((2..=6).contains(&count));
        assert!(!df.is_pruned(hash));
    }
}

#[test]
fn pruned_ngrams_never_reach_the_index() {
    let dir = tempfile::tempdir().unwrap();
    // One bigram in every document, corpus used on both sides.
    let docs: Vec<String> = (0..8)
        .map(|i| format!("totally common marker{i} tail{i}"))
        .collect();
    let docs: Vec<&str> = docs.iter().map(String::as_str).collect();
    let path = write_corpus(dir.path(), "both.tokens", &docs);

    // As in the pipeline: per-corpus merges keep everything, the minimum
    // applies to the combined counts at prune time.
    let mut df = DfTable::default();
    let target_count = compute_df(&mut df, &path, 2, 1, 1_000_000).unwrap();
    let translated_count = compute_df(&mut df, &path, 2, 1, 1_000_000).unwrap();
    let document_count = target_count + translated_count;

    df.prune(2, 10);
    let index = build_index(&path, translated_count, document_count, &df, 2, 4).unwrap();

    let common = ngram::ngrams(b"totally common", 2).next().unwrap();
    assert!(df.is_pruned(common), "df of 16 must exceed max_count 10");
    assert!(index.get(common).is_none());
    assert!(!index.is_empty());
}

#[test]
fn min_count_is_respected_without_pruning() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_corpus(dir.path(), "corpus.tokens", &DOCS);

    let mut df = DfTable::default();
    compute_df(&mut df, &path, 2, 3, 1_000_000).unwrap();
    assert!(df.iter().all(|(_, count)| count >= 3));
}
