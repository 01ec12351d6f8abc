pub mod align;
pub mod base64;
pub mod codec;
pub mod df;
pub mod document;
pub mod index;
pub mod input;
pub mod matching;
pub mod ngram;
pub mod pipefilter;
pub mod pipeline;
pub mod score;

/// 1-based document id, assigned by line number in the input file.
pub type DocId = usize;
/// A token n-gram reduced to a stable 64-bit hash. Collisions are tolerated.
pub type NgramHash = u64;

/// N-gram keyed map with fixed hasher seeds. Iteration order decides the
/// order floating-point weights are summed in, so it must not vary between
/// runs or invocations if the output is to be reproducible.
pub type NgramMap<V> = std::collections::HashMap<NgramHash, V, ahash::RandomState>;

pub(crate) fn ngram_map<V>() -> NgramMap<V> {
    NgramMap::with_hasher(ahash::RandomState::with_seeds(
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    ))
}

pub use df::DfTable;
pub use document::{Document, DocumentRef, WordScore};
pub use index::{Posting, RefIndex};
pub use score::DocumentPair;
