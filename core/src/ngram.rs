use std::collections::VecDeque;

use xxhash_rust::xxh64::{xxh64, Xxh64};

const TOKEN_SEED: u64 = 0;
const WINDOW_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Overlapping token n-grams of `body`, each reduced to a 64-bit hash.
///
/// Tokens are maximal runs of non-whitespace bytes, so byte-equal bodies
/// always produce the same hash sequence. A body with fewer than `n` tokens
/// produces nothing. `n` must be at least 1.
pub fn ngrams(body: &[u8], n: usize) -> impl Iterator<Item = u64> + '_ {
    debug_assert!(n >= 1, "ngram size must be at least 1");
    let mut window: VecDeque<u64> = VecDeque::with_capacity(n);
    body.split(|b: &u8| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
        .filter_map(move |token| {
            if window.len() == n {
                window.pop_front();
            }
            window.push_back(xxh64(token, TOKEN_SEED));
            if window.len() == n {
                Some(hash_window(&window))
            } else {
                None
            }
        })
}

fn hash_window(window: &VecDeque<u64>) -> u64 {
    let mut hasher = Xxh64::new(WINDOW_SEED);
    for &token_hash in window {
        hasher.update(&token_hash.to_le_bytes());
    }
    hasher.digest()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bigram_count_is_tokens_minus_one() {
        let hashes: Vec<u64> = ngrams(b"a b c d e", 2).collect();
        assert_eq!(hashes.len(), 4);
    }

    #[test]
    fn byte_equal_bodies_hash_identically() {
        let a: Vec<u64> = ngrams(b"the quick brown fox", 2).collect();
        let b: Vec<u64> = ngrams(b"the quick brown fox", 2).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn whitespace_runs_do_not_change_tokens() {
        let a: Vec<u64> = ngrams(b"the quick  brown\nfox", 2).collect();
        let b: Vec<u64> = ngrams(b"the quick brown fox", 2).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn short_body_yields_nothing() {
        assert_eq!(ngrams(b"lonely", 2).count(), 0);
        assert_eq!(ngrams(b"", 2).count(), 0);
    }

    #[test]
    fn unigrams_are_per_token() {
        let hashes: Vec<u64> = ngrams(b"x y x", 1).collect();
        assert_eq!(hashes.len(), 3);
        assert_eq!(hashes[0], hashes[2]);
        assert_ne!(hashes[0], hashes[1]);
    }

    #[test]
    fn order_matters() {
        let ab: Vec<u64> = ngrams(b"a b", 2).collect();
        let ba: Vec<u64> = ngrams(b"b a", 2).collect();
        assert_ne!(ab, ba);
    }
}
