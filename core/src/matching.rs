use std::cmp::Ordering;

use crate::score::DocumentPair;

/// Greedy one-to-one assignment over the qualifying pairs.
///
/// Pairs are sorted descending by score with descending id tie-breaks, so
/// the result does not depend on the order scoring workers produced them.
/// The walk skips any pair whose endpoints were already assigned and stops
/// once the smaller corpus is exhausted. Deliberately not an optimal
/// bipartite matching: greedy is cheap and its output is stable.
pub fn assign_pairs(
    mut pairs: Vec<DocumentPair>,
    translated_count: usize,
    target_count: usize,
) -> Vec<DocumentPair> {
    pairs.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.translated_id.cmp(&a.translated_id))
            .then_with(|| b.target_id.cmp(&a.target_id))
    });

    let mut translated_seen = vec![false; translated_count];
    let mut target_seen = vec![false; target_count];
    let limit = translated_count.min(target_count);
    let mut assigned = Vec::with_capacity(limit);

    for pair in pairs {
        if translated_seen[pair.translated_id - 1] || target_seen[pair.target_id - 1] {
            continue;
        }
        translated_seen[pair.translated_id - 1] = true;
        target_seen[pair.target_id - 1] = true;
        assigned.push(pair);

        if assigned.len() == limit {
            break;
        }
    }

    assigned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(score: f32, translated_id: usize, target_id: usize) -> DocumentPair {
        DocumentPair {
            score,
            translated_id,
            target_id,
        }
    }

    #[test]
    fn endpoints_are_assigned_at_most_once() {
        let pairs = vec![
            pair(0.9, 1, 1),
            pair(0.8, 1, 2),
            pair(0.7, 2, 1),
            pair(0.6, 2, 2),
        ];
        let assigned = assign_pairs(pairs, 2, 2);
        assert_eq!(assigned.len(), 2);
        assert_eq!(
            (assigned[0].translated_id, assigned[0].target_id),
            (1, 1)
        );
        assert_eq!(
            (assigned[1].translated_id, assigned[1].target_id),
            (2, 2)
        );
    }

    #[test]
    fn best_score_wins_regardless_of_input_order() {
        let forward = vec![pair(0.5, 1, 2), pair(0.9, 1, 1)];
        let reversed = vec![pair(0.9, 1, 1), pair(0.5, 1, 2)];
        assert_eq!(assign_pairs(forward, 1, 2), assign_pairs(reversed, 1, 2));
    }

    #[test]
    fn equal_scores_break_ties_on_descending_ids() {
        let pairs = vec![pair(0.5, 1, 1), pair(0.5, 2, 2)];
        let assigned = assign_pairs(pairs, 2, 2);
        // Higher translated id sorts first on a tied score.
        assert_eq!(assigned[0].translated_id, 2);
        assert_eq!(assigned[1].translated_id, 1);
    }

    #[test]
    fn stops_after_the_smaller_corpus_is_exhausted() {
        let pairs = vec![pair(0.9, 1, 1), pair(0.8, 2, 1), pair(0.7, 3, 1)];
        let assigned = assign_pairs(pairs, 3, 1);
        assert_eq!(assigned.len(), 1);
        assert_eq!((assigned[0].translated_id, assigned[0].target_id), (1, 1));
    }

    #[test]
    fn no_pairs_no_assignments() {
        assert!(assign_pairs(Vec::new(), 5, 5).is_empty());
    }
}
