//! Threshold and greedy filter over the comparison grid

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Similarity of one MU pair before filtering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub mu_first: usize,
    pub mu_second: usize,
    pub xcc: f64,
}

/// Keep pairs with `xcc >= threshold` when `exclude` is set
pub fn apply_threshold(candidates: Vec<Candidate>, threshold: f64, exclude: bool) -> Vec<Candidate> {
    if !exclude {
        return candidates;
    }
    candidates.into_iter().filter(|c| c.xcc >= threshold).collect()
}

/// Two-pass greedy resolution to at most one match per MU on each side
///
/// Pass one keeps the best pair of every first-recording MU, pass two the
/// best remaining pair of every second-recording MU. Ties go to the lower
/// MU index. Output is sorted by first-recording MU.
///
/// This is not an optimal assignment: a MU that is only the second choice
/// of its best partner is dropped even if a pairing for it exists.
pub fn greedy_filter(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by_key(|c| (c.mu_first, c.mu_second));

    let mut best_first: BTreeMap<usize, Candidate> = BTreeMap::new();
    for candidate in candidates {
        best_first
            .entry(candidate.mu_first)
            .and_modify(|kept| {
                if candidate.xcc > kept.xcc {
                    *kept = candidate;
                }
            })
            .or_insert(candidate);
    }

    let mut best_second: BTreeMap<usize, Candidate> = BTreeMap::new();
    for candidate in best_first.into_values() {
        best_second
            .entry(candidate.mu_second)
            .and_modify(|kept| {
                if candidate.xcc > kept.xcc {
                    *kept = candidate;
                }
            })
            .or_insert(candidate);
    }

    let mut filtered: Vec<Candidate> = best_second.into_values().collect();
    filtered.sort_by_key(|c| c.mu_first);
    filtered
}

/// Order of an unfiltered table: first MU ascending, then best match first
pub fn sort_unfiltered(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        a.mu_first
            .cmp(&b.mu_first)
            .then_with(|| b.xcc.total_cmp(&a.xcc))
            .then_with(|| a.mu_second.cmp(&b.mu_second))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(mu_first: usize, mu_second: usize, xcc: f64) -> Candidate {
        Candidate { mu_first, mu_second, xcc }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let kept = apply_threshold(vec![c(0, 0, 0.8), c(0, 1, 0.79)], 0.8, true);
        assert_eq!(kept, vec![c(0, 0, 0.8)]);
        assert_eq!(apply_threshold(vec![c(0, 1, 0.1)], 0.8, false).len(), 1);
    }

    #[test]
    fn test_greedy_two_pass() {
        let candidates = vec![
            c(0, 0, 0.95),
            c(0, 1, 0.85),
            c(1, 0, 0.90),
            c(1, 1, 0.88),
            c(2, 2, 0.81),
        ];
        let filtered = greedy_filter(candidates);
        // MU 1 prefers 0, loses it to MU 0 and is dropped despite (1, 1)
        assert_eq!(filtered, vec![c(0, 0, 0.95), c(2, 2, 0.81)]);
    }

    #[test]
    fn test_ties_prefer_lower_index() {
        let filtered = greedy_filter(vec![c(1, 3, 0.9), c(0, 3, 0.9), c(0, 2, 0.9)]);
        assert_eq!(filtered, vec![c(0, 2, 0.9), c(1, 3, 0.9)]);
    }

    #[test]
    fn test_filter_is_order_independent() {
        let mut candidates = vec![c(2, 1, 0.9), c(0, 1, 0.93), c(1, 0, 0.97), c(0, 0, 0.91)];
        let forward = greedy_filter(candidates.clone());
        candidates.reverse();
        assert_eq!(forward, greedy_filter(candidates));
    }

    #[test]
    fn test_unfiltered_sort() {
        let mut candidates = vec![c(1, 0, 0.5), c(0, 1, 0.2), c(0, 0, 0.7)];
        sort_unfiltered(&mut candidates);
        assert_eq!(candidates, vec![c(0, 0, 0.7), c(0, 1, 0.2), c(1, 0, 0.5)]);
    }
}
