//! Combination of n-best results of consecutive segments.
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::HashSet;

use crate::tokenizer::nbest::{MultiSearchResult, NbestPath};

#[derive(Debug, Eq, PartialEq)]
struct PairEntry {
    cost: i64,
    left: usize,
    right: usize,
}

impl PartialOrd for PairEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed for a min-heap.
impl Ord for PairEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.left.cmp(&self.left))
            .then_with(|| other.right.cmp(&self.right))
    }
}

/// Partial combination: the rank of the path chosen in each segment so far.
struct Combination {
    ranks: Vec<usize>,
    cost: i64,
}

/// Combines n-best results of consecutive segments into those of the whole
/// input, keeping at most `max_count` combinations whose costs are no more
/// than the sum of the best costs plus `cost_slack`.
///
/// Each segment's paths must be sorted in ascending order of cost. The result
/// is empty if any segment has no path.
pub fn merge(
    results: &[MultiSearchResult],
    max_count: usize,
    cost_slack: i64,
) -> MultiSearchResult {
    if results.is_empty() || max_count == 0 || results.iter().any(|r| r.is_empty()) {
        return MultiSearchResult::default();
    }

    // suffix[j] is a lower bound of the cost of segments j.. combined.
    let mut suffix = vec![0i64; results.len() + 1];
    for j in (0..results.len()).rev() {
        suffix[j] = suffix[j + 1].saturating_add(results[j].paths[0].cost);
    }
    let bound = suffix[0].saturating_add(cost_slack.max(0));

    let mut running: Vec<_> = results[0]
        .paths
        .iter()
        .enumerate()
        .take_while(|(_, path)| path.cost.saturating_add(suffix[1]) <= bound)
        .take(max_count)
        .map(|(rank, path)| Combination {
            ranks: vec![rank],
            cost: path.cost,
        })
        .collect();

    for (j, result) in results.iter().enumerate().skip(1) {
        running = merge_pair(&running, &result.paths, suffix[j + 1], bound, max_count);
        tracing::trace!(
            segment = j,
            num_combinations = running.len(),
            "merged a segment"
        );
    }

    let paths = running
        .into_iter()
        .map(|comb| {
            let nodes = comb
                .ranks
                .iter()
                .zip(results)
                .flat_map(|(&rank, result)| result.paths[rank].nodes.iter().cloned())
                .collect();
            NbestPath {
                nodes,
                cost: comb.cost,
            }
        })
        .collect();
    MultiSearchResult { paths }
}

fn merge_pair(
    running: &[Combination],
    next: &[NbestPath],
    rest_bound: i64,
    bound: i64,
    max_count: usize,
) -> Vec<Combination> {
    let mut merged = vec![];
    if running.is_empty() {
        return merged;
    }
    let mut heap = BinaryHeap::new();
    let mut visited = HashSet::new();
    let cost_of = |left: usize, right: usize| running[left].cost.saturating_add(next[right].cost);

    heap.push(PairEntry {
        cost: cost_of(0, 0),
        left: 0,
        right: 0,
    });
    visited.insert((0, 0));

    while let Some(PairEntry { cost, left, right }) = heap.pop() {
        if cost.saturating_add(rest_bound) > bound {
            break;
        }
        let mut ranks = running[left].ranks.clone();
        ranks.push(right);
        merged.push(Combination { ranks, cost });
        if merged.len() >= max_count {
            break;
        }
        for (l, r) in [(left + 1, right), (left, right + 1)] {
            if l < running.len() && r < next.len() && visited.insert((l, r)) {
                heap.push(PairEntry {
                    cost: cost_of(l, r),
                    left: l,
                    right: r,
                });
            }
        }
    }
    merged
}
