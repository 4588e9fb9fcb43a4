//! Traversal algorithms for the layered graph.
//!
//! Three building blocks, all free functions over the node map:
//! - `greedy_descent`: single-path walk used on upper layers
//! - `search_layer`: beam search over one layer
//! - `select_neighbors`: the diversity-preferring selection heuristic

use super::node::Node;
use crate::similarity::SimilarityFunction;
use crate::types::{LabelType, Score, VectorElement};
use crate::utils::{CandidateQueue, ResultSet, ScoredEntry};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Greedily walk a layer towards the query.
///
/// Repeatedly moves to the best-scoring neighbor as long as that strictly
/// improves on the current node, ending in a local maximum. Used to cross
/// the sparse upper layers where only a good entry point is needed.
pub fn greedy_descent<T: VectorElement>(
    nodes: &HashMap<LabelType, Node<T>>,
    sim: &dyn SimilarityFunction<T>,
    query: &[T],
    entry: LabelType,
    layer: usize,
) -> ScoredEntry {
    let mut current = entry;
    let mut current_score = match nodes.get(&entry) {
        Some(node) => sim.score(query, &node.vector),
        None => Score::NEG_INFINITY,
    };

    loop {
        let mut next: Option<ScoredEntry> = None;

        if let Some(node) = nodes.get(&current) {
            for &neighbor in node.neighbors(layer) {
                if let Some(neighbor_node) = nodes.get(&neighbor) {
                    let score = sim.score(query, &neighbor_node.vector);
                    let best_so_far = next.map(|e| e.score).unwrap_or(current_score);
                    if score > best_so_far {
                        next = Some(ScoredEntry::new(neighbor, score));
                    }
                }
            }
        }

        match next {
            Some(entry) => {
                current = entry.id;
                current_score = entry.score;
            }
            None => break,
        }
    }

    ScoredEntry::new(current, current_score)
}

/// Beam search over one layer.
///
/// Explores from `entry`, keeping the `ef` best-scoring nodes seen.
/// Terminates once the best unexpanded candidate cannot beat the worst
/// kept result. Returns up to `ef` entries sorted by descending score.
pub fn search_layer<T: VectorElement>(
    nodes: &HashMap<LabelType, Node<T>>,
    sim: &dyn SimilarityFunction<T>,
    query: &[T],
    entry: ScoredEntry,
    layer: usize,
    ef: usize,
) -> Vec<ScoredEntry> {
    let mut visited: HashSet<LabelType> = HashSet::new();
    visited.insert(entry.id);

    let mut candidates = CandidateQueue::with_capacity(ef * 2);
    candidates.push(entry.id, entry.score);

    let mut best = ResultSet::new(ef);
    best.insert(entry.id, entry.score);

    while let Some(candidate) = candidates.pop() {
        if best.is_full() {
            if let Some(worst) = best.worst_score() {
                if candidate.score < worst {
                    break;
                }
            }
        }

        let Some(node) = nodes.get(&candidate.id) else {
            continue;
        };

        for &neighbor in node.neighbors(layer) {
            if !visited.insert(neighbor) {
                continue;
            }
            let Some(neighbor_node) = nodes.get(&neighbor) else {
                continue;
            };
            let score = sim.score(query, &neighbor_node.vector);
            let admissible = !best.is_full()
                || best.worst_score().map(|w| score > w).unwrap_or(true);
            if admissible {
                candidates.push(neighbor, score);
                best.insert(neighbor, score);
            }
        }
    }

    best.into_sorted_desc()
}

/// Select up to `m` diverse neighbors from scored candidates.
///
/// Candidates carry their score against the pivot and are processed from
/// best to worst (stable on ties). A candidate is admitted only if every
/// already-selected neighbor is no closer to it than the pivot is; a
/// candidate that sits in the shadow of an earlier pick is rejected and
/// stays rejected. The returned ids are in admission order, which is
/// descending pivot-score order.
pub fn select_neighbors<T: VectorElement>(
    nodes: &HashMap<LabelType, Node<T>>,
    sim: &dyn SimilarityFunction<T>,
    candidates: &[ScoredEntry],
    m: usize,
) -> Vec<LabelType> {
    let mut working: Vec<ScoredEntry> = candidates.to_vec();
    working.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut selected: Vec<LabelType> = Vec::with_capacity(m.min(working.len()));

    for candidate in working {
        if selected.len() >= m {
            break;
        }
        let Some(candidate_node) = nodes.get(&candidate.id) else {
            continue;
        };

        let covered = selected.iter().any(|selected_id| {
            nodes
                .get(selected_id)
                .map(|s| sim.score(&candidate_node.vector, &s.vector) > candidate.score)
                .unwrap_or(false)
        });

        if !covered {
            selected.push(candidate.id);
        }
    }

    selected
}
