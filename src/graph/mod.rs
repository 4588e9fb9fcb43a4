//! The layered proximity graph.
//!
//! `HnswGraph` owns the node arena, the entry point, and the level
//! sampler, and implements the full insertion and query procedures:
//! greedy descent through the upper layers, per-layer beam search,
//! diversity-preferring neighbor selection, and bidirectional linking
//! with prune-and-repair.
//!
//! Key parameters:
//! - `m`: maximum neighbors per node per layer
//! - `ef_construction`: beam width while inserting
//! - `ef_search`: default beam width while querying

pub mod level;
pub mod node;
pub mod search;

pub use level::LevelSampler;
pub use node::Node;

use crate::query::{Neighbor, QueryParams};
use crate::similarity::{create_similarity, Metric, SimilarityFunction};
use crate::types::{LabelType, Score, VectorElement};
use crate::utils::ScoredEntry;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Default maximum neighbors per node per layer.
pub const DEFAULT_M: usize = 16;

/// Default beam width during insertion.
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Default beam width during queries.
pub const DEFAULT_EF_SEARCH: usize = 50;

/// Errors surfaced by graph construction and insertion.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("unknown metric: {0:?}")]
    InvalidMetric(String),

    #[error("vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("id {0} already present in the graph")]
    DuplicateId(LabelType),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("graph corruption detected: {0}")]
    Corruption(String),
}

/// Errors surfaced by queries.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("query dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Parameters for creating a graph.
#[derive(Debug, Clone)]
pub struct HnswParams {
    /// Maximum number of neighbors per node per layer.
    pub m: usize,
    /// Beam width during insertion.
    pub ef_construction: usize,
    /// Default beam width during queries.
    pub ef_search: usize,
    /// Similarity metric.
    pub metric: Metric,
    /// Vector dimension. `None` fixes it at the first insert.
    pub dim: Option<usize>,
    /// Random seed for reproducible level assignment (`None` = entropy).
    pub seed: Option<u64>,
}

impl HnswParams {
    /// Create parameters with the given metric and default tuning.
    pub fn new(metric: Metric) -> Self {
        Self {
            m: DEFAULT_M,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef_search: DEFAULT_EF_SEARCH,
            metric,
            dim: None,
            seed: None,
        }
    }

    /// Set the per-layer neighbor cap.
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    /// Set the construction beam width.
    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    /// Set the default query beam width.
    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }

    /// Fix the vector dimension up front.
    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = Some(dim);
        self
    }

    /// Set the level-sampler seed for reproducible builds.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the parameters for validity.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.m == 0 {
            return Err(IndexError::InvalidParameter("m must be positive".into()));
        }
        if self.ef_construction == 0 {
            return Err(IndexError::InvalidParameter(
                "ef_construction must be positive".into(),
            ));
        }
        if self.dim == Some(0) {
            return Err(IndexError::InvalidParameter("dim must be positive".into()));
        }
        Ok(())
    }
}

impl Default for HnswParams {
    fn default() -> Self {
        Self::new(Metric::Cosine)
    }
}

/// Statistics about a graph.
#[derive(Debug, Clone)]
pub struct GraphStats {
    /// Number of points in the graph.
    pub size: usize,
    /// Top layer currently present (`None` when empty).
    pub level_max: Option<usize>,
    /// Number of nodes present on each layer.
    pub level_counts: Vec<usize>,
    /// Total number of directed edges across all layers.
    pub total_edges: usize,
    /// Average edges per node.
    pub avg_degree: f64,
}

/// The in-memory HNSW index.
///
/// Points are inserted once and never removed or mutated; adjacency
/// changes only through the insertion procedure. All mutation requires
/// `&mut self`, so a graph has exactly one logical writer and queries
/// observe the state as of the last completed insertion.
pub struct HnswGraph<T: VectorElement> {
    params: HnswParams,
    nodes: HashMap<LabelType, Node<T>>,
    entry_point: Option<LabelType>,
    dim: Option<usize>,
    sim: Box<dyn SimilarityFunction<T>>,
    sampler: LevelSampler,
}

impl<T: VectorElement> HnswGraph<T> {
    /// Create an empty graph.
    pub fn new(params: HnswParams) -> Result<Self, IndexError> {
        params.validate()?;
        let sim = create_similarity(params.metric);
        let sampler = LevelSampler::new(params.m, params.seed);
        Ok(Self {
            dim: params.dim,
            entry_point: None,
            nodes: HashMap::new(),
            sim,
            sampler,
            params,
        })
    }

    /// Number of points in the graph.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The per-layer neighbor cap.
    #[inline]
    pub fn m(&self) -> usize {
        self.params.m
    }

    #[inline]
    pub fn ef_construction(&self) -> usize {
        self.params.ef_construction
    }

    /// Default query beam width.
    #[inline]
    pub fn ef_search(&self) -> usize {
        self.params.ef_search
    }

    /// Change the default query beam width.
    pub fn set_ef_search(&mut self, ef: usize) {
        self.params.ef_search = ef;
    }

    #[inline]
    pub fn metric(&self) -> Metric {
        self.params.metric
    }

    /// The fixed vector dimension, once known.
    #[inline]
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    /// Id of the current top-layer entry node.
    #[inline]
    pub fn entry_point(&self) -> Option<LabelType> {
        self.entry_point
    }

    /// Top layer currently present (`None` when empty).
    pub fn level_max(&self) -> Option<usize> {
        self.entry_point.map(|id| self.nodes[&id].level)
    }

    pub fn contains(&self, id: LabelType) -> bool {
        self.nodes.contains_key(&id)
    }

    /// The stored vector for an id, if present.
    pub fn get_vector(&self, id: LabelType) -> Option<&[T]> {
        self.nodes.get(&id).map(|n| n.vector.as_slice())
    }

    /// The level assigned to an id, if present.
    pub fn get_level(&self, id: LabelType) -> Option<usize> {
        self.nodes.get(&id).map(|n| n.level)
    }

    /// Neighbor ids of a point at a layer (empty if absent).
    pub fn get_neighbors(&self, id: LabelType, layer: usize) -> &[LabelType] {
        self.nodes.get(&id).map(|n| n.neighbors(layer)).unwrap_or(&[])
    }

    /// Insert a point, drawing its level from the sampler.
    ///
    /// Under the cosine metric, zero-magnitude vectors score NaN against
    /// everything and must not be inserted.
    pub fn add_point(&mut self, id: LabelType, vector: &[T]) -> Result<(), IndexError> {
        let level = self.sampler.sample();
        self.add_point_with_level(id, vector, level)
    }

    /// Insert a point at an explicit level.
    ///
    /// This is the determinism seam: replaying a recorded level sequence
    /// reproduces a graph exactly. `add_point` delegates here.
    pub fn add_point_with_level(
        &mut self,
        id: LabelType,
        vector: &[T],
        level: usize,
    ) -> Result<(), IndexError> {
        if self.nodes.contains_key(&id) {
            return Err(IndexError::DuplicateId(id));
        }
        match self.dim {
            Some(expected) if expected != vector.len() => {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    got: vector.len(),
                });
            }
            Some(_) => {}
            None => self.dim = Some(vector.len()),
        }

        self.nodes.insert(id, Node::new(id, level, vector.to_vec()));

        let Some(entry_id) = self.entry_point else {
            // First point: it becomes the entry with no edges.
            self.entry_point = Some(id);
            return Ok(());
        };

        let level_max = self.nodes[&entry_id].level;
        let mut ep = ScoredEntry::new(entry_id, self.score_against(entry_id, vector));

        // Cross the layers above the new node's top with greedy walks.
        for layer in (level + 1..=level_max).rev() {
            ep = search::greedy_descent(&self.nodes, self.sim.as_ref(), vector, ep.id, layer);
        }

        // Beam-search and link on every layer the new node lives on.
        for layer in (0..=level.min(level_max)).rev() {
            let found = search::search_layer(
                &self.nodes,
                self.sim.as_ref(),
                vector,
                ep,
                layer,
                self.params.ef_construction,
            );
            let candidates: Vec<ScoredEntry> =
                found.iter().copied().filter(|e| e.id != id).collect();
            let selected = search::select_neighbors(
                &self.nodes,
                self.sim.as_ref(),
                &candidates,
                self.params.m,
            );
            for &neighbor in &selected {
                self.link(id, neighbor, layer);
            }
            if let Some(&best) = candidates.first() {
                ep = best;
            }
        }

        if level > level_max {
            self.entry_point = Some(id);
        }
        Ok(())
    }

    /// Search for the `k` nearest neighbors of `query`.
    ///
    /// Results come back sorted by descending score, at most `k` of
    /// them. An empty graph or `k == 0` yields an empty result.
    pub fn search_knn(
        &self,
        query: &[T],
        k: usize,
        params: Option<&QueryParams>,
    ) -> Result<Vec<Neighbor>, QueryError> {
        if let Some(expected) = self.dim {
            if query.len() != expected {
                return Err(QueryError::DimensionMismatch {
                    expected,
                    got: query.len(),
                });
            }
        }
        let Some(entry_id) = self.entry_point else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        if self.nodes.len() == 1 {
            return Ok(vec![Neighbor::new(
                entry_id,
                self.score_against(entry_id, query),
            )]);
        }

        let level_max = self.nodes[&entry_id].level;
        let mut ep = ScoredEntry::new(entry_id, self.score_against(entry_id, query));
        for layer in (1..=level_max).rev() {
            ep = search::greedy_descent(&self.nodes, self.sim.as_ref(), query, ep.id, layer);
        }

        let ef = params
            .and_then(|p| p.ef_search)
            .unwrap_or(self.params.ef_search)
            .max(k);
        let found = search::search_layer(&self.nodes, self.sim.as_ref(), query, ep, 0, ef);

        // Duplicates are not expected out of the beam, but guard anyway.
        let mut seen = HashSet::with_capacity(found.len());
        let mut results = Vec::with_capacity(k.min(found.len()));
        for entry in found {
            if seen.insert(entry.id) {
                results.push(Neighbor::new(entry.id, entry.score));
                if results.len() == k {
                    break;
                }
            }
        }
        Ok(results)
    }

    /// Clear all points and rebuild from `data`, inserting in order.
    ///
    /// The dimension resets along with the nodes, so a rebuild may change
    /// dimensionality; callers that pre-configured `dim` must set it
    /// again afterwards.
    pub fn build_index(&mut self, data: &[(LabelType, Vec<T>)]) -> Result<(), IndexError> {
        self.build_index_with_progress(data, 0, |_, _| {})
    }

    /// Bulk build with a progress hook.
    ///
    /// Invokes `on_progress(done, total)` after every `progress_every`
    /// insertions (when positive) and once at completion. The hook runs
    /// between insertions only; each insertion is atomic with respect to
    /// the graph invariants.
    pub fn build_index_with_progress<F>(
        &mut self,
        data: &[(LabelType, Vec<T>)],
        progress_every: usize,
        mut on_progress: F,
    ) -> Result<(), IndexError>
    where
        F: FnMut(usize, usize),
    {
        self.clear();
        let total = data.len();
        for (i, (id, vector)) in data.iter().enumerate() {
            self.add_point(*id, vector)?;
            let done = i + 1;
            if progress_every > 0 && done % progress_every == 0 && done < total {
                on_progress(done, total);
            }
        }
        on_progress(total, total);
        Ok(())
    }

    /// Remove every point and unset the dimension.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.entry_point = None;
        self.dim = None;
    }

    /// Gather structural statistics.
    pub fn stats(&self) -> GraphStats {
        let level_max = self.level_max();
        let mut level_counts = vec![0usize; level_max.map(|l| l + 1).unwrap_or(0)];
        let mut total_edges = 0usize;

        for node in self.nodes.values() {
            for layer in 0..node.layer_count() {
                if layer < level_counts.len() {
                    level_counts[layer] += 1;
                }
                total_edges += node.neighbors(layer).len();
            }
        }

        let avg_degree = if self.nodes.is_empty() {
            0.0
        } else {
            total_edges as f64 / self.nodes.len() as f64
        };

        GraphStats {
            size: self.nodes.len(),
            level_max,
            level_counts,
            total_edges,
            avg_degree,
        }
    }

    /// Check the structural invariants, returning the first violation.
    ///
    /// Verifies that the entry point tops the hierarchy, that every
    /// adjacency list respects the cap, holds no self-loops or
    /// duplicates, references only present nodes, and is mirrored by the
    /// neighbor's own list.
    pub fn validate(&self) -> Result<(), IndexError> {
        if let Some(entry_id) = self.entry_point {
            let Some(entry) = self.nodes.get(&entry_id) else {
                return Err(IndexError::Corruption(format!(
                    "entry point {entry_id} is not in the node map"
                )));
            };
            if let Some(above) = self
                .nodes
                .values()
                .find(|n| n.level > entry.level)
            {
                return Err(IndexError::Corruption(format!(
                    "node {} has level {} above the entry point's {}",
                    above.id, above.level, entry.level
                )));
            }
        } else if !self.nodes.is_empty() {
            return Err(IndexError::Corruption(
                "non-empty graph without an entry point".into(),
            ));
        }

        for node in self.nodes.values() {
            if let Some(expected) = self.dim {
                if node.vector.len() != expected {
                    return Err(IndexError::Corruption(format!(
                        "node {} has dimension {}, expected {expected}",
                        node.id,
                        node.vector.len()
                    )));
                }
            }
            for layer in 0..node.layer_count() {
                let neighbors = node.neighbors(layer);
                if neighbors.len() > self.params.m {
                    return Err(IndexError::Corruption(format!(
                        "node {} exceeds the neighbor cap on layer {layer}",
                        node.id
                    )));
                }
                let mut seen = HashSet::with_capacity(neighbors.len());
                for &neighbor in neighbors {
                    if neighbor == node.id {
                        return Err(IndexError::Corruption(format!(
                            "node {} links to itself on layer {layer}",
                            node.id
                        )));
                    }
                    if !seen.insert(neighbor) {
                        return Err(IndexError::Corruption(format!(
                            "node {} lists {neighbor} twice on layer {layer}",
                            node.id
                        )));
                    }
                    let Some(other) = self.nodes.get(&neighbor) else {
                        return Err(IndexError::Corruption(format!(
                            "node {} references missing node {neighbor}",
                            node.id
                        )));
                    };
                    if !other.contains_neighbor(layer, node.id) {
                        return Err(IndexError::Corruption(format!(
                            "edge {} -> {neighbor} on layer {layer} is not reciprocated",
                            node.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Iterate over all nodes (snapshot support).
    pub(crate) fn nodes(&self) -> impl Iterator<Item = &Node<T>> {
        self.nodes.values()
    }

    pub(crate) fn params(&self) -> &HnswParams {
        &self.params
    }

    /// Rebuild a graph from restored parts, trusting the stored adjacency.
    pub(crate) fn from_parts(
        params: HnswParams,
        dim: Option<usize>,
        entry_point: Option<LabelType>,
        nodes: HashMap<LabelType, Node<T>>,
    ) -> Result<Self, IndexError> {
        params.validate()?;
        let sim = create_similarity(params.metric);
        let sampler = LevelSampler::new(params.m, params.seed);
        Ok(Self {
            params,
            nodes,
            entry_point,
            dim,
            sim,
            sampler,
        })
    }

    #[inline]
    fn score_against(&self, id: LabelType, query: &[T]) -> Score {
        match self.nodes.get(&id) {
            Some(node) => self.sim.score(&node.vector, query),
            None => Score::NEG_INFINITY,
        }
    }

    /// Install a bidirectional edge between `a` and `b` at `layer`.
    ///
    /// Either side may overflow the cap; the overflowing side is
    /// re-selected with the heuristic and every dropped edge has its
    /// reciprocal removed, restoring symmetry. This is the only code
    /// path that removes an edge.
    fn link(&mut self, a: LabelType, b: LabelType, layer: usize) {
        if a == b {
            return;
        }
        let dropped_from_a = self.attach(a, b, layer);
        let dropped_from_b = self.attach(b, a, layer);

        for dropped in dropped_from_a {
            if let Some(node) = self.nodes.get_mut(&dropped) {
                node.remove_neighbor(layer, a);
            }
        }
        for dropped in dropped_from_b {
            if let Some(node) = self.nodes.get_mut(&dropped) {
                node.remove_neighbor(layer, b);
            }
        }
    }

    /// Put `incoming` into `owner`'s layer list, keeping it sorted by
    /// descending score against the owner. On overflow the heuristic
    /// reselects over the combined set; ids it rejects are returned so
    /// the caller can repair the reverse edges.
    fn attach(&mut self, owner: LabelType, incoming: LabelType, layer: usize) -> Vec<LabelType> {
        let Some(owner_node) = self.nodes.get(&owner) else {
            return Vec::new();
        };
        if layer >= owner_node.layer_count() {
            return Vec::new();
        }

        let owner_vector = owner_node.vector.clone();
        let mut ids: Vec<LabelType> = owner_node
            .neighbors(layer)
            .iter()
            .copied()
            .filter(|&n| n != incoming)
            .collect();
        ids.push(incoming);

        let mut scored: Vec<ScoredEntry> = ids
            .iter()
            .filter_map(|&nid| {
                self.nodes
                    .get(&nid)
                    .map(|n| ScoredEntry::new(nid, self.sim.score(&owner_vector, &n.vector)))
            })
            .collect();

        let new_list: Vec<LabelType> = if scored.len() > self.params.m {
            search::select_neighbors(&self.nodes, self.sim.as_ref(), &scored, self.params.m)
        } else {
            scored.sort_by(|x, y| y.score.partial_cmp(&x.score).unwrap_or(Ordering::Equal));
            scored.into_iter().map(|e| e.id).collect()
        };

        let dropped: Vec<LabelType> = ids
            .into_iter()
            .filter(|nid| !new_list.contains(nid))
            .collect();

        if let Some(node) = self.nodes.get_mut(&owner) {
            node.set_neighbors(layer, new_list);
        }
        dropped
    }
}

impl<T: VectorElement> std::fmt::Debug for HnswGraph<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswGraph")
            .field("params", &self.params)
            .field("size", &self.nodes.len())
            .field("dim", &self.dim)
            .field("entry_point", &self.entry_point)
            .finish()
    }
}
