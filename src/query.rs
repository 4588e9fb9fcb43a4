//! Query parameter and result types.

use crate::types::{LabelType, Score};

/// Optional per-query parameters.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    /// Beam width for this query, overriding the graph default. The
    /// effective width is never below `k`.
    pub ef_search: Option<usize>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the query beam width.
    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = Some(ef);
        self
    }
}

/// A single query result: a point id and its score against the query.
///
/// Results are returned sorted by descending score (higher = closer).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: LabelType,
    pub score: Score,
}

impl Neighbor {
    #[inline]
    pub fn new(id: LabelType, score: Score) -> Self {
        Self { id, score }
    }
}
