//! hnswlite - an in-memory HNSW approximate nearest neighbor index.
//!
//! Given a stream of `(id, vector)` insertions, the graph builds a
//! multi-layer proximity structure supporting sub-linear k-nearest
//! neighbor queries under a configurable similarity metric, trading
//! recall for latency through the beam-width parameters.
//!
//! # Metrics
//!
//! Both metrics score pairs of vectors with **higher meaning closer**:
//!
//! - **Cosine**: `dot(a, b) / (||a|| * ||b||)`. Do not insert
//!   zero-magnitude vectors under this metric.
//! - **Euclidean**: `1 / (1 + ||a - b||)`, bounded in (0, 1].
//!
//! # Parameters
//!
//! - `m`: maximum neighbors per node per layer (default 16)
//! - `ef_construction`: beam width while inserting (default 200)
//! - `ef_search`: default beam width while querying (default 50);
//!   queries always widen to at least `k`
//!
//! # Example
//!
//! ```rust
//! use hnswlite::prelude::*;
//!
//! let params = HnswParams::new(Metric::Euclidean)
//!     .with_m(16)
//!     .with_ef_construction(100)
//!     .with_seed(42);
//! let mut graph = HnswGraph::<f32>::new(params).unwrap();
//!
//! for i in 0..1000u64 {
//!     let v = [(i % 31) as f32, (i % 17) as f32, (i % 7) as f32];
//!     graph.add_point(i, &v).unwrap();
//! }
//!
//! let results = graph.search_knn(&[3.0, 4.0, 5.0], 10, None).unwrap();
//! assert_eq!(results.len(), 10);
//! assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
//! ```
//!
//! Graphs snapshot to a stable binary format (`save`/`load`) and the
//! [`store::IndexStore`] collaborator keeps one snapshot on disk.

pub mod graph;
pub mod query;
pub mod serialization;
pub mod similarity;
pub mod store;
pub mod types;
pub mod utils;


/// Prelude module for convenient imports.
///
/// Use `use hnswlite::prelude::*;` to import commonly used types.
pub mod prelude {
    pub use crate::graph::{
        GraphStats, HnswGraph, HnswParams, IndexError, QueryError, DEFAULT_EF_CONSTRUCTION,
        DEFAULT_EF_SEARCH, DEFAULT_M,
    };
    pub use crate::query::{Neighbor, QueryParams};
    pub use crate::serialization::{SnapshotError, SnapshotResult};
    pub use crate::similarity::{Metric, SimilarityFunction};
    pub use crate::store::{IndexStore, StoreError};
    pub use crate::types::{LabelType, Score, VectorElement};
}

use graph::{HnswGraph, HnswParams, IndexError};
use similarity::Metric;
use types::VectorElement;

/// Create a graph with default tuning for the given metric.
pub fn create_graph<T: VectorElement>(metric: Metric) -> Result<HnswGraph<T>, IndexError> {
    HnswGraph::new(HnswParams::new(metric))
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let mut graph =
            HnswGraph::<f32>::new(HnswParams::new(Metric::Euclidean).with_seed(0)).unwrap();
        graph.add_point(1, &[1.0, 0.0]).unwrap();
        graph.add_point(2, &[0.0, 1.0]).unwrap();

        let results = graph.search_knn(&[1.0, 0.1], 2, None).unwrap();
        assert_eq!(results[0].id, 1);
    }

    #[test]
    fn test_convenience_constructor() {
        let mut graph = super::create_graph::<f32>(Metric::Cosine).unwrap();
        assert_eq!(graph.m(), DEFAULT_M);
        assert_eq!(graph.ef_construction(), DEFAULT_EF_CONSTRUCTION);
        assert_eq!(graph.ef_search(), DEFAULT_EF_SEARCH);

        graph.add_point(1, &[1.0, 2.0]).unwrap();
        assert_eq!(graph.len(), 1);
    }
}
