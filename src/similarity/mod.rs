//! Similarity metric implementations.
//!
//! Both metrics return a score where **higher means closer**:
//! - Cosine: `dot(a, b) / (||a|| * ||b||)`, in [-1, 1]
//! - Euclidean: `1 / (1 + ||a - b||)`, in (0, 1]
//!
//! The metric is fixed when the graph is constructed and must be
//! order-preserving in the underlying distance for the traversal
//! arguments to hold.

pub mod cosine;
pub mod euclidean;

use crate::graph::IndexError;
use crate::types::{Score, VectorElement};
use std::str::FromStr;

/// Similarity metric types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Cosine similarity. Undefined (NaN) for zero-magnitude vectors;
    /// callers must not insert zero vectors under this metric.
    Cosine,
    /// Euclidean distance mapped to a similarity via `1 / (1 + d)`.
    Euclidean,
}

impl Metric {
    /// Get a human-readable name for the metric.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Metric {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cosine" => Ok(Metric::Cosine),
            "euclidean" => Ok(Metric::Euclidean),
            other => Err(IndexError::InvalidMetric(other.to_string())),
        }
    }
}

/// Trait for similarity scoring functions.
///
/// Implementations are pure: the score of two vectors depends only on
/// their contents. Both inputs must have the graph's dimension.
pub trait SimilarityFunction<T: VectorElement>: Send + Sync {
    /// Compute the similarity score between two vectors. Higher = closer.
    fn score(&self, a: &[T], b: &[T]) -> Score;

    /// Get the metric type.
    fn metric(&self) -> Metric;
}

/// Create a similarity function for the given metric.
///
/// Selected once at graph construction; scoring calls dispatch through
/// the returned trait object without re-branching on the metric.
pub fn create_similarity<T: VectorElement>(
    metric: Metric,
) -> Box<dyn SimilarityFunction<T>> {
    match metric {
        Metric::Cosine => Box::new(cosine::CosineSimilarity::new()),
        Metric::Euclidean => Box::new(euclidean::EuclideanSimilarity::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_parse() {
        assert_eq!("cosine".parse::<Metric>().unwrap(), Metric::Cosine);
        assert_eq!("euclidean".parse::<Metric>().unwrap(), Metric::Euclidean);
        assert!(matches!(
            "manhattan".parse::<Metric>(),
            Err(IndexError::InvalidMetric(_))
        ));
    }

    #[test]
    fn test_create_similarity() {
        let cos: Box<dyn SimilarityFunction<f32>> = create_similarity(Metric::Cosine);
        assert_eq!(cos.metric(), Metric::Cosine);

        let euc: Box<dyn SimilarityFunction<f32>> = create_similarity(Metric::Euclidean);
        assert_eq!(euc.metric(), Metric::Euclidean);
    }

    #[test]
    fn test_metric_display() {
        assert_eq!(Metric::Cosine.to_string(), "cosine");
        assert_eq!(Metric::Euclidean.to_string(), "euclidean");
    }
}
