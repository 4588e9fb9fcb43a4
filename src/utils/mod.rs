//! Utility data structures.

pub mod heap;

pub use heap::{CandidateQueue, ResultSet, ScoredEntry};
