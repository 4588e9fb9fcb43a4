//! Random level assignment for new points.
//!
//! Levels follow the exponential decay distribution from the HNSW paper:
//! with `mL = 1/ln(M)`, the probability of a node topping out at layer
//! `l` is `exp(-l/mL) * (1 - exp(-1/mL))`. The table is precomputed once
//! per graph and truncated where probabilities drop below `1e-9`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Probabilities below this are truncated from the table.
const PROB_FLOOR: f64 = 1e-9;

/// Draws the top layer for each inserted point.
#[derive(Debug)]
pub struct LevelSampler {
    probs: Vec<f64>,
    rng: StdRng,
}

impl LevelSampler {
    /// Build the sampler for a graph with neighbor cap `m`.
    ///
    /// `seed` makes the draw sequence reproducible; `None` seeds from
    /// entropy.
    pub fn new(m: usize, seed: Option<u64>) -> Self {
        Self::with_probs(build_probs(m), seed)
    }

    /// Build the sampler over an explicit probability table.
    ///
    /// This is the substitution seam for deterministic tests and replay:
    /// the table is used as-is.
    pub fn with_probs(probs: Vec<f64>, seed: Option<u64>) -> Self {
        debug_assert!(!probs.is_empty());
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { probs, rng }
    }

    /// The precomputed level distribution.
    #[inline]
    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    /// Draw a level using the owned RNG.
    pub fn sample(&mut self) -> usize {
        let r: f64 = self.rng.gen();
        self.select_level(r)
    }

    /// Map a uniform draw `r ∈ [0, 1)` to a level.
    ///
    /// Walks the table consuming probability mass; the draw lands on the
    /// first level whose remaining mass covers it, falling back to the
    /// deepest tabulated level.
    pub fn select_level(&self, mut r: f64) -> usize {
        for (level, &p) in self.probs.iter().enumerate() {
            if r < p {
                return level;
            }
            r -= p;
        }
        self.probs.len() - 1
    }
}

fn build_probs(m: usize) -> Vec<f64> {
    let ml = 1.0 / (m as f64).ln();
    let mut probs = Vec::new();
    let mut level = 0usize;
    loop {
        let p = (-(level as f64) / ml).exp() * (1.0 - (-1.0 / ml).exp());
        if p < PROB_FLOOR {
            break;
        }
        probs.push(p);
        level += 1;
    }
    // m == 1 degenerates to a flat single-layer graph.
    if probs.is_empty() {
        probs.push(1.0);
    }
    probs
}
