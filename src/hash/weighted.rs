//! Weighted MinHash via improved consistent weighted sampling (ICWS).
//!
//! Generalizes MinHash to non-negative real-valued vectors: the probability
//! that two samples collide equals the weighted (generalized) Jaccard
//! similarity `Σ min(a_i, b_i) / Σ max(a_i, b_i)`.
//!
//! ## Algorithm
//!
//! For hash function `i` and every position `j` with weight `w_j > 0`, using
//! pre-drawn `r, c ~ Gamma(2, 1)` and `β ~ U(0, 1)`:
//!
//! ```text
//! t     = floor(ln(w_j) / r + β)
//! ln y  = r * (t - β)
//! ln a  = ln c - ln y - r
//! ```
//!
//! The sample is the `(j, t)` pair with the smallest `ln a`. A signature stores
//! `num_hashes` such pairs back to back, so its length is `2 * num_hashes`.
//!
//! ## References
//!
//! - Ioffe (2010). "Improved consistent sampling, weighted minhash and L1 sketching"

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma, StandardUniform};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::minhash::{Signature, MAX_HASH};
use crate::error::{CartaError, Result};

/// Weighted MinHash encoder for fixed-dimension real-valued vectors.
#[derive(Debug, Clone)]
pub struct WeightedMinHash {
    dimension: usize,
    num_hashes: usize,
    /// Row-major `num_hashes x dimension` samples of Gamma(2, 1).
    rs: Vec<f64>,
    /// Logarithms of a second Gamma(2, 1) sample set.
    ln_cs: Vec<f64>,
    /// Uniform offsets in [0, 1).
    betas: Vec<f64>,
}

impl WeightedMinHash {
    pub fn new(dimension: usize, num_hashes: usize, seed: u64) -> Result<Self> {
        if dimension == 0 || num_hashes == 0 {
            return Err(CartaError::InvalidParameter(
                "dimension and num_hashes must be greater than 0".to_string(),
            ));
        }

        let gamma = Gamma::<f64>::new(2.0, 1.0)
            .map_err(|e| CartaError::InvalidParameter(format!("gamma distribution: {e}")))?;
        let mut rng = StdRng::seed_from_u64(seed);
        let n = dimension * num_hashes;
        let mut rs = Vec::with_capacity(n);
        let mut ln_cs = Vec::with_capacity(n);
        let mut betas = Vec::with_capacity(n);
        for _ in 0..n {
            rs.push(gamma.sample(&mut rng));
            ln_cs.push(gamma.sample(&mut rng).ln());
            let beta: f64 = StandardUniform.sample(&mut rng);
            betas.push(beta);
        }

        Ok(Self {
            dimension,
            num_hashes,
            rs,
            ln_cs,
            betas,
        })
    }

    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Signature length produced by this encoder (two values per hash).
    pub fn signature_len(&self) -> usize {
        2 * self.num_hashes
    }

    /// Encode one weight vector. All-zero vectors yield the all-[`MAX_HASH`] sentinel.
    pub fn from_weights(&self, weights: &[f64]) -> Result<Signature> {
        if weights.len() != self.dimension {
            return Err(CartaError::InvalidInput(format!(
                "vector has {} positions, expected {}",
                weights.len(),
                self.dimension
            )));
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(CartaError::InvalidInput(format!(
                "weights must be finite and non-negative, got {w}"
            )));
        }

        let mut values = vec![MAX_HASH; self.signature_len()];
        for i in 0..self.num_hashes {
            let row = i * self.dimension;
            let mut best: Option<(f64, u32, i64)> = None;

            for (j, &w) in weights.iter().enumerate() {
                if w <= 0.0 {
                    continue;
                }
                let r = self.rs[row + j];
                let beta = self.betas[row + j];
                let t = (w.ln() / r + beta).floor();
                let ln_y = r * (t - beta);
                let ln_a = self.ln_cs[row + j] - ln_y - r;

                if best.is_none_or(|(min_a, _, _)| ln_a < min_a) {
                    best = Some((ln_a, j as u32, t as i64));
                }
            }

            if let Some((_, k, t)) = best {
                values[2 * i] = k;
                values[2 * i + 1] = t as i32 as u32;
            }
        }

        Ok(Signature::new(values))
    }

    pub fn batch_from_weights<V: AsRef<[f64]> + Sync>(
        &self,
        vectors: &[V],
    ) -> Result<Vec<Signature>> {
        #[cfg(feature = "parallel")]
        let iter = vectors.par_iter();
        #[cfg(not(feature = "parallel"))]
        let iter = vectors.iter();

        iter.map(|v| self.from_weights(v.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::weighted_signature_distance;

    fn weighted_jaccard(a: &[f64], b: &[f64]) -> f64 {
        let num: f64 = a.iter().zip(b).map(|(x, y)| x.min(*y)).sum();
        let den: f64 = a.iter().zip(b).map(|(x, y)| x.max(*y)).sum();
        num / den
    }

    #[test]
    fn sampled_parameters_in_range() {
        let wmh = WeightedMinHash::new(16, 64, 9).unwrap();
        assert_eq!(wmh.rs.len(), 16 * 64);
        assert!(wmh.rs.iter().all(|r| r.is_finite() && *r > 0.0));
        assert!(wmh.ln_cs.iter().all(|c| c.is_finite()));
        assert!(wmh.betas.iter().all(|b| (0.0..1.0).contains(b)));

        // Gamma(2, 1) has mean 2.
        let mean = wmh.rs.iter().sum::<f64>() / wmh.rs.len() as f64;
        assert!((mean - 2.0).abs() < 0.15, "mean {mean}");
    }

    #[test]
    fn deterministic_for_seed() {
        let wmh = WeightedMinHash::new(6, 32, 3).unwrap();
        let v = [0.5, 0.0, 2.0, 1.0, 0.0, 3.5];
        assert_eq!(wmh.from_weights(&v).unwrap(), wmh.from_weights(&v).unwrap());
        assert_eq!(wmh.from_weights(&v).unwrap().len(), 64);
    }

    #[test]
    fn identical_weights_distance_zero() {
        let wmh = WeightedMinHash::new(4, 64, 1).unwrap();
        let a = wmh.from_weights(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = wmh.from_weights(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(weighted_signature_distance(&a.values, &b.values), 0.0);
    }

    #[test]
    fn estimate_tracks_weighted_jaccard() {
        let wmh = WeightedMinHash::new(8, 1024, 42).unwrap();
        let a = [1.0, 2.0, 0.0, 4.0, 1.0, 0.0, 3.0, 0.5];
        let b = [1.0, 1.0, 2.0, 4.0, 0.0, 0.0, 3.0, 1.5];

        let sa = wmh.from_weights(&a).unwrap();
        let sb = wmh.from_weights(&b).unwrap();
        let estimate = 1.0 - weighted_signature_distance(&sa.values, &sb.values) as f64;
        let truth = weighted_jaccard(&a, &b);
        assert!((estimate - truth).abs() < 0.06, "{estimate} vs {truth}");
    }

    #[test]
    fn zero_vector_is_sentinel() {
        let wmh = WeightedMinHash::new(3, 8, 0).unwrap();
        assert!(wmh.from_weights(&[0.0; 3]).unwrap().is_sentinel());
    }

    #[test]
    fn rejects_negative_and_mismatched() {
        let wmh = WeightedMinHash::new(3, 8, 0).unwrap();
        assert!(matches!(
            wmh.from_weights(&[1.0, -1.0, 0.0]),
            Err(CartaError::InvalidInput(_))
        ));
        assert!(matches!(
            wmh.from_weights(&[1.0, 1.0]),
            Err(CartaError::InvalidInput(_))
        ));
    }
}
