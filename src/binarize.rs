//! Threshold policies for turning weighted vectors into binary ones.
//!
//! MinHash works on sets, so graded data (pixel intensities, counts) must be
//! reduced to "active / inactive" first. Which entries count as active is a
//! property of the data, not of the encoder, so the rule is a value the
//! caller picks.
//!
//! | Policy | Active iff |
//! |--------|------------|
//! | `NonZero` | `v != 0` |
//! | `AtLeast(t)` | `v >= t` |
//! | `MeanOfNonZero` | `v >= mean of the nonzero entries of this vector` |
//! | `Custom(f)` | `v >= f(vector)` |
//!
//! `MeanOfNonZero` is the usual choice for grayscale digit images: it keeps
//! the stroke and drops anti-aliasing fringe regardless of overall brightness.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Rule deciding which entries of a weighted vector are active.
#[derive(Debug, Clone, Copy, Default)]
pub enum BinarizePolicy {
    /// Any nonzero entry is active.
    #[default]
    NonZero,
    /// Entries at or above a fixed threshold are active.
    AtLeast(f64),
    /// Entries at or above the mean of the vector's nonzero entries are active.
    MeanOfNonZero,
    /// Entries at or above a per-vector threshold computed by the function.
    Custom(fn(&[f64]) -> f64),
}

impl BinarizePolicy {
    /// Threshold this policy applies to `vector`, or `None` for `NonZero`.
    pub fn threshold(&self, vector: &[f64]) -> Option<f64> {
        match self {
            BinarizePolicy::NonZero => None,
            BinarizePolicy::AtLeast(t) => Some(*t),
            BinarizePolicy::MeanOfNonZero => {
                let (sum, count) = vector
                    .iter()
                    .filter(|v| **v != 0.0)
                    .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                // All-zero vectors stay empty.
                if count == 0 {
                    Some(f64::INFINITY)
                } else {
                    Some(sum / count as f64)
                }
            }
            BinarizePolicy::Custom(f) => Some(f(vector)),
        }
    }

    /// Binarize one vector into 0/1 entries.
    pub fn binarize(&self, vector: &[f64]) -> Vec<u8> {
        match self.threshold(vector) {
            None => vector.iter().map(|&v| u8::from(v != 0.0)).collect(),
            Some(t) => vector.iter().map(|&v| u8::from(v >= t)).collect(),
        }
    }

    /// Binarize every vector; output order matches input order.
    pub fn binarize_all<V: AsRef<[f64]> + Sync>(&self, vectors: &[V]) -> Vec<Vec<u8>> {
        #[cfg(feature = "parallel")]
        let iter = vectors.par_iter();
        #[cfg(not(feature = "parallel"))]
        let iter = vectors.iter();

        iter.map(|v| self.binarize(v.as_ref())).collect()
    }
}
