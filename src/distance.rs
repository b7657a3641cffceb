//! Set-overlap distances.
//!
//! Everything in carta measures similarity as Jaccard overlap. This module
//! holds the exact definition (used as ground truth for binary vectors) and
//! the signature-based estimates the forest ranks neighbors by, plus the
//! planar distance used to read layouts back.
//!
//! ## Important nuance
//!
//! Two empty sets have an undefined Jaccard coefficient. [`jaccard_similarity`]
//! treats them as identical (similarity 1), which matches what their
//! sentinel signatures estimate.

/// How two signatures are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum SignatureMetric {
    /// Plain MinHash: one value per hash function.
    #[default]
    MinHash,
    /// Weighted MinHash: one `(index, level)` pair per hash function.
    Weighted,
}

impl SignatureMetric {
    /// Estimated Jaccard distance between two signatures.
    ///
    /// If lengths mismatch, this returns `f32::INFINITY` (so it is never selected as a
    /// nearest neighbor).
    #[inline]
    #[must_use]
    pub fn distance(self, a: &[u32], b: &[u32]) -> f32 {
        match self {
            SignatureMetric::MinHash => signature_distance(a, b),
            SignatureMetric::Weighted => weighted_signature_distance(a, b),
        }
    }
}

/// Estimated Jaccard distance: `1 - (matching positions / length)`.
#[inline]
#[must_use]
pub fn signature_distance(a: &[u32], b: &[u32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return f32::INFINITY;
    }
    let matches = a.iter().zip(b).filter(|(x, y)| x == y).count();
    1.0 - matches as f32 / a.len() as f32
}

/// Estimated weighted Jaccard distance over `(index, level)` pairs.
///
/// A hash function counts as a match only when both halves of its pair agree.
#[inline]
#[must_use]
pub fn weighted_signature_distance(a: &[u32], b: &[u32]) -> f32 {
    if a.len() != b.len() || a.is_empty() || a.len() % 2 != 0 {
        return f32::INFINITY;
    }
    let pairs = a.len() / 2;
    let matches = a
        .chunks_exact(2)
        .zip(b.chunks_exact(2))
        .filter(|(x, y)| x == y)
        .count();
    1.0 - matches as f32 / pairs as f32
}

/// Exact Jaccard similarity of two binary vectors (nonzero = member).
#[must_use]
pub fn jaccard_similarity(a: &[u8], b: &[u8]) -> f32 {
    let mut intersection = 0usize;
    let mut union = 0usize;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x != 0, y != 0);
        if x && y {
            intersection += 1;
        }
        if x || y {
            union += 1;
        }
    }
    if union == 0 {
        return 1.0;
    }
    intersection as f32 / union as f32
}

/// Exact Jaccard distance, `1 - jaccard_similarity`.
#[inline]
#[must_use]
pub fn jaccard_distance(a: &[u8], b: &[u8]) -> f32 {
    1.0 - jaccard_similarity(a, b)
}

/// Euclidean distance between two layout points.
#[inline]
#[must_use]
pub fn planar_distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    (a.0 - b.0).hypot(a.1 - b.1)
}
