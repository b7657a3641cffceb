//! MinHash signatures for Jaccard similarity estimation.
//!
//! MinHash turns a set into a fixed-length signature whose positions match
//! with probability equal to the Jaccard coefficient J(A,B) = |A ∩ B| / |A ∪ B|.
//!
//! ## Algorithm
//!
//! For each hash function h_i:
//! - MinHash_i(S) = min_{x ∈ S} h_i(x)
//!
//! The probability that MinHash values match equals Jaccard similarity:
//! P[MinHash_i(A) = MinHash_i(B)] = J(A,B)
//!
//! The hash functions are universal permutations over the Mersenne prime
//! 2^61 - 1, truncated to 32 bits:
//!
//! ```text
//! h_i(x) = ((a_i * x + b_i) mod (2^61 - 1)) & (2^32 - 1)
//! ```
//!
//! For binary feature vectors the set elements are the *positions* of the
//! active entries, so two images that light up the same pixels produce the
//! same signature.
//!
//! ## References
//!
//! - Broder (1997). "On the resemblance and containment of documents"
//! - Broder et al. (2000). "Min-wise independent permutations"

use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CartaError, Result};

/// Mersenne prime used as the modulus of the permutation family.
pub(crate) const MERSENNE_PRIME: u64 = (1 << 61) - 1;

/// Largest value a permutation can produce; also the empty-set sentinel.
pub const MAX_HASH: u32 = u32::MAX;

/// Encoder parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinHashParams {
    /// Number of hash functions (signature length).
    pub num_hashes: usize,
    /// Seed for drawing the permutation coefficients.
    pub seed: u64,
}

impl Default for MinHashParams {
    fn default() -> Self {
        Self {
            num_hashes: 128,
            seed: 42,
        }
    }
}

impl MinHashParams {
    pub fn validate(&self) -> Result<()> {
        if self.num_hashes == 0 {
            return Err(CartaError::InvalidParameter(
                "num_hashes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// MinHash signature generator for binary feature vectors of a fixed dimension.
#[derive(Debug, Clone)]
pub struct MinHash {
    /// Dimensionality D of the feature vectors this encoder accepts.
    dimension: usize,
    /// Multipliers `a_i` of the permutation family.
    a: Vec<u64>,
    /// Offsets `b_i` of the permutation family.
    b: Vec<u64>,
}

impl MinHash {
    /// Create a new MinHash with the default seed.
    ///
    /// More hashes = more accurate Jaccard estimate, but larger signatures.
    pub fn new(dimension: usize, num_hashes: usize) -> Result<Self> {
        Self::with_seed(dimension, num_hashes, MinHashParams::default().seed)
    }

    /// Create MinHash with specific seed for reproducibility.
    pub fn with_seed(dimension: usize, num_hashes: usize, seed: u64) -> Result<Self> {
        Self::from_params(dimension, &MinHashParams { num_hashes, seed })
    }

    pub fn from_params(dimension: usize, params: &MinHashParams) -> Result<Self> {
        params.validate()?;
        if dimension == 0 {
            return Err(CartaError::InvalidParameter(
                "dimension must be greater than 0".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut a = Vec::with_capacity(params.num_hashes);
        let mut b = Vec::with_capacity(params.num_hashes);
        for _ in 0..params.num_hashes {
            a.push(rng.random_range(1..MERSENNE_PRIME));
            b.push(rng.random_range(0..MERSENNE_PRIME));
        }

        Ok(Self { dimension, a, b })
    }

    /// Number of hash functions.
    pub fn num_hashes(&self) -> usize {
        self.a.len()
    }

    /// Dimensionality of accepted feature vectors.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Encode a dense binary vector; any nonzero entry counts as active.
    ///
    /// A vector with no active entries yields the all-[`MAX_HASH`] sentinel.
    pub fn from_binary(&self, vector: &[u8]) -> Result<Signature> {
        if vector.len() != self.dimension {
            return Err(CartaError::InvalidInput(format!(
                "vector has {} positions, expected {}",
                vector.len(),
                self.dimension
            )));
        }

        let active = vector
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != 0)
            .map(|(i, _)| i as u32);
        Ok(self.signature_from_keys(active))
    }

    /// Encode a vector given as the list of its active positions.
    pub fn from_sparse(&self, positions: &[u32]) -> Result<Signature> {
        if let Some(&bad) = positions.iter().find(|&&p| p as usize >= self.dimension) {
            return Err(CartaError::InvalidInput(format!(
                "active position {bad} out of range for dimension {}",
                self.dimension
            )));
        }
        Ok(self.signature_from_keys(positions.iter().copied()))
    }

    /// Encode a set of string tokens. Tokens are hashed to 32-bit keys first,
    /// so the configured dimension does not apply.
    pub fn from_strings<S: AsRef<str>>(&self, tokens: &[S]) -> Signature {
        self.signature_from_keys(tokens.iter().map(|t| string_key(t.as_ref())))
    }

    /// Batch form of [`MinHash::from_binary`]; results are in input order.
    pub fn encode_all<V: AsRef<[u8]> + Sync>(&self, vectors: &[V]) -> Result<Vec<Signature>> {
        #[cfg(feature = "parallel")]
        let iter = vectors.par_iter();
        #[cfg(not(feature = "parallel"))]
        let iter = vectors.iter();

        let signatures: Result<Vec<Signature>> =
            iter.map(|v| self.from_binary(v.as_ref())).collect();
        if let Ok(sigs) = &signatures {
            tracing::debug!(count = sigs.len(), hashes = self.num_hashes(), "encoded signatures");
        }
        signatures
    }

    /// Alias of [`MinHash::encode_all`].
    pub fn batch_from_binary<V: AsRef<[u8]> + Sync>(
        &self,
        vectors: &[V],
    ) -> Result<Vec<Signature>> {
        self.encode_all(vectors)
    }

    /// Batch form of [`MinHash::from_sparse`].
    pub fn batch_from_sparse<V: AsRef<[u32]> + Sync>(
        &self,
        vectors: &[V],
    ) -> Result<Vec<Signature>> {
        #[cfg(feature = "parallel")]
        let iter = vectors.par_iter();
        #[cfg(not(feature = "parallel"))]
        let iter = vectors.iter();

        iter.map(|v| self.from_sparse(v.as_ref())).collect()
    }

    /// Batch form of [`MinHash::from_strings`].
    pub fn batch_from_strings<S: AsRef<str> + Sync>(&self, sets: &[Vec<S>]) -> Vec<Signature> {
        #[cfg(feature = "parallel")]
        let iter = sets.par_iter();
        #[cfg(not(feature = "parallel"))]
        let iter = sets.iter();

        iter.map(|s| self.from_strings(s)).collect()
    }

    fn signature_from_keys<I: IntoIterator<Item = u32>>(&self, keys: I) -> Signature {
        let mut mins = vec![MAX_HASH; self.num_hashes()];

        for key in keys {
            for (i, (&a, &b)) in self.a.iter().zip(self.b.iter()).enumerate() {
                let h = permute(a, b, key);
                if h < mins[i] {
                    mins[i] = h;
                }
            }
        }

        Signature { values: mins }
    }
}

#[inline]
fn permute(a: u64, b: u64, x: u32) -> u32 {
    let v = (a as u128 * x as u128 + b as u128) % MERSENNE_PRIME as u128;
    (v as u64 & MAX_HASH as u64) as u32
}

fn string_key(token: &str) -> u32 {
    use std::collections::hash_map::DefaultHasher;
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    let h = hasher.finish();
    (h ^ (h >> 32)) as u32
}

/// A fixed-length MinHash signature of one item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// The minimum hash value for each hash function.
    pub values: Vec<u32>,
}

impl Signature {
    pub fn new(values: Vec<u32>) -> Self {
        Self { values }
    }

    /// Estimate Jaccard similarity between two signatures.
    ///
    /// Returns a value in [0, 1] where 1 means identical sets, or 0 when the
    /// lengths differ.
    pub fn jaccard(&self, other: &Signature) -> f32 {
        if self.values.len() != other.values.len() || self.values.is_empty() {
            return 0.0;
        }
        let matches = self
            .values
            .iter()
            .zip(other.values.iter())
            .filter(|(a, b)| a == b)
            .count();

        matches as f32 / self.values.len() as f32
    }

    /// Estimated Jaccard distance, `1 - jaccard`.
    pub fn distance(&self, other: &Signature) -> f32 {
        crate::distance::signature_distance(&self.values, &other.values)
    }

    /// Number of positions where hash values differ.
    pub fn hamming_distance(&self, other: &Signature) -> usize {
        self.values
            .iter()
            .zip(other.values.iter())
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Merge two signatures (union of underlying sets).
    ///
    /// Takes element-wise minimum.
    pub fn merge(&self, other: &Signature) -> Signature {
        let values = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(&a, &b)| a.min(b))
            .collect();

        Signature { values }
    }

    /// True for the signature of a vector with no active positions.
    pub fn is_sentinel(&self) -> bool {
        self.values.iter().all(|&v| v == MAX_HASH)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<u32>> for Signature {
    fn from(values: Vec<u32>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense(dim: usize, active: impl IntoIterator<Item = usize>) -> Vec<u8> {
        let mut v = vec![0u8; dim];
        for i in active {
            v[i] = 1;
        }
        v
    }

    #[test]
    fn identical_vectors_have_identical_signatures() {
        let mh = MinHash::new(16, 128).unwrap();
        let v = dense(16, [1, 4, 9]);

        let sig1 = mh.from_binary(&v).unwrap();
        let sig2 = mh.from_binary(&v).unwrap();

        assert_eq!(sig1, sig2);
        assert_eq!(sig1.jaccard(&sig2), 1.0);
    }

    #[test]
    fn same_seed_same_permutations() {
        let a = MinHash::with_seed(32, 64, 7).unwrap();
        let b = MinHash::with_seed(32, 64, 7).unwrap();
        let c = MinHash::with_seed(32, 64, 8).unwrap();
        let v = dense(32, [0, 3, 17, 31]);

        assert_eq!(a.from_binary(&v).unwrap(), b.from_binary(&v).unwrap());
        assert_ne!(a.from_binary(&v).unwrap(), c.from_binary(&v).unwrap());
    }

    #[test]
    fn disjoint_sets_rarely_match() {
        let mh = MinHash::new(64, 128).unwrap();

        let sig1 = mh.from_binary(&dense(64, 0..10)).unwrap();
        let sig2 = mh.from_binary(&dense(64, 30..40)).unwrap();

        assert!(sig1.jaccard(&sig2) < 0.1);
    }

    #[test]
    fn estimate_tracks_true_jaccard() {
        let mh = MinHash::new(200, 1024).unwrap();

        // Actual Jaccard = 50/150 = 0.333...
        let sig1 = mh.from_binary(&dense(200, 0..100)).unwrap();
        let sig2 = mh.from_binary(&dense(200, 50..150)).unwrap();

        let estimated = sig1.jaccard(&sig2);
        assert!((estimated - 1.0 / 3.0).abs() < 0.05, "estimate {estimated}");
    }

    #[test]
    fn sparse_and_dense_agree() {
        let mh = MinHash::new(20, 64).unwrap();
        let dense_sig = mh.from_binary(&dense(20, [2, 5, 19])).unwrap();
        let sparse_sig = mh.from_sparse(&[19, 2, 5]).unwrap();
        assert_eq!(dense_sig, sparse_sig);
    }

    #[test]
    fn empty_vector_gives_sentinel() {
        let mh = MinHash::new(8, 32).unwrap();
        let sig = mh.from_binary(&[0u8; 8]).unwrap();
        assert!(sig.is_sentinel());
        assert_eq!(sig.len(), 32);
    }

    #[test]
    fn dimension_mismatch_is_invalid_input() {
        let mh = MinHash::new(8, 32).unwrap();
        assert!(matches!(
            mh.from_binary(&[1u8; 7]),
            Err(CartaError::InvalidInput(_))
        ));
        assert!(matches!(
            mh.from_sparse(&[8]),
            Err(CartaError::InvalidInput(_))
        ));
    }

    #[test]
    fn zero_hashes_rejected() {
        assert!(matches!(
            MinHash::new(8, 0),
            Err(CartaError::InvalidParameter(_))
        ));
        assert!(matches!(
            MinHash::new(0, 8),
            Err(CartaError::InvalidParameter(_))
        ));
    }

    #[test]
    fn batch_matches_single() {
        let mh = MinHash::new(12, 64).unwrap();
        let vectors = vec![dense(12, [0, 1]), dense(12, [5]), dense(12, [])];

        let batch = mh.encode_all(&vectors).unwrap();
        let single: Vec<Signature> = vectors.iter().map(|v| mh.from_binary(v).unwrap()).collect();
        assert_eq!(batch, single);
    }

    #[test]
    fn batch_fails_on_any_bad_vector() {
        let mh = MinHash::new(4, 16).unwrap();
        let vectors = vec![vec![1u8, 0, 0, 0], vec![1u8, 0, 0]];
        assert!(mh.encode_all(&vectors).is_err());
    }

    #[test]
    fn string_sets_overlap() {
        let mh = MinHash::new(1, 256).unwrap();
        let s1 = mh.from_strings(&["the", "quick", "brown", "fox"]);
        let s2 = mh.from_strings(&["the", "quick", "brown", "dog"]);
        let s3 = mh.from_strings(&["hello", "world", "foo", "bar"]);

        assert!(s1.jaccard(&s2) > s1.jaccard(&s3));
    }

    #[test]
    fn merge_equals_union_signature() {
        let mh = MinHash::new(10, 64).unwrap();

        let sig1 = mh.from_sparse(&[0, 1]).unwrap();
        let sig2 = mh.from_sparse(&[2, 3]).unwrap();
        let sig_union = mh.from_sparse(&[0, 1, 2, 3]).unwrap();

        assert_eq!(sig1.merge(&sig2), sig_union);
    }
}
