//! Hash-based signatures for set similarity.
//!
//! The encoders here turn feature vectors into fixed-length integer
//! signatures whose positions agree in proportion to the similarity of the
//! inputs. The forest in [`crate::forest`] indexes those signatures.
//!
//! ## MinHash: Jaccard Similarity for Sets
//!
//! **Key insight** (Broder 1997): For a random permutation π of the universe,
//!
//! ```text
//! P[min(π(A)) = min(π(B))] = |A ∩ B| / |A ∪ B| = Jaccard(A, B)
//! ```
//!
//! Why? The minimum element of A ∪ B is equally likely to be any element.
//! It's in A ∩ B with probability |A ∩ B| / |A ∪ B|.
//!
//! A binary feature vector is read as the set of its active positions:
//!
//! ```rust
//! use carta::hash::MinHash;
//!
//! let mh = MinHash::new(4, 1024).unwrap();
//! let a = mh.from_binary(&[1, 1, 0, 0]).unwrap();
//! let b = mh.from_binary(&[1, 1, 0, 1]).unwrap();
//!
//! // True Jaccard is 2/3.
//! assert!((a.jaccard(&b) - 2.0 / 3.0).abs() < 0.1);
//! ```
//!
//! ## Weighted MinHash
//!
//! For real-valued, non-negative vectors, [`WeightedMinHash`] samples with
//! ICWS so collisions estimate the weighted Jaccard similarity. Its
//! signatures are twice as long (one `(index, level)` pair per hash).
//!
//! Images with graded intensities can alternatively be binarized first with
//! a [`crate::binarize::BinarizePolicy`] and fed to [`MinHash`].
//!
//! ## References
//!
//! - Broder (1997). "On the resemblance and containment of documents." (MinHash)
//! - Ioffe (2010). "Improved consistent sampling, weighted minhash and L1 sketching." (ICWS)

pub mod minhash;
pub mod weighted;

pub use minhash::{MinHash, MinHashParams, Signature, MAX_HASH};
pub use weighted::WeightedMinHash;
