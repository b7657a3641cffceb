//! One-call batch driver: feature vectors in, layout out.
//!
//! ```rust
//! use carta::pipeline::Pipeline;
//! use carta::{ForestParams, LayoutConfiguration, MinHashParams};
//!
//! # fn main() -> carta::Result<()> {
//! let pipeline = Pipeline::new(
//!     MinHashParams { num_hashes: 64, ..Default::default() },
//!     ForestParams { signature_len: 64, ..Default::default() },
//!     LayoutConfiguration { k: 2, iterations: 100, ..Default::default() },
//! )?;
//!
//! let vectors = vec![
//!     vec![1u8, 1, 0, 0],
//!     vec![1, 1, 0, 1],
//!     vec![0, 0, 1, 1],
//!     vec![0, 0, 1, 0],
//! ];
//! let result = pipeline.run(&vectors)?;
//! assert_eq!(result.len(), 4);
//! # Ok(())
//! # }
//! ```

use crate::binarize::BinarizePolicy;
use crate::error::{CartaError, Result};
use crate::forest::{ForestParams, LshForest};
use crate::hash::{MinHash, MinHashParams, Signature};
use crate::layout::{layout_from_forest, LayoutConfiguration, LayoutResult};

/// Encoder, index, and layout settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub minhash: MinHashParams,
    pub forest: ForestParams,
    pub layout: LayoutConfiguration,
}

impl Pipeline {
    /// Validate the three parameter sets together.
    pub fn new(
        minhash: MinHashParams,
        forest: ForestParams,
        layout: LayoutConfiguration,
    ) -> Result<Self> {
        minhash.validate()?;
        forest.validate()?;
        layout.validate()?;
        if forest.weighted {
            return Err(CartaError::InvalidParameter(
                "binary pipeline needs an unweighted forest".to_string(),
            ));
        }
        if minhash.num_hashes != forest.signature_len {
            return Err(CartaError::InvalidParameter(format!(
                "num_hashes ({}) must equal signature_len ({})",
                minhash.num_hashes, forest.signature_len
            )));
        }
        Ok(Self {
            minhash,
            forest,
            layout,
        })
    }

    /// Encode, index, and lay out binary vectors (nonzero = active).
    pub fn run<V: AsRef<[u8]> + Sync>(&self, vectors: &[V]) -> Result<LayoutResult> {
        let forest = self.index(vectors)?;
        layout_from_forest(&forest, &self.layout)
    }

    /// Binarize real-valued vectors with `policy`, then [`Pipeline::run`].
    pub fn run_weighted<V: AsRef<[f64]> + Sync>(
        &self,
        vectors: &[V],
        policy: BinarizePolicy,
    ) -> Result<LayoutResult> {
        let binary = policy.binarize_all(vectors);
        self.run(&binary)
    }

    /// Encode and index without laying out, for callers that also want to query.
    pub fn index<V: AsRef<[u8]> + Sync>(&self, vectors: &[V]) -> Result<LshForest> {
        let signatures = self.encode(vectors)?;
        let mut forest = LshForest::new(self.forest)?;
        forest.add_batch(&signatures)?;
        forest.build_index()?;
        Ok(forest)
    }

    pub fn encode<V: AsRef<[u8]> + Sync>(&self, vectors: &[V]) -> Result<Vec<Signature>> {
        let Some(first) = vectors.first() else {
            return Err(CartaError::EmptyDataset);
        };
        let encoder = MinHash::from_params(first.as_ref().len(), &self.minhash)?;
        encoder.encode_all(vectors)
    }
}
