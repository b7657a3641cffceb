//! LSH Forest: prefix-sorted tables over MinHash signatures.
//!
//! # Algorithm
//!
//! A signature of length `d` is cut into `l` windows of `w = d / l` values.
//! Table `i` orders all items by window `i`. Items that agree on the first
//! `r` values of a window sit next to each other in that table, and the
//! probability of agreeing on `r` values falls off as `J^r`, so a shared
//! prefix is evidence of high Jaccard similarity.
//!
//! A query walks the prefix depth down from `w` to 1. At each depth it
//! collects, from every table, the items sharing the query's prefix, and
//! stops after the first depth whose pool holds `k * kc` candidates.
//! Candidates are then ranked by the estimated distance over the full
//! signature. When even depth 1 pools fewer than `k` candidates the query
//! falls back to a linear scan, so a query always returns `min(k, n - 1)`
//! neighbors.
//!
//! ```text
//! window:   [ 0 .. w ) [ w .. 2w ) ...  [ (l-1)w .. d )
//! table:        0          1              l - 1
//! ```
//!
//! # Lifecycle
//!
//! `new` → `add_batch` (any number of times) → `build_index` (exactly once)
//! → queries. Queries take `&self` and need no locking; `build_index` is a
//! one-way transition, after which `add_batch` and `build_index` fail with
//! [`CartaError::AlreadyIndexed`]. [`LshForest::clear`] returns to the empty state.
//!
//! ```rust
//! use carta::forest::{ForestParams, LshForest};
//! use carta::hash::MinHash;
//!
//! # fn main() -> carta::Result<()> {
//! let mh = MinHash::new(4, 64)?;
//! let sigs = mh.encode_all(&[[1u8, 1, 0, 0], [1, 1, 0, 1], [0, 0, 1, 1]])?;
//!
//! let mut forest = LshForest::new(ForestParams { signature_len: 64, ..Default::default() })?;
//! forest.add_batch(&sigs)?;
//! forest.build_index()?;
//!
//! let neighbors = forest.query_knn(0, 1)?;
//! assert_eq!(neighbors[0].0, 1);
//! # Ok(())
//! # }
//! ```
//!
//! # References
//!
//! - Bawa, Condie & Ganesan (2005): "LSH Forest: Self-Tuning Indexes for Similarity Search"

mod table;

use std::collections::HashSet;
use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::distance::SignatureMetric;
use crate::error::{CartaError, Result};
use crate::hash::Signature;

pub use table::ForestTable;

/// Forest parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Signature length `d` every added signature must have.
    pub signature_len: usize,
    /// Number of tables `l`; must divide `signature_len`.
    pub num_tables: usize,
    /// Candidate multiplier `kc`: a k-NN query pools up to `k * kc` candidates.
    pub candidate_factor: usize,
    /// Compare signatures as weighted MinHash `(index, level)` pairs.
    pub weighted: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            signature_len: 128,
            num_tables: 8,
            candidate_factor: 10,
            weighted: false,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<()> {
        if self.signature_len == 0 || self.num_tables == 0 {
            return Err(CartaError::InvalidParameter(
                "signature_len and num_tables must be greater than 0".to_string(),
            ));
        }
        if self.signature_len % self.num_tables != 0 {
            return Err(CartaError::InvalidParameter(format!(
                "num_tables ({}) must divide signature_len ({})",
                self.num_tables, self.signature_len
            )));
        }
        if self.weighted && self.signature_len % 2 != 0 {
            return Err(CartaError::InvalidParameter(
                "weighted signatures have even length".to_string(),
            ));
        }
        if self.candidate_factor == 0 {
            return Err(CartaError::InvalidParameter(
                "candidate_factor must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Window width `d / l` of each table.
    pub fn window(&self) -> usize {
        self.signature_len / self.num_tables
    }

    pub fn metric(&self) -> SignatureMetric {
        if self.weighted {
            SignatureMetric::Weighted
        } else {
            SignatureMetric::MinHash
        }
    }
}

/// Approximate k-NN index over MinHash signatures.
#[derive(Debug, Clone)]
pub struct LshForest {
    params: ForestParams,
    /// Flat signature storage, `signature_len` values per item.
    signatures: Vec<u32>,
    num_items: usize,
    tables: Vec<ForestTable>,
    indexed: bool,
}

impl LshForest {
    pub fn new(params: ForestParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            signatures: Vec::new(),
            num_items: 0,
            tables: Vec::new(),
            indexed: false,
        })
    }

    /// Append signatures; item ids continue from the current count.
    ///
    /// Either every signature is added or none is.
    pub fn add_batch(&mut self, signatures: &[Signature]) -> Result<Range<usize>> {
        if self.indexed {
            return Err(CartaError::AlreadyIndexed);
        }
        let d = self.params.signature_len;
        if let Some((i, s)) = signatures.iter().enumerate().find(|(_, s)| s.len() != d) {
            return Err(CartaError::InvalidInput(format!(
                "signature {i} has length {}, expected {d}",
                s.len()
            )));
        }
        if self.num_items + signatures.len() > u32::MAX as usize {
            return Err(CartaError::InvalidInput(
                "forest holds at most u32::MAX items".to_string(),
            ));
        }

        let start = self.num_items;
        self.signatures.reserve(signatures.len() * d);
        for s in signatures {
            self.signatures.extend_from_slice(&s.values);
        }
        self.num_items += signatures.len();
        Ok(start..self.num_items)
    }

    /// Sort every table. One-way: a second call fails with `AlreadyIndexed`.
    pub fn build_index(&mut self) -> Result<()> {
        if self.indexed {
            return Err(CartaError::AlreadyIndexed);
        }
        if self.num_items == 0 {
            return Err(CartaError::EmptyDataset);
        }

        let d = self.params.signature_len;
        let w = self.params.window();
        let n = self.num_items;
        let sigs = &self.signatures;

        #[cfg(feature = "parallel")]
        let iter = (0..self.params.num_tables).into_par_iter();
        #[cfg(not(feature = "parallel"))]
        let iter = 0..self.params.num_tables;

        self.tables = iter
            .map(|t| ForestTable::build(sigs, d, t * w, w, n))
            .collect();
        self.indexed = true;

        tracing::debug!(
            items = n,
            tables = self.params.num_tables,
            window = w,
            "lsh forest indexed"
        );
        Ok(())
    }

    /// Up to `k` nearest neighbors of stored item `item`, excluding itself,
    /// by ascending estimated distance (ties: lower id first).
    pub fn query_knn(&self, item: usize, k: usize) -> Result<Vec<(u32, f32)>> {
        self.query_knn_with(item, k, self.params.candidate_factor)
    }

    /// [`LshForest::query_knn`] with an explicit candidate multiplier.
    pub fn query_knn_with(
        &self,
        item: usize,
        k: usize,
        candidate_factor: usize,
    ) -> Result<Vec<(u32, f32)>> {
        self.ensure_indexed()?;
        let query = self.stored(item)?;
        Ok(self.knn(query, Some(item as u32), k, candidate_factor.max(1)))
    }

    /// Up to `k` nearest stored items to an external signature.
    pub fn query_by_signature(&self, signature: &Signature, k: usize) -> Result<Vec<(u32, f32)>> {
        self.ensure_indexed()?;
        self.check_len(signature)?;
        Ok(self.knn(&signature.values, None, k, self.params.candidate_factor))
    }

    /// Exact ranking of all stored items against `signature`.
    pub fn query_linear_scan(&self, signature: &Signature, k: usize) -> Result<Vec<(u32, f32)>> {
        self.check_len(signature)?;
        Ok(self.linear_scan(&signature.values, None, k))
    }

    /// Exact ranking of all other stored items against item `item`.
    pub fn query_linear_scan_by_id(&self, item: usize, k: usize) -> Result<Vec<(u32, f32)>> {
        let query = self.stored(item)?;
        Ok(self.linear_scan(query, Some(item as u32), k))
    }

    /// Estimated distance between two stored items.
    pub fn distance(&self, a: usize, b: usize) -> Result<f32> {
        Ok(self.params.metric().distance(self.stored(a)?, self.stored(b)?))
    }

    /// Estimated distance from `signature` to every stored item, in id order.
    pub fn distances_from(&self, signature: &Signature) -> Result<Vec<f32>> {
        self.check_len(signature)?;
        let metric = self.params.metric();
        Ok((0..self.num_items)
            .map(|i| metric.distance(&signature.values, self.slot(i)))
            .collect())
    }

    /// Copy of a stored signature.
    pub fn signature(&self, item: usize) -> Option<Signature> {
        (item < self.num_items).then(|| Signature::new(self.slot(item).to_vec()))
    }

    /// Drop all signatures and tables; the forest accepts `add_batch` again.
    pub fn clear(&mut self) {
        self.signatures.clear();
        self.tables.clear();
        self.num_items = 0;
        self.indexed = false;
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn tables(&self) -> &[ForestTable] {
        &self.tables
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn len(&self) -> usize {
        self.num_items
    }

    pub fn is_empty(&self) -> bool {
        self.num_items == 0
    }

    fn ensure_indexed(&self) -> Result<()> {
        if self.indexed {
            Ok(())
        } else {
            Err(CartaError::NotIndexed)
        }
    }

    fn check_len(&self, signature: &Signature) -> Result<()> {
        if signature.len() != self.params.signature_len {
            return Err(CartaError::InvalidInput(format!(
                "signature has length {}, expected {}",
                signature.len(),
                self.params.signature_len
            )));
        }
        Ok(())
    }

    fn stored(&self, item: usize) -> Result<&[u32]> {
        if item >= self.num_items {
            return Err(CartaError::InvalidInput(format!(
                "item {item} out of range for forest of {} items",
                self.num_items
            )));
        }
        Ok(self.slot(item))
    }

    #[inline]
    fn slot(&self, item: usize) -> &[u32] {
        let d = self.params.signature_len;
        &self.signatures[item * d..(item + 1) * d]
    }

    fn knn(
        &self,
        query: &[u32],
        exclude: Option<u32>,
        k: usize,
        candidate_factor: usize,
    ) -> Vec<(u32, f32)> {
        let available = self.num_items - usize::from(exclude.is_some());
        let want = k.min(available);
        if want == 0 {
            return Vec::new();
        }

        let target = k.saturating_mul(candidate_factor).min(available);
        let candidates = self.candidates(query, exclude, target);
        if candidates.len() < want {
            return self.linear_scan(query, exclude, k);
        }
        self.rank(query, candidates.into_iter(), k)
    }

    /// Pool ids sharing the longest possible prefix with `query`.
    ///
    /// Descent is synchronous: every table contributes its full range at a
    /// depth before `target` is checked, so an item that matches the query on
    /// a whole window is always pooled.
    fn candidates(&self, query: &[u32], exclude: Option<u32>, target: usize) -> HashSet<u32> {
        let d = self.params.signature_len;
        let mut pooled = HashSet::with_capacity(target);

        for depth in (1..=self.params.window()).rev() {
            for table in &self.tables {
                let range = table.prefix_range(&self.signatures, d, query, depth);
                pooled.extend(range.iter().copied().filter(|&id| Some(id) != exclude));
            }
            if pooled.len() >= target {
                break;
            }
        }
        pooled
    }

    fn linear_scan(&self, query: &[u32], exclude: Option<u32>, k: usize) -> Vec<(u32, f32)> {
        let ids = (0..self.num_items as u32).filter(|&id| Some(id) != exclude);
        self.rank(query, ids, k)
    }

    fn rank<I: Iterator<Item = u32>>(&self, query: &[u32], ids: I, k: usize) -> Vec<(u32, f32)> {
        let metric = self.params.metric();
        let mut scored: Vec<(u32, f32)> = ids
            .map(|id| (id, metric.distance(query, self.slot(id as usize))))
            .collect();
        scored.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        scored
    }
}
