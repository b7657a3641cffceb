//! carta: similarity maps for large collections of binary feature vectors.
//!
//! Projects items into 2D so that similar items land near each other, and
//! returns the minimum spanning forest of their approximate k-NN graph to
//! draw between them. The pipeline is a single batch computation:
//!
//! ```text
//! vectors ─► MinHash ─► LshForest ─► k-NN graph ─► MST + forces ─► (x, y) + edges
//!            hash/      forest/      graph/        layout/
//! ```
//!
//! - [`hash`]: MinHash (and weighted MinHash) signatures estimating Jaccard similarity
//! - [`forest`]: LSH Forest, prefix-sorted tables answering approximate k-NN queries
//! - [`graph`]: symmetrized k-NN graph, union-find, connected components
//! - [`layout`]: Kruskal spanning forest and force-directed placement
//! - [`pipeline`]: all of the above in one call
//!
//! # Critical Nuances
//!
//! ## Similarity is set overlap
//!
//! Every distance in this crate is an estimate of Jaccard distance over the
//! set of active positions. Graded data must be reduced to sets first; see
//! [`binarize`] for threshold policies.
//!
//! ## Approximate, but reproducible
//!
//! Neither the k-NN graph nor the layout is exact. Both are deterministic for
//! fixed seeds: hashing uses seeded permutations, ties are broken by lower
//! index, and the layout's random start is seeded.
//!
//! ## Disconnected graphs are normal
//!
//! With small `k`, well-separated clusters produce separate components. The
//! spanning forest then has `n - c` edges and each component is laid out
//! as its own tree.

pub mod binarize;
pub mod distance;
pub mod error;
pub mod forest;
pub mod graph;
pub mod hash;
pub mod layout;
pub mod pipeline;

pub use binarize::BinarizePolicy;
pub use error::{CartaError, Result};
pub use forest::{ForestParams, LshForest};
pub use graph::{build_graph, build_graph_with, Edge, NeighborGraph};
pub use hash::{MinHash, MinHashParams, Signature, WeightedMinHash};
pub use layout::{
    layout, layout_from_edge_list, layout_from_forest, GraphProperties, Initialization,
    LayoutConfiguration, LayoutResult,
};
pub use pipeline::Pipeline;
