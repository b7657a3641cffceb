//! k-nearest-neighbor graph built from forest queries.
//!
//! Every item asks the forest for its `k` nearest neighbors and each answer
//! becomes an undirected edge `(min(u, v), max(u, v))` weighted by the
//! estimated distance. When both endpoints report each other, the smaller
//! weight is kept. The graph is allowed to fall apart into several connected
//! components; the layout handles each one.

mod union_find;

use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::error::{CartaError, Result};
use crate::forest::LshForest;

pub use union_find::DisjointSet;

/// Neighbor list of one node. Spanning trees and small-k graphs rarely exceed this inline size.
pub type Neighbors = SmallVec<[u32; 8]>;

/// Undirected weighted edge with `source < target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: u32,
    pub target: u32,
    pub weight: f32,
}

/// Sparse undirected graph over nodes `0..num_nodes`.
///
/// Edges are deduplicated and kept sorted by `(source, target)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighborGraph {
    num_nodes: usize,
    edges: Vec<Edge>,
}

impl NeighborGraph {
    /// Graph with `num_nodes` isolated nodes.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            num_nodes,
            edges: Vec::new(),
        }
    }

    /// Build from `(u, v, weight)` triples in any orientation.
    ///
    /// Fails on self-loops, out-of-range endpoints, or weights that are
    /// negative or not finite.
    pub fn from_edges(num_nodes: usize, edges: &[(u32, u32, f32)]) -> Result<Self> {
        let mut merged = BTreeMap::new();
        for &(u, v, w) in edges {
            if u as usize >= num_nodes || v as usize >= num_nodes {
                return Err(CartaError::InvalidInput(format!(
                    "edge ({u}, {v}) out of range for {num_nodes} nodes"
                )));
            }
            if u == v {
                return Err(CartaError::InvalidInput(format!("self-loop on node {u}")));
            }
            if !w.is_finite() || w < 0.0 {
                return Err(CartaError::InvalidInput(format!(
                    "edge ({u}, {v}) has invalid weight {w}"
                )));
            }
            insert_min(&mut merged, u, v, w);
        }
        Ok(Self::from_merged(num_nodes, merged))
    }

    fn from_merged(num_nodes: usize, merged: BTreeMap<(u32, u32), f32>) -> Self {
        let edges = merged
            .into_iter()
            .map(|((source, target), weight)| Edge {
                source,
                target,
                weight,
            })
            .collect();
        Self { num_nodes, edges }
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Weight of edge `{u, v}`, if present.
    pub fn edge_weight(&self, u: u32, v: u32) -> Option<f32> {
        let key = (u.min(v), u.max(v));
        self.edges
            .binary_search_by(|e| (e.source, e.target).cmp(&key))
            .ok()
            .map(|i| self.edges[i].weight)
    }

    pub fn degrees(&self) -> Vec<usize> {
        let mut deg = vec![0usize; self.num_nodes];
        for e in &self.edges {
            deg[e.source as usize] += 1;
            deg[e.target as usize] += 1;
        }
        deg
    }

    /// Neighbor ids of every node, ascending.
    pub fn adjacency(&self) -> Vec<Neighbors> {
        let mut adj = vec![Neighbors::new(); self.num_nodes];
        for e in &self.edges {
            adj[e.source as usize].push(e.target);
            adj[e.target as usize].push(e.source);
        }
        for list in &mut adj {
            list.sort_unstable();
        }
        adj
    }

    /// Component label of every node, numbered `0..count` in order of lowest member.
    pub fn connected_components(&self) -> (usize, Vec<u32>) {
        let mut ds = DisjointSet::new(self.num_nodes);
        for e in &self.edges {
            ds.union(e.source, e.target);
        }

        let mut label_of_root = vec![u32::MAX; self.num_nodes];
        let mut labels = Vec::with_capacity(self.num_nodes);
        let mut count = 0u32;
        for node in 0..self.num_nodes as u32 {
            let root = ds.find(node) as usize;
            if label_of_root[root] == u32::MAX {
                label_of_root[root] = count;
                count += 1;
            }
            labels.push(label_of_root[root]);
        }
        (count as usize, labels)
    }

    pub fn num_components(&self) -> usize {
        self.connected_components().0
    }
}

/// Query every item's `k` nearest neighbors and merge the answers into one graph.
///
/// The forest must be indexed. With `n > 1` and `k > 0` every node ends up
/// with degree at least 1.
pub fn build_graph(forest: &LshForest, k: usize) -> Result<NeighborGraph> {
    build_graph_with(forest, k, forest.params().candidate_factor)
}

/// [`build_graph`] with an explicit candidate multiplier `kc` for the queries.
pub fn build_graph_with(forest: &LshForest, k: usize, kc: usize) -> Result<NeighborGraph> {
    if !forest.is_indexed() {
        return Err(CartaError::NotIndexed);
    }
    let n = forest.len();
    if k == 0 {
        tracing::warn!("k = 0 requested; graph will have no edges");
        return Ok(NeighborGraph::new(n));
    }

    #[cfg(feature = "parallel")]
    let iter = (0..n).into_par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = 0..n;

    let answers: Vec<Vec<(u32, f32)>> = iter
        .map(|i| forest.query_knn_with(i, k, kc))
        .collect::<Result<_>>()?;

    let mut merged = BTreeMap::new();
    for (u, neighbors) in answers.into_iter().enumerate() {
        for (v, w) in neighbors {
            insert_min(&mut merged, u as u32, v, w);
        }
    }

    let graph = NeighborGraph::from_merged(n, merged);
    tracing::debug!(
        nodes = n,
        edges = graph.num_edges(),
        components = graph.num_components(),
        k,
        "neighbor graph built"
    );
    Ok(graph)
}

fn insert_min(map: &mut BTreeMap<(u32, u32), f32>, u: u32, v: u32, w: f32) {
    map.entry((u.min(v), u.max(v)))
        .and_modify(|cur| {
            if w < *cur {
                *cur = w;
            }
        })
        .or_insert(w);
}
