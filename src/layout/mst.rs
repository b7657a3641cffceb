//! Minimum spanning forest (Kruskal).

use crate::graph::{DisjointSet, Edge, NeighborGraph};

/// One minimum spanning tree per connected component.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanningForest {
    /// Selected edges, in selection order (ascending weight).
    pub edges: Vec<Edge>,
    /// Number of trees, counting isolated nodes as single-node trees.
    pub components: usize,
    /// Sum of selected edge weights.
    pub total_weight: f32,
}

/// Kruskal's algorithm: scan edges by ascending `(weight, source, target)` and
/// keep each one that joins two different trees.
///
/// A graph with `n` nodes and `c` components yields exactly `n - c` edges.
pub fn minimum_spanning_forest(graph: &NeighborGraph) -> SpanningForest {
    let mut order: Vec<&Edge> = graph.edges().iter().collect();
    order.sort_unstable_by(|a, b| {
        a.weight
            .total_cmp(&b.weight)
            .then(a.source.cmp(&b.source))
            .then(a.target.cmp(&b.target))
    });

    let n = graph.num_nodes();
    let mut ds = DisjointSet::new(n);
    let mut edges = Vec::with_capacity(n.saturating_sub(1));
    let mut total_weight = 0.0f32;
    for e in order {
        if ds.union(e.source, e.target) {
            total_weight += e.weight;
            edges.push(*e);
            if edges.len() + 1 == n {
                break;
            }
        }
    }

    SpanningForest {
        edges,
        components: ds.num_sets(),
        total_weight,
    }
}
