//! Spanning-tree layout of a neighbor graph.
//!
//! # Pipeline
//!
//! 1. Reduce the [`NeighborGraph`] to its minimum spanning forest
//!    ([`mst::minimum_spanning_forest`]), one tree per connected component.
//! 2. Seed node positions ([`Initialization`]) and relax them with springs
//!    along tree edges plus all-pairs (or cutoff-limited) repulsion.
//! 3. Centre on the origin and rescale so one target separation renders as
//!    [`LayoutConfiguration::node_size`].
//!
//! The tree, not the full k-NN graph, drives the attraction: trees have no
//! cycles to fight over, so clusters come out as readable branches.
//!
//! The layout is a pure function of `(graph, config)`. Re-running with the
//! same seed reproduces the coordinates bit for bit, so an interactive caller
//! can re-invoke it whenever a parameter changes.

mod config;
mod force;
pub mod mst;

use crate::distance::planar_distance;
use crate::error::{CartaError, Result};
use crate::forest::LshForest;
use crate::graph::{build_graph_with, NeighborGraph, Neighbors};

pub use config::{AUTO_CUTOFF, AUTO_CUTOFF_NODES, Initialization, LayoutConfiguration};
pub use force::RelaxStats;
pub use mst::{minimum_spanning_forest, SpanningForest};

/// Structural summary of the spanning forest behind a layout.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphProperties {
    /// Sum of spanning-forest edge weights.
    pub mst_weight: f32,
    /// Number of trees (isolated nodes count as one each).
    pub connected_components: usize,
    /// Nodes with no spanning-forest edge.
    pub isolated_vertices: usize,
    /// Spanning-forest degree of every node.
    pub degrees: Vec<usize>,
    /// Spanning-forest neighbors of every node, ascending.
    pub adjacency: Vec<Neighbors>,
}

/// Coordinates plus the spanning-forest edges to draw between them.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    /// Edge `i` joins `sources[i]` and `targets[i]`, with `sources[i] < targets[i]`.
    pub sources: Vec<u32>,
    pub targets: Vec<u32>,
    pub properties: GraphProperties,
    pub stats: RelaxStats,
}

impl LayoutResult {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// `(x, y)` of node `i`.
    pub fn position(&self, i: usize) -> Option<(f32, f32)> {
        Some((*self.x.get(i)?, *self.y.get(i)?))
    }

    /// Planar distance between nodes `a` and `b` in output units.
    pub fn distance(&self, a: usize, b: usize) -> Option<f32> {
        Some(planar_distance(self.position(a)?, self.position(b)?))
    }

    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.sources.iter().copied().zip(self.targets.iter().copied())
    }
}

/// Lay out `graph`: spanning forest, relaxation, scaling.
///
/// Fails with `EmptyDataset` on a graph without nodes.
pub fn layout(graph: &NeighborGraph, config: &LayoutConfiguration) -> Result<LayoutResult> {
    config.validate()?;
    let n = graph.num_nodes();
    if n == 0 {
        return Err(CartaError::EmptyDataset);
    }

    let forest = minimum_spanning_forest(graph);
    let tree = NeighborGraph::from_edges(
        n,
        &forest
            .edges
            .iter()
            .map(|e| (e.source, e.target, e.weight))
            .collect::<Vec<_>>(),
    )?;
    let adjacency = tree.adjacency();
    let degrees = tree.degrees();

    let (pos, stats) = force::relax(&adjacency, config);
    if !stats.converged {
        tracing::warn!(
            iterations = stats.iterations,
            max_displacement = stats.max_displacement,
            "relaxation hit the iteration cap before converging"
        );
    }

    let (cx, cy) = centroid(&pos);
    let scale = config.node_size / config.target_separation;
    let x = pos.iter().map(|p| ((p[0] - cx) * scale) as f32).collect();
    let y = pos.iter().map(|p| ((p[1] - cy) * scale) as f32).collect();

    let properties = GraphProperties {
        mst_weight: forest.total_weight,
        connected_components: forest.components,
        isolated_vertices: degrees.iter().filter(|&&d| d == 0).count(),
        degrees,
        adjacency,
    };

    tracing::debug!(
        nodes = n,
        tree_edges = forest.edges.len(),
        components = forest.components,
        iterations = stats.iterations,
        max_displacement = stats.max_displacement,
        "layout computed"
    );

    Ok(LayoutResult {
        x,
        y,
        sources: forest.edges.iter().map(|e| e.source).collect(),
        targets: forest.edges.iter().map(|e| e.target).collect(),
        properties,
        stats,
    })
}

/// Build the k-NN graph from an indexed forest with `config.k` / `config.kc`, then lay it out.
pub fn layout_from_forest(
    forest: &LshForest,
    config: &LayoutConfiguration,
) -> Result<LayoutResult> {
    config.validate()?;
    let graph = build_graph_with(forest, config.k, config.kc)?;
    layout(&graph, config)
}

/// Lay out an externally supplied weighted edge list over nodes `0..num_nodes`.
pub fn layout_from_edge_list(
    num_nodes: usize,
    edges: &[(u32, u32, f32)],
    config: &LayoutConfiguration,
) -> Result<LayoutResult> {
    let graph = NeighborGraph::from_edges(num_nodes, edges)?;
    layout(&graph, config)
}

fn centroid(pos: &[[f64; 2]]) -> (f64, f64) {
    let n = pos.len().max(1) as f64;
    let (sx, sy) = pos
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
    (sx / n, sy / n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> LayoutConfiguration {
        LayoutConfiguration {
            iterations: 300,
            ..Default::default()
        }
    }

    #[test]
    fn empty_graph_is_an_error() {
        assert_eq!(
            layout(&NeighborGraph::new(0), &quick()),
            Err(CartaError::EmptyDataset)
        );
    }

    #[test]
    fn one_node_one_coordinate() {
        let res = layout(&NeighborGraph::new(1), &quick()).unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res.position(0), Some((0.0, 0.0)));
        assert_eq!(res.edges().count(), 0);
    }

    #[test]
    fn tree_edges_reported_once_with_graph_ids() {
        let res = layout_from_edge_list(
            4,
            &[(0, 1, 0.1), (1, 2, 0.2), (0, 2, 0.5), (2, 3, 0.1)],
            &quick(),
        )
        .unwrap();
        let mut edges: Vec<(u32, u32)> = res.edges().collect();
        edges.sort();
        assert_eq!(edges, vec![(0, 1), (1, 2), (2, 3)]);
        assert_eq!(res.properties.connected_components, 1);
        assert_eq!(res.properties.degrees, vec![1, 2, 2, 1]);
        assert!((res.properties.mst_weight - 0.4).abs() < 1e-6);
    }

    #[test]
    fn isolated_nodes_are_placed() {
        let res = layout_from_edge_list(5, &[(0, 1, 0.3)], &quick()).unwrap();
        assert_eq!(res.len(), 5);
        assert_eq!(res.properties.connected_components, 4);
        assert_eq!(res.properties.isolated_vertices, 3);
        assert!(res.x.iter().chain(res.y.iter()).all(|v| v.is_finite()));
    }

    #[test]
    fn node_size_scales_output() {
        let edges = [(0, 1, 0.1), (1, 2, 0.1)];
        let small_cfg = LayoutConfiguration {
            node_size: 0.01,
            ..quick()
        };
        let large_cfg = LayoutConfiguration {
            node_size: 0.02,
            ..quick()
        };
        let small = layout_from_edge_list(3, &edges, &small_cfg).unwrap();
        let large = layout_from_edge_list(3, &edges, &large_cfg).unwrap();
        for i in 0..3 {
            assert!((large.x[i] - 2.0 * small.x[i]).abs() < 1e-5);
            assert!((large.y[i] - 2.0 * small.y[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn output_is_centered() {
        let edges = [(0, 1, 0.1), (1, 2, 0.1), (3, 4, 0.1)];
        let res = layout_from_edge_list(6, &edges, &quick()).unwrap();
        let mx: f32 = res.x.iter().sum::<f32>() / 6.0;
        let my: f32 = res.y.iter().sum::<f32>() / 6.0;
        assert!(mx.abs() < 1e-4 && my.abs() < 1e-4);
    }

    #[test]
    fn invalid_config_rejected() {
        let cfg = LayoutConfiguration { iterations: 10, node_size: -1.0, ..Default::default() };
        assert!(matches!(
            layout(&NeighborGraph::new(2), &cfg),
            Err(CartaError::InvalidParameter(_))
        ));
    }
}
