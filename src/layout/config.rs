//! Layout configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CartaError, Result};

/// Node count above which an unset `repulsion_cutoff` switches to grid repulsion.
pub const AUTO_CUTOFF_NODES: usize = 5_000;

/// Cutoff, in target separations, used above [`AUTO_CUTOFF_NODES`].
pub const AUTO_CUTOFF: f64 = 3.0;

/// How node positions are seeded before relaxation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initialization {
    /// Uniform in a square sized to the node count, drawn from `seed`.
    #[default]
    Random,
    /// Evenly spaced on a circle, in node order.
    Circle,
}

/// Parameters of the k-NN graph and the force-directed relaxation.
///
/// Distances inside the simulation are measured in units of
/// `target_separation`; the final coordinates are rescaled so that one
/// target separation renders as `node_size`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfiguration {
    /// Neighbors per node when the graph is built from a forest.
    pub k: usize,
    /// Candidate multiplier for those queries (see `ForestParams::candidate_factor`).
    pub kc: usize,
    /// Iteration cap of the relaxation.
    pub iterations: usize,
    /// Rest length of a spanning-tree edge.
    pub target_separation: f64,
    /// Spring coefficient along spanning-tree edges.
    pub attraction: f64,
    /// Coefficient of the inverse-square repulsion between nodes.
    pub repulsion: f64,
    /// Pull toward the origin, keeping disconnected components in view.
    pub gravity: f64,
    /// Only repel pairs closer than this many target separations.
    ///
    /// `None` repels all pairs, which costs `O(n^2)` per iteration. Above
    /// [`AUTO_CUTOFF_NODES`] nodes `None` falls back to a grid cutoff of
    /// [`AUTO_CUTOFF`] separations, which is roughly linear in `n`.
    pub repulsion_cutoff: Option<f64>,
    /// Stop once no node moves farther than this (in target separations) in one step.
    pub convergence_threshold: f64,
    /// Step cap at the first iteration, in target separations per sqrt(node count).
    pub initial_temperature: f64,
    pub init: Initialization,
    pub seed: u64,
    /// Rendered length of one target separation.
    pub node_size: f64,
}

impl Default for LayoutConfiguration {
    fn default() -> Self {
        Self {
            k: 10,
            kc: 10,
            iterations: 1000,
            target_separation: 1.0,
            attraction: 1.0,
            repulsion: 1.0,
            gravity: 0.01,
            repulsion_cutoff: None,
            convergence_threshold: 1e-4,
            initial_temperature: 0.1,
            init: Initialization::Random,
            seed: 42,
            node_size: 1.0 / 65.0,
        }
    }
}

impl LayoutConfiguration {
    /// Repulsion cutoff actually applied to a layout of `num_nodes` nodes.
    pub fn effective_cutoff(&self, num_nodes: usize) -> Option<f64> {
        self.repulsion_cutoff
            .or((num_nodes > AUTO_CUTOFF_NODES).then_some(AUTO_CUTOFF))
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 || self.kc == 0 {
            return Err(CartaError::InvalidParameter(
                "k and kc must be greater than 0".to_string(),
            ));
        }
        positive("target_separation", self.target_separation)?;
        positive("initial_temperature", self.initial_temperature)?;
        positive("node_size", self.node_size)?;
        non_negative("attraction", self.attraction)?;
        non_negative("repulsion", self.repulsion)?;
        non_negative("gravity", self.gravity)?;
        non_negative("convergence_threshold", self.convergence_threshold)?;
        if let Some(cutoff) = self.repulsion_cutoff {
            positive("repulsion_cutoff", cutoff)?;
        }
        Ok(())
    }
}

fn positive(name: &str, v: f64) -> Result<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(CartaError::InvalidParameter(format!(
            "{name} must be finite and positive, got {v}"
        )))
    }
}

fn non_negative(name: &str, v: f64) -> Result<()> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(CartaError::InvalidParameter(format!(
            "{name} must be finite and non-negative, got {v}"
        )))
    }
}
