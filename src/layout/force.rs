//! Force-directed relaxation of a spanning forest.
//!
//! Each iteration computes, for every node independently from the previous
//! positions:
//!
//! ```text
//! attraction  a * (d - s)        along each spanning-tree edge
//! repulsion   r * s^3 / d^2      away from every other node (or those within the cutoff)
//! gravity     -g * p             toward the origin
//! ```
//!
//! where `s` is the target separation. Nodes then move along their net force
//! by at most the current temperature, which cools linearly over the
//! iteration cap. Relaxation stops early once no node moves farther than the
//! convergence threshold.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::config::{Initialization, LayoutConfiguration};
use crate::graph::Neighbors;

type Point = [f64; 2];

const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Outcome of a relaxation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxStats {
    pub iterations: usize,
    /// Largest single-node move in the last iteration, in target separations.
    pub max_displacement: f64,
    pub converged: bool,
}

/// Relax node positions along `tree` (adjacency of the spanning forest).
pub(crate) fn relax(tree: &[Neighbors], config: &LayoutConfiguration) -> (Vec<Point>, RelaxStats) {
    let n = tree.len();
    let s = config.target_separation;
    let mut pos = initial_positions(n, config);

    let mut stats = RelaxStats {
        iterations: 0,
        max_displacement: 0.0,
        converged: n <= 1,
    };
    if n <= 1 {
        return (pos, stats);
    }

    let t0 = config.initial_temperature * s * (n as f64).sqrt();
    let cutoff = config.effective_cutoff(n);
    let threshold = config.convergence_threshold * s;

    for it in 0..config.iterations {
        let temperature = t0 * (1.0 - it as f64 / config.iterations as f64);
        let grid = cutoff.map(|c| Grid::new(&pos, c * s));

        #[cfg(feature = "parallel")]
        let iter = (0..n).into_par_iter();
        #[cfg(not(feature = "parallel"))]
        let iter = 0..n;

        let forces: Vec<Point> = iter
            .map(|i| net_force(i, &pos, tree, grid.as_ref(), config))
            .collect();

        let mut max_move = 0.0f64;
        for (p, f) in pos.iter_mut().zip(&forces) {
            let len = f[0].hypot(f[1]);
            if len > 0.0 && len.is_finite() {
                let step = len.min(temperature);
                p[0] += f[0] / len * step;
                p[1] += f[1] / len * step;
                max_move = max_move.max(step);
            }
        }

        stats.iterations = it + 1;
        stats.max_displacement = max_move / s;
        tracing::trace!(iteration = it, max_move, temperature, "relaxation step");
        if max_move < threshold {
            stats.converged = true;
            break;
        }
    }

    (pos, stats)
}

fn initial_positions(n: usize, config: &LayoutConfiguration) -> Vec<Point> {
    let s = config.target_separation;
    match config.init {
        _ if n <= 1 => vec![[0.0, 0.0]; n],
        Initialization::Random => {
            let half = 0.5 * s * (n as f64).sqrt();
            let mut rng = StdRng::seed_from_u64(config.seed);
            (0..n)
                .map(|_| [rng.random_range(-half..half), rng.random_range(-half..half)])
                .collect()
        }
        Initialization::Circle => {
            let radius = n as f64 * s / std::f64::consts::TAU;
            (0..n)
                .map(|i| {
                    let a = std::f64::consts::TAU * i as f64 / n as f64;
                    [radius * a.cos(), radius * a.sin()]
                })
                .collect()
        }
    }
}

fn net_force(
    i: usize,
    pos: &[Point],
    tree: &[Neighbors],
    grid: Option<&Grid>,
    config: &LayoutConfiguration,
) -> Point {
    let s = config.target_separation;
    let p = pos[i];
    let mut f = [-config.gravity * p[0], -config.gravity * p[1]];

    if config.repulsion > 0.0 {
        let mut push = |j: usize| {
            if j == i {
                return;
            }
            let (dir, d) = direction(i, j, p, pos[j]);
            // Clamp so near-coincident nodes do not explode.
            let d = d.max(0.01 * s);
            let mag = config.repulsion * s * s * s / (d * d);
            f[0] += dir[0] * mag;
            f[1] += dir[1] * mag;
        };
        match grid {
            Some(g) => g.for_each_near(p, |j| push(j as usize)),
            None => (0..pos.len()).for_each(&mut push),
        }
    }

    for &j in &tree[i] {
        let (dir, d) = direction(i, j as usize, p, pos[j as usize]);
        // `dir` points away from j; the spring pulls toward it when stretched.
        let mag = config.attraction * (d - s);
        f[0] -= dir[0] * mag;
        f[1] -= dir[1] * mag;
    }

    f
}

/// Unit vector from `q` (node j) toward `p` (node i), and their distance.
///
/// Coincident nodes get a fixed pseudo-random direction that is antisymmetric
/// in `(i, j)`, so the pair separates deterministically.
fn direction(i: usize, j: usize, p: Point, q: Point) -> (Point, f64) {
    let dx = p[0] - q[0];
    let dy = p[1] - q[1];
    let d = dx.hypot(dy);
    if d > 1e-12 {
        return ([dx / d, dy / d], d);
    }
    let (lo, hi) = (i.min(j), i.max(j));
    let angle = GOLDEN_ANGLE * (lo * 31 + hi) as f64;
    let sign = if i < j { 1.0 } else { -1.0 };
    ([sign * angle.cos(), sign * angle.sin()], 0.0)
}

/// Uniform grid bucketing nodes by cell, for cutoff-limited repulsion.
struct Grid {
    cell: f64,
    cells: HashMap<(i64, i64), Vec<u32>>,
}

impl Grid {
    fn new(pos: &[Point], cell: f64) -> Self {
        let mut cells: HashMap<(i64, i64), Vec<u32>> = HashMap::new();
        for (i, p) in pos.iter().enumerate() {
            cells.entry(Self::key(p, cell)).or_default().push(i as u32);
        }
        Self { cell, cells }
    }

    fn key(p: &Point, cell: f64) -> (i64, i64) {
        ((p[0] / cell).floor() as i64, (p[1] / cell).floor() as i64)
    }

    /// Visit nodes in the 3x3 block of cells around `p`, in a fixed order.
    fn for_each_near<F: FnMut(u32)>(&self, p: Point, mut visit: F) {
        let (cx, cy) = Self::key(&p, self.cell);
        for gx in cx - 1..=cx + 1 {
            for gy in cy - 1..=cy + 1 {
                let Some(members) = self.cells.get(&(gx, gy)) else {
                    continue;
                };
                for &j in members {
                    visit(j);
                }
            }
        }
    }
}
