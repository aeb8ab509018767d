//! Genome-to-path decoders.
//!
//! A decoder turns a priority genome into a concrete route through the grid
//! and scores it. Three interchangeable policies are provided:
//!
//! - [`ShortestPathDecoder`]: best-first search where priorities discount
//!   edge costs (`weight / priority^alpha`). Thorough and the most expensive.
//! - [`StochasticWalkDecoder`]: a backtracking depth-first walk that samples
//!   the next cell with weight `priority^alpha`, seeded per genome.
//! - [`MaxPriorityWalkDecoder`]: the same walk, always taking the highest
//!   priority neighbor. Fully deterministic.
//!
//! Decoders never fail. A route that reaches the goal costs its summed real
//! grid weight; anything else scores a penalty above
//! [`Grid::cost_ceiling`], so any successful route beats any failure.

mod shortest_path;
mod walk;

pub use shortest_path::{ShortestPathDecoder, optimal_route};
pub use walk::{MaxPriorityWalkDecoder, StochasticWalkDecoder};

use crate::compute::DeadEndRegistry;
use crate::compute::evolution::Genome;
use crate::schema::{DecoderKind, Grid, Position};

/// Floor applied to priorities before they are used as divisors or
/// sampling weights.
pub const PRIORITY_FLOOR: f64 = 1e-4;

/// A decoded route and its score.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Cells from the start to the last cell reached.
    pub path: Vec<Position>,
    /// Real route cost when the goal was reached, a penalty otherwise.
    pub cost: f64,
    /// Whether `path` ends at the goal.
    pub reached_goal: bool,
}

/// A genome-to-path search policy.
pub trait Decoder: Send + Sync {
    /// Decode `genome` on `grid`. May add marks to `registry`; never touches
    /// the genome.
    fn decode(&self, grid: &Grid, genome: &Genome, registry: &DeadEndRegistry) -> Decoded;

    /// Short policy name for logs.
    fn name(&self) -> &'static str;

    /// Whether the policy honours genome block bitmaps. Junction blocking
    /// during mutation is pointless otherwise.
    fn uses_blocks(&self) -> bool {
        true
    }
}

/// Instantiate the decoder selected by configuration.
pub fn build_decoder(kind: DecoderKind) -> Box<dyn Decoder> {
    match kind {
        DecoderKind::ShortestPath { alpha, heuristic } => {
            Box::new(ShortestPathDecoder { alpha, heuristic })
        }
        DecoderKind::StochasticWalk { alpha } => Box::new(StochasticWalkDecoder { alpha }),
        DecoderKind::MaxPriorityWalk => Box::new(MaxPriorityWalkDecoder),
    }
}

/// Outcomes every policy shares: a start or goal that is not open scores as
/// a fully trapped walk, and a start that is the goal is a free route.
fn degenerate(grid: &Grid) -> Option<Decoded> {
    if !grid.is_open(grid.start()) || !grid.is_open(grid.goal()) {
        return Some(Decoded {
            path: Vec::new(),
            cost: 2.0 * grid.base_penalty(),
            reached_goal: false,
        });
    }
    if grid.start() == grid.goal() {
        return Some(Decoded {
            path: vec![grid.start()],
            cost: grid.weight(grid.start()) as f64,
            reached_goal: true,
        });
    }
    None
}

/// Summed real weight of a path.
fn real_cost(grid: &Grid, path: &[Position]) -> f64 {
    path.iter().map(|p| grid.weight(*p) as f64).sum()
}
