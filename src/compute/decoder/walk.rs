//! Backtracking depth-first walks steered by genome priorities.
//!
//! Both walk policies share one scaffold and differ only in how the next
//! cell is chosen among the candidates. A walk never revisits a cell within
//! a decode, skips registry dead ends and cells the genome blocks, and backs
//! up when stuck. Each retreat feeds the dead-end registry.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Decoded, Decoder, PRIORITY_FLOOR, degenerate, real_cost};
use crate::compute::DeadEndRegistry;
use crate::compute::evolution::Genome;
use crate::schema::{Grid, Position};

/// Step budget per grid cell.
const STEPS_PER_CELL: usize = 10;

/// Weight on the squared remaining distance when the step budget runs out.
const DISTANCE_PENALTY: f64 = 2.5;

/// Walk that samples the next cell with probability proportional to
/// `max(priority, floor)^alpha`. The sampler is seeded from the genome, so a
/// given genome always decodes to the same route.
#[derive(Debug, Clone, Copy)]
pub struct StochasticWalkDecoder {
    pub alpha: f64,
}

impl Decoder for StochasticWalkDecoder {
    fn decode(&self, grid: &Grid, genome: &Genome, registry: &DeadEndRegistry) -> Decoded {
        let mut rng = StdRng::seed_from_u64(genome.seed());
        walk(grid, genome, registry, |options| {
            roulette(options, self.alpha, &mut rng)
        })
    }

    fn name(&self) -> &'static str {
        "stochastic-walk"
    }
}

/// Walk that always steps to the highest-priority candidate, the first in
/// neighbor order on ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxPriorityWalkDecoder;

impl Decoder for MaxPriorityWalkDecoder {
    fn decode(&self, grid: &Grid, genome: &Genome, registry: &DeadEndRegistry) -> Decoded {
        walk(grid, genome, registry, highest)
    }

    fn name(&self) -> &'static str {
        "max-priority-walk"
    }
}

/// A candidate next cell and its priority.
type Candidate = (Position, f64);

fn highest(options: &[Candidate]) -> usize {
    let mut best = 0;
    for (i, option) in options.iter().enumerate().skip(1) {
        if option.1 > options[best].1 {
            best = i;
        }
    }
    best
}

fn roulette<R: Rng>(options: &[Candidate], alpha: f64, rng: &mut R) -> usize {
    let weights: Vec<f64> = options
        .iter()
        .map(|(_, p)| p.max(PRIORITY_FLOOR).powf(alpha))
        .collect();
    let total: f64 = weights.iter().sum();

    let target = rng.r#gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if target < cumulative {
            return i;
        }
    }
    options.len() - 1
}

fn walk<F>(grid: &Grid, genome: &Genome, registry: &DeadEndRegistry, mut choose: F) -> Decoded
where
    F: FnMut(&[Candidate]) -> usize,
{
    if let Some(decoded) = degenerate(grid) {
        return decoded;
    }

    let goal = grid.goal();
    let mut visited = vec![false; grid.len()];
    let mut path = vec![grid.start()];
    if let Some(i) = grid.index(grid.start()) {
        visited[i] = true;
    }

    let mut options: Vec<Candidate> = Vec::with_capacity(4);
    let budget = grid.len() * STEPS_PER_CELL;

    for _ in 0..budget {
        let Some(&current) = path.last() else {
            break;
        };
        if current == goal {
            break;
        }

        options.clear();
        for next in grid.open_neighbors(current) {
            let Some(index) = grid.index(next) else {
                continue;
            };
            if visited[index] || registry.is_dead_end_index(index) {
                continue;
            }
            if next != goal && genome.is_blocked(index) {
                continue;
            }
            options.push((next, genome.priority(index)));
        }

        if !options.is_empty() {
            let (next, _) = options[choose(&options)];
            if let Some(index) = grid.index(next) {
                visited[index] = true;
            }
            path.push(next);
        } else if path.len() > 1 {
            if let Some(stuck) = path.pop() {
                registry.record_retreat(grid, stuck);
            }
        } else {
            // Nothing left to try from the start.
            return Decoded {
                path,
                cost: 2.0 * grid.base_penalty(),
                reached_goal: false,
            };
        }
    }

    let end = path.last().copied().unwrap_or(grid.start());
    if end == goal {
        let cost = real_cost(grid, &path);
        return Decoded {
            path,
            cost,
            reached_goal: true,
        };
    }

    let remaining = end.manhattan(goal) as f64;
    log::trace!("walk budget exhausted {} cells from goal", remaining);
    Decoded {
        path,
        cost: grid.base_penalty() + remaining * remaining * DISTANCE_PENALTY,
        reached_goal: false,
    }
}
