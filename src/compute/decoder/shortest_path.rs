//! Priority-discounted best-first search, plus the exact optimum used to
//! measure how far evolution is from the best possible route.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::{Decoded, Decoder, PRIORITY_FLOOR, degenerate};
use crate::compute::DeadEndRegistry;
use crate::compute::evolution::Genome;
use crate::schema::{Grid, Position};

/// Explored-node budget per grid cell.
const NODES_PER_CELL: usize = 20;

/// Penalty added per explored node when the goal is never reached.
const NODE_PENALTY: f64 = 0.1;

/// Smallest discount divisor. Keeps step costs finite for any alpha, even
/// once `floor^alpha` underflows.
const MIN_DISCOUNT: f64 = 1e-200;

/// Virtual cost of stepping into a cell of `weight` with `priority`.
fn discounted(weight: f64, priority: f64, alpha: f64) -> f64 {
    let discount = priority.max(PRIORITY_FLOOR).powf(alpha).max(MIN_DISCOUNT);
    weight / discount
}

/// Best-first search where stepping into a cell costs
/// `weight / max(priority, floor)^alpha`. High priority makes a cell cheap,
/// so the genome steers which route is found; the reported cost is always
/// the real summed weight of that route.
///
/// Cells in the dead-end registry are pruned. Block bitmaps are ignored.
#[derive(Debug, Clone, Copy)]
pub struct ShortestPathDecoder {
    pub alpha: f64,
    /// Order the frontier by virtual cost plus Manhattan distance to the goal.
    pub heuristic: bool,
}

impl Decoder for ShortestPathDecoder {
    fn decode(&self, grid: &Grid, genome: &Genome, registry: &DeadEndRegistry) -> Decoded {
        if let Some(decoded) = degenerate(grid) {
            return decoded;
        }

        let goal = grid.goal();
        let outcome = best_first(
            grid,
            grid.len() * NODES_PER_CELL,
            |index, pos| {
                if registry.is_dead_end_index(index) {
                    return None;
                }
                Some(discounted(grid.weight(pos) as f64, genome.priority(index), self.alpha))
            },
            |pos| {
                if self.heuristic {
                    pos.manhattan(goal) as f64
                } else {
                    0.0
                }
            },
        );

        match outcome {
            Search::Reached { path, cost } => Decoded {
                path,
                cost,
                reached_goal: true,
            },
            Search::Exhausted { closest, explored } => Decoded {
                path: closest,
                cost: grid.base_penalty() + explored as f64 * NODE_PENALTY,
                reached_goal: false,
            },
        }
    }

    fn name(&self) -> &'static str {
        "shortest-path"
    }

    fn uses_blocks(&self) -> bool {
        false
    }
}

/// Exact minimum-cost route by A* over real weights, or `None` when the goal
/// is unreachable (or start/goal are not open).
///
/// The heuristic is the Manhattan distance times the smallest weight any
/// non-goal open cell carries, which never overestimates.
pub fn optimal_route(grid: &Grid) -> Option<Decoded> {
    if let Some(decoded) = degenerate(grid) {
        return decoded.reached_goal.then_some(decoded);
    }

    let goal = grid.goal();
    let min_weight = (0..grid.len())
        .map(|i| grid.position(i))
        .filter(|p| *p != goal && grid.is_open(*p))
        .map(|p| grid.weight(p))
        .min()
        .unwrap_or(0) as f64;

    let outcome = best_first(
        grid,
        usize::MAX,
        |_, pos| Some(grid.weight(pos) as f64),
        |pos| pos.manhattan(goal).saturating_sub(1) as f64 * min_weight,
    );

    match outcome {
        Search::Reached { path, cost } => Some(Decoded {
            path,
            cost,
            reached_goal: true,
        }),
        Search::Exhausted { .. } => None,
    }
}

enum Search {
    Reached { path: Vec<Position>, cost: f64 },
    Exhausted { closest: Vec<Position>, explored: usize },
}

/// Arena node; `parent` indexes into the same arena.
#[derive(Clone, Copy)]
struct Node {
    pos: Position,
    /// Accumulated search cost (what the frontier is ordered by).
    g: f64,
    /// Accumulated real weight.
    real: f64,
    parent: Option<usize>,
}

/// Frontier entry. Ordered so that `BinaryHeap` pops the lowest key first,
/// older entries before newer ones on ties.
#[derive(Clone, Copy)]
struct Key {
    f: f64,
    seq: u64,
    node: usize,
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Best-first search from the grid start to its goal.
///
/// `step` returns the search cost of entering an open cell, or `None` to
/// prune it. `heuristic` is added to frontier keys only. Stale frontier
/// entries are skipped lazily.
fn best_first<S, H>(grid: &Grid, budget: usize, step: S, heuristic: H) -> Search
where
    S: Fn(usize, Position) -> Option<f64>,
    H: Fn(Position) -> f64,
{
    let start = grid.start();
    let goal = grid.goal();

    let mut best_g = vec![f64::INFINITY; grid.len()];
    let mut arena = vec![Node {
        pos: start,
        g: 0.0,
        real: grid.weight(start) as f64,
        parent: None,
    }];
    let mut frontier = BinaryHeap::new();
    let mut seq = 0u64;

    if let Some(i) = grid.index(start) {
        best_g[i] = 0.0;
    }
    frontier.push(Key {
        f: heuristic(start),
        seq,
        node: 0,
    });

    let mut explored = 0usize;
    let mut closest = (start.manhattan(goal), 0usize);

    while let Some(Key { node, .. }) = frontier.pop() {
        let current = arena[node];
        let Some(current_index) = grid.index(current.pos) else {
            continue;
        };
        if current.g > best_g[current_index] {
            continue;
        }

        if current.pos == goal {
            return Search::Reached {
                path: trace(&arena, node),
                cost: current.real,
            };
        }

        explored += 1;
        if explored > budget {
            break;
        }

        let distance = current.pos.manhattan(goal);
        if distance < closest.0 {
            closest = (distance, node);
        }

        for next in grid.open_neighbors(current.pos) {
            let Some(index) = grid.index(next) else {
                continue;
            };
            let Some(cost) = step(index, next) else {
                continue;
            };
            let g = current.g + cost;
            if g < best_g[index] {
                best_g[index] = g;
                arena.push(Node {
                    pos: next,
                    g,
                    real: current.real + grid.weight(next) as f64,
                    parent: Some(node),
                });
                seq += 1;
                frontier.push(Key {
                    f: g + heuristic(next),
                    seq,
                    node: arena.len() - 1,
                });
            }
        }
    }

    Search::Exhausted {
        closest: trace(&arena, closest.1),
        explored,
    }
}

fn trace(arena: &[Node], mut node: usize) -> Vec<Position> {
    let mut path = vec![arena[node].pos];
    while let Some(parent) = arena[node].parent {
        path.push(arena[parent].pos);
        node = parent;
    }
    path.reverse();
    path
}
