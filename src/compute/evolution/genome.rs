//! Priority genomes and the random operators that create and vary them.
//!
//! A genome holds one priority in `[0, 1]` per grid cell plus a personal
//! block bitmap, and caches the fitness and path of its last decode. Any
//! gene change clears that cache.

use rand::prelude::*;
use rand_distr::StandardNormal;

use crate::compute::DeadEndRegistry;
use crate::compute::decoder::{Decoded, PRIORITY_FLOOR};
use crate::schema::{CandidateSnapshot, Grid, MutationConfig, MutationMode, Position};

/// Chance that a hybrid-mode gene flips instead of being nudged.
const HYBRID_FLIP_PROBABILITY: f64 = 0.3;

/// One candidate solution.
#[derive(Debug, Clone)]
pub struct Genome {
    priorities: Vec<f64>,
    blocked: Vec<bool>,
    /// Seeds the stochastic walk, so decoding is repeatable per genome.
    seed: u64,
    fitness: Option<f64>,
    path: Vec<Position>,
    reached_goal: bool,
    /// Unique identifier.
    pub id: u64,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
}

impl Genome {
    /// Genome with the given priorities (clamped to `[0, 1]`) and nothing
    /// blocked.
    pub fn with_priorities(priorities: Vec<f64>, seed: u64) -> Self {
        let blocked = vec![false; priorities.len()];
        Self {
            priorities: priorities.into_iter().map(|p| p.clamp(0.0, 1.0)).collect(),
            blocked,
            seed,
            fitness: None,
            path: Vec::new(),
            reached_goal: false,
            id: 0,
            generation: 0,
            parents: Vec::new(),
        }
    }

    /// Number of genes (grid cells).
    pub fn len(&self) -> usize {
        self.priorities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.priorities.is_empty()
    }

    pub fn priorities(&self) -> &[f64] {
        &self.priorities
    }

    /// Priority of the cell at a row-major index; 0 past the end.
    #[inline]
    pub fn priority(&self, index: usize) -> f64 {
        self.priorities.get(index).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn is_blocked(&self, index: usize) -> bool {
        self.blocked.get(index).copied().unwrap_or(false)
    }

    pub fn blocked(&self) -> &[bool] {
        &self.blocked
    }

    /// Blocked cells as positions, in row-major order.
    pub fn blocked_positions(&self, grid: &Grid) -> Vec<Position> {
        self.blocked
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(|(i, _)| grid.position(i))
            .collect()
    }

    /// Block `pos` for this genome. Start, goal, out-of-bounds and already
    /// blocked cells are refused. Returns true if the bitmap changed.
    pub fn block(&mut self, grid: &Grid, pos: Position) -> bool {
        if pos == grid.start() || pos == grid.goal() {
            return false;
        }
        let Some(index) = grid.index(pos) else {
            return false;
        };
        match self.blocked.get_mut(index) {
            Some(cell) if !*cell => {
                *cell = true;
                self.invalidate();
                true
            }
            _ => false,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Cached cost, `None` until decoded.
    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    /// Cost used for ranking: unresolved genomes rank last.
    pub fn cost(&self) -> f64 {
        self.fitness.unwrap_or(f64::INFINITY)
    }

    /// Cached path of the last decode; empty when unresolved.
    pub fn path(&self) -> &[Position] {
        &self.path
    }

    pub fn reached_goal(&self) -> bool {
        self.reached_goal
    }

    pub fn is_resolved(&self) -> bool {
        self.fitness.is_some()
    }

    /// Store a decode result.
    pub fn resolve(&mut self, decoded: Decoded) {
        self.fitness = Some(decoded.cost);
        self.path = decoded.path;
        self.reached_goal = decoded.reached_goal;
    }

    /// Clear the cached fitness and path.
    pub fn invalidate(&mut self) {
        self.fitness = None;
        self.path.clear();
        self.reached_goal = false;
    }

    /// Convert to snapshot for reporting.
    pub fn snapshot(&self, grid: &Grid) -> CandidateSnapshot {
        CandidateSnapshot {
            id: self.id,
            fitness: self.cost(),
            reached_goal: self.reached_goal,
            path: self.path.clone(),
            blocked: self.blocked_positions(grid),
            generation: self.generation,
            parents: self.parents.clone(),
        }
    }
}

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform priorities, nothing blocked, fresh seed.
    pub fn random_genome(&mut self, cells: usize) -> Genome {
        let priorities = (0..cells).map(|_| self.rng.r#gen::<f64>()).collect();
        Genome::with_priorities(priorities, self.next_seed())
    }

    /// Genome biased toward `seed_path`: path cells get priorities in
    /// `[0.8, 1.0]`, everything else `[0, 0.2)`.
    ///
    /// Open cells bordering the path are fenced off with priority 0 and a
    /// block, so every decoder follows the path exactly. A path with
    /// shortcuts (non-consecutive cells that touch) may decode to the
    /// shortcut instead.
    pub fn seeded_genome(&mut self, grid: &Grid, seed_path: &[Position]) -> Genome {
        let mut priorities: Vec<f64> = (0..grid.len())
            .map(|_| self.rng.gen_range(0.0..0.2))
            .collect();
        let mut on_path = vec![false; grid.len()];
        for pos in seed_path {
            if let Some(i) = grid.index(*pos) {
                priorities[i] = self.rng.gen_range(0.8..=1.0);
                on_path[i] = true;
            }
        }

        let fence: Vec<Position> = seed_path
            .iter()
            .flat_map(|pos| grid.open_neighbors(*pos))
            .filter(|n| grid.index(*n).is_some_and(|i| !on_path[i]))
            .collect();
        for pos in &fence {
            if let Some(i) = grid.index(*pos) {
                priorities[i] = 0.0;
            }
        }

        let mut genome = Genome::with_priorities(priorities, self.next_seed());
        for pos in fence {
            genome.block(grid, pos);
        }
        genome
    }

    /// Uniform crossover. Each priority comes from either parent with equal
    /// odds. A cell blocked by both parents stays blocked, by one parent is
    /// blocked half the time, by neither is open. The child gets a fresh seed
    /// and records both parents.
    pub fn crossover(&mut self, parent1: &Genome, parent2: &Genome) -> Genome {
        let priorities = parent1
            .priorities
            .iter()
            .zip(&parent2.priorities)
            .map(|(a, b)| if self.rng.gen_bool(0.5) { *a } else { *b })
            .collect();

        let blocked = parent1
            .blocked
            .iter()
            .zip(&parent2.blocked)
            .map(|(a, b)| match (*a, *b) {
                (true, true) => true,
                (false, false) => false,
                _ => self.rng.gen_bool(0.5),
            })
            .collect();

        Genome {
            priorities,
            blocked,
            seed: self.next_seed(),
            fitness: None,
            path: Vec::new(),
            reached_goal: false,
            id: 0,
            generation: 0,
            parents: vec![parent1.id, parent2.id],
        }
    }

    /// Mutate a genome in place and clear its cached fitness.
    ///
    /// Each priority is reassigned with probability `rate`; each blocked
    /// cell is forgotten with the configured decay probability. When a
    /// long enough `parent_path` is given, junction blocking may also run
    /// along it.
    pub fn mutate(
        &mut self,
        genome: &mut Genome,
        rate: f64,
        config: &MutationConfig,
        parent_path: Option<&[Position]>,
        grid: &Grid,
        registry: &DeadEndRegistry,
    ) {
        for i in 0..genome.priorities.len() {
            if self.rng.r#gen::<f64>() < rate {
                genome.priorities[i] = self.reassign(genome.priorities[i], config);
            }
        }

        for blocked in genome.blocked.iter_mut().filter(|b| **b) {
            if self.rng.r#gen::<f64>() < config.decay_probability {
                *blocked = false;
            }
        }

        if let Some(path) = parent_path
            && path.len() >= config.min_parent_path.max(2)
            && self.rng.r#gen::<f64>() < config.junction_probability
        {
            self.block_junctions(genome, path, config, grid, registry);
        }

        genome.invalidate();
    }

    /// New value for a mutated gene.
    fn reassign(&mut self, value: f64, config: &MutationConfig) -> f64 {
        match config.mode {
            MutationMode::Random => self.rng.r#gen(),
            MutationMode::Flip => self.flip(value),
            MutationMode::Hybrid => {
                if self.rng.r#gen::<f64>() < HYBRID_FLIP_PROBABILITY {
                    self.flip(value)
                } else {
                    let noise: f64 = self.rng.sample(StandardNormal);
                    (value + noise * config.nudge_strength).clamp(PRIORITY_FLOOR, 1.0)
                }
            }
        }
    }

    fn flip(&mut self, value: f64) -> f64 {
        if value > 0.5 {
            self.rng.gen_range(0.0..0.2)
        } else {
            self.rng.gen_range(0.8..1.0)
        }
    }

    /// Block the exit the parent took at up to `max_junction_blocks`
    /// junctions along its path. A junction is a cell with more than two
    /// open neighbors that are not known dead ends.
    fn block_junctions(
        &mut self,
        genome: &mut Genome,
        path: &[Position],
        config: &MutationConfig,
        grid: &Grid,
        registry: &DeadEndRegistry,
    ) {
        let target = self.rng.gen_range(1..=config.max_junction_blocks.max(1));
        let mut placed = 0;

        for _ in 0..config.junction_attempts {
            if placed >= target {
                break;
            }
            let i = self.rng.gen_range(0..path.len() - 1);
            let (cell, exit) = (path[i], path[i + 1]);
            if cell == grid.start() || cell == grid.goal() {
                continue;
            }

            let live_exits = grid
                .open_neighbors(cell)
                .filter(|n| !registry.is_dead_end(*n))
                .count();
            if live_exits > 2 && genome.block(grid, exit) {
                placed += 1;
            }
        }
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.r#gen::<f64>() < p
    }

    /// Uniform index in `0..len`. `len` must be positive.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}
