//! Generational search over priority genomes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use crate::compute::DeadEndRegistry;
use crate::compute::decoder::{Decoder, build_decoder};
use crate::schema::{
    EvolutionConfig, EvolutionHistory, EvolutionPhase, EvolutionProgress, EvolutionResult,
    EvolutionStats, Grid, MutationConfig, MutationMode, Position, StopReason,
};

use super::adaptive::StagnationTracker;
use super::genome::{Genome, GenomeRng};
use super::population::Population;

/// Evolution engine bound to one grid.
///
/// The engine owns the dead-end registry for its grid. Marks persist across
/// generations of a run and are cleared when a new run starts or on
/// [`EvolutionEngine::reset`].
pub struct EvolutionEngine {
    config: EvolutionConfig,
    grid: Arc<Grid>,
    decoder: Box<dyn Decoder>,
    registry: Arc<DeadEndRegistry>,
    rng: GenomeRng,
    mutation_rate: f64,
    tracker: StagnationTracker,
    history: EvolutionHistory,
    champion: Option<Genome>,
    seed_path: Option<Vec<Position>>,
    generation: usize,
    evaluations: u64,
    phase: EvolutionPhase,
    next_id: Arc<AtomicU64>,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create a new evolution engine.
    pub fn new(grid: Arc<Grid>, config: EvolutionConfig) -> Self {
        let seed = config.random_seed.unwrap_or_else(rand::random);
        let rng = GenomeRng::new(seed);
        let decoder = build_decoder(config.decoder);
        let registry = Arc::new(DeadEndRegistry::new(&grid));
        let tracker = StagnationTracker::new(config.adaptive.clone(), config.genetic.mutation_rate);

        Self {
            mutation_rate: config.genetic.mutation_rate,
            config,
            grid,
            decoder,
            registry,
            rng,
            tracker,
            history: EvolutionHistory::default(),
            champion: None,
            seed_path: None,
            generation: 0,
            evaluations: 0,
            phase: EvolutionPhase::Idle,
            next_id: Arc::new(AtomicU64::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Route used to bias part of the initial population in [`run`](Self::run).
    pub fn with_seed_path(mut self, path: Vec<Position>) -> Self {
        self.seed_path = Some(path);
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Dead-end marks shared by every decode on this grid.
    pub fn registry(&self) -> &DeadEndRegistry {
        &self.registry
    }

    pub fn decoder_name(&self) -> &'static str {
        self.decoder.name()
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn phase(&self) -> EvolutionPhase {
        self.phase.clone()
    }

    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate
    }

    /// Per-gene mutation probability used by subsequent [`evolve`](Self::evolve) calls.
    pub fn set_mutation_rate(&mut self, rate: f64) {
        self.mutation_rate = rate.clamp(0.0, 1.0);
    }

    /// Forget all run state (dead-end marks, generation counter, history and
    /// any mutation-rate boost) and clear a pending cancellation.
    pub fn reset(&mut self) {
        self.clear_run_state();
        self.phase = EvolutionPhase::Idle;
        self.cancelled.store(false, Ordering::Relaxed);
    }

    fn clear_run_state(&mut self) {
        self.registry.reset();
        self.generation = 0;
        self.evaluations = 0;
        self.mutation_rate = self.tracker.default_rate();
        self.tracker.reset();
        self.history = EvolutionHistory::default();
        self.champion = None;
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Build and decode the initial population. With a seed path, up to
    /// `seeded_individuals` genomes are biased toward it.
    pub fn init_population(&mut self, seed_path: Option<&[Position]>) -> Population {
        self.phase = EvolutionPhase::Initializing;
        self.generation = 0;

        let size = self.config.population.size;
        let seeded = seed_path.map_or(0, |_| self.config.population.seeded_individuals.min(size));

        let mut genomes = Vec::with_capacity(size);
        for i in 0..size {
            let mut genome = match seed_path {
                Some(path) if i < seeded => self.rng.seeded_genome(&self.grid, path),
                _ => self.rng.random_genome(self.grid.len()),
            };
            genome.id = self.next_id();
            genomes.push(genome);
        }

        let mut population = Population::new(genomes);
        self.evaluations += population.resolve(&*self.decoder, &self.grid, &self.registry) as u64;
        population.sort_by_fitness();

        log::info!(
            "Initialized {} genomes ({} seeded), best cost {:.2}",
            population.len(),
            seeded,
            population.best().map_or(f64::INFINITY, Genome::cost)
        );
        population
    }

    /// Breed the next generation.
    ///
    /// Elites (at least the best genome) are copied unchanged, fresh random
    /// genomes fill a fixed share, and the rest are tournament-selected
    /// parents crossed over (or cloned) and mutated. Every new genome is
    /// decoded before returning, so the result is fully resolved and sorted
    /// cheapest first.
    pub fn evolve(&mut self, population: Population, mode: MutationMode) -> Population {
        if population.is_empty() {
            return population;
        }
        self.phase = EvolutionPhase::Evolving;

        let mut population = population;
        self.evaluations += population.resolve(&*self.decoder, &self.grid, &self.registry) as u64;
        population.sort_by_fitness();

        let size = population.len();
        let elites = self.config.genetic.elitism.clamp(1, size);
        let fresh = ((size as f64 * self.config.population.fresh_blood_ratio) as usize)
            .min(size - elites);
        let bred = size - elites - fresh;
        let next_generation = self.generation + 1;

        let mutation = MutationConfig {
            mode,
            ..self.config.mutation.clone()
        };
        let uses_blocks = self.decoder.uses_blocks();
        let tournament = self.config.genetic.tournament_size;

        let mut next = Vec::with_capacity(size);
        next.extend(population.iter().take(elites).cloned());

        for _ in 0..bred {
            let idx1 = population.tournament(tournament, &mut self.rng);
            let idx2 = population.tournament(tournament, &mut self.rng);
            let parent1 = &population.genomes()[idx1];
            let parent2 = &population.genomes()[idx2];

            let mut child = if self.rng.chance(self.config.genetic.crossover_rate) {
                self.rng.crossover(parent1, parent2)
            } else {
                let mut clone = parent1.clone();
                clone.parents = vec![parent1.id];
                clone
            };

            let parent_path = uses_blocks.then(|| parent1.path());
            self.rng.mutate(
                &mut child,
                self.mutation_rate,
                &mutation,
                parent_path,
                &self.grid,
                &self.registry,
            );

            child.id = self.next_id();
            child.generation = next_generation;
            next.push(child);
        }

        for _ in 0..fresh {
            let mut genome = self.rng.random_genome(self.grid.len());
            genome.id = self.next_id();
            genome.generation = next_generation;
            next.push(genome);
        }

        let mut next = Population::new(next);
        self.evaluations += next.resolve(&*self.decoder, &self.grid, &self.registry) as u64;
        next.sort_by_fitness();
        self.generation = next_generation;

        log::debug!(
            "Generation {}: best {:.2}, avg {:.2}, {} elites, {} fresh, {} dead ends",
            self.generation,
            next.best().map_or(f64::INFINITY, Genome::cost),
            next.average_cost(),
            elites,
            fresh,
            self.registry.count()
        );
        next
    }

    /// Apply the stagnation policy and record history for a ranked population.
    fn record(&mut self, population: &Population) {
        let best = population.best();
        let generation_best = best.map_or(f64::INFINITY, Genome::cost);

        if let Some(rate) = self.tracker.observe(generation_best) {
            if self.tracker.is_boosted() {
                log::warn!(
                    "No improvement for {} generations, boosting mutation rate to {}",
                    self.tracker.stagnation_count(),
                    rate
                );
            } else {
                log::info!("Improvement at generation {}, mutation rate back to {}", self.generation, rate);
            }
            self.set_mutation_rate(rate);
        }

        if let Some(best) = best
            && self.champion.as_ref().is_none_or(|c| best.cost() < c.cost())
        {
            self.champion = Some(best.clone());
        }

        self.history.best_fitness.push(generation_best);
        self.history.avg_fitness.push(population.average_cost());
        self.history.mutation_rate.push(self.mutation_rate);
        self.history.dead_ends.push(self.registry.count());
    }

    /// Get current progress.
    pub fn progress(&self, population: &Population) -> EvolutionProgress {
        EvolutionProgress {
            generation: self.generation,
            total_generations: self.config.population.max_generations,
            best_fitness: self.tracker.best(),
            avg_fitness: population.average_cost(),
            generation_best: population.best().map_or(f64::INFINITY, Genome::cost),
            stagnation_count: self.tracker.stagnation_count(),
            mutation_rate: self.mutation_rate,
            boosted: self.tracker.is_boosted(),
            dead_ends: self.registry.count(),
            best_candidate: self.champion.as_ref().map(|g| g.snapshot(&self.grid)),
            phase: self.phase.clone(),
        }
    }

    /// Check if evolution should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if self.generation >= self.config.population.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(target) = self.config.population.target_cost
            && self.tracker.best() <= target
        {
            return Some(StopReason::TargetReached);
        }

        if let Some(limit) = self.config.population.stagnation_limit
            && self.tracker.stagnation_count() >= limit
        {
            return Some(StopReason::Stagnation);
        }

        None
    }

    /// Run evolution with progress callback.
    ///
    /// Every run starts from scratch: earlier history, champion, stagnation
    /// state and dead-end marks are dropped. A cancellation requested before
    /// the call still applies.
    pub fn run_with_callback<F>(&mut self, callback: F) -> EvolutionResult
    where
        F: Fn(&EvolutionProgress),
    {
        let start_time = Instant::now();
        self.clear_run_state();
        log::info!(
            "Evolving {} genomes on a {}x{} grid with the {} decoder",
            self.config.population.size,
            self.grid.rows(),
            self.grid.cols(),
            self.decoder.name()
        );

        let seed_path = self.seed_path.take();
        let mut population = self.init_population(seed_path.as_deref());
        self.seed_path = seed_path;
        self.record(&population);
        callback(&self.progress(&population));

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            population = self.evolve(population, self.config.mutation.mode);
            self.record(&population);
            callback(&self.progress(&population));
        };

        self.phase = EvolutionPhase::Terminated;
        let elapsed = start_time.elapsed().as_secs_f64();

        let best = self
            .champion
            .as_ref()
            .map(|g| g.snapshot(&self.grid))
            .unwrap_or_default();

        log::info!(
            "Stopped after {} generations ({:?}): best cost {:.2}, {} dead ends",
            self.generation,
            stop_reason,
            best.fitness,
            self.registry.count()
        );

        EvolutionResult {
            best,
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                best_fitness: self.tracker.best(),
                final_avg_fitness: population.average_cost(),
                dead_ends: self.registry.count(),
                elapsed_seconds: elapsed,
                evaluations_per_second: if elapsed > 0.0 {
                    self.evaluations as f64 / elapsed
                } else {
                    0.0
                },
                stop_reason,
            },
            history: self.history.clone(),
        }
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> EvolutionResult {
        self.run_with_callback(|_| {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::decoder::optimal_route;
    use crate::schema::{DecoderKind, PopulationConfig};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const CORRIDOR: &str = "\
# # # # #
# S 1 # #
# # 1 # #
# # 1 G #
# # # # #
";

    const ROOM: &str = "\
S 3 3 3 3
5 5 5 5 3
5 5 5 5 3
5 5 5 5 G
";

    fn maze(seed: u64, size: usize) -> Arc<Grid> {
        let mut rng = StdRng::seed_from_u64(seed);
        Arc::new(Grid::generate_solvable(size, size, 0.3, 9, &mut rng).unwrap())
    }

    fn small_config(size: usize, generations: usize) -> EvolutionConfig {
        EvolutionConfig {
            population: PopulationConfig {
                size,
                max_generations: generations,
                ..Default::default()
            },
            ..EvolutionConfig::new(size, 0.05, 0.9, 2)
        }
        .with_seed(17)
    }

    #[test]
    fn test_evolution_engine_creation() {
        let mut engine = EvolutionEngine::new(maze(1, 10), small_config(12, 5));
        assert_eq!(engine.phase(), EvolutionPhase::Idle);

        let population = engine.init_population(None);
        assert_eq!(population.len(), 12);
        assert!(population.iter().all(Genome::is_resolved));
        assert_eq!(engine.phase(), EvolutionPhase::Initializing);
    }

    #[test]
    fn test_seeded_init_reproduces_seed_route() {
        let grid: Arc<Grid> = Arc::new(ROOM.parse().unwrap());
        let route: Vec<Position> = [(0, 0), (0, 1), (0, 2), (0, 3), (0, 4), (1, 4), (2, 4), (3, 4)]
            .map(|(r, c)| Position::new(r, c))
            .to_vec();
        let route_cost = grid.path_cost(&route).unwrap();
        assert_eq!(route_cost, 18.0);

        for decoder in [
            DecoderKind::MaxPriorityWalk,
            DecoderKind::stochastic_walk(),
            DecoderKind::shortest_path(),
        ] {
            let config = small_config(10, 5).with_decoder(decoder);
            let mut engine = EvolutionEngine::new(Arc::clone(&grid), config);
            let population = engine.init_population(Some(&route));

            assert!(
                population.iter().any(|g| g.fitness() == Some(route_cost)),
                "{:?} lost the seed route",
                decoder
            );
        }
    }

    #[test]
    fn test_seeded_init_follows_optimal_route_on_mazes() {
        for seed in 0..12 {
            let grid = maze(100 + seed, 20);
            let route = optimal_route(&grid).unwrap();

            for decoder in [
                DecoderKind::MaxPriorityWalk,
                DecoderKind::stochastic_walk(),
                DecoderKind::shortest_path(),
            ] {
                let config = small_config(30, 5).with_decoder(decoder).with_seed(seed);
                let mut engine = EvolutionEngine::new(Arc::clone(&grid), config);
                let population = engine.init_population(Some(&route.path));

                assert!(
                    population
                        .iter()
                        .any(|g| g.fitness() == Some(route.cost) && g.path() == route.path),
                    "maze {} with {:?} lost the seed route",
                    seed,
                    decoder
                );
            }
        }
    }

    #[test]
    fn test_elitism_never_regresses() {
        for decoder in [
            DecoderKind::MaxPriorityWalk,
            DecoderKind::stochastic_walk(),
            DecoderKind::shortest_path(),
        ] {
            let config = small_config(20, 10).with_decoder(decoder);
            let mut engine = EvolutionEngine::new(maze(5, 12), config);
            let mut population = engine.init_population(None);
            let mut best = population.best().map(Genome::cost).unwrap();

            for _ in 0..8 {
                population = engine.evolve(population, MutationMode::Hybrid);
                let next = population.best().map(Genome::cost).unwrap();
                assert!(next <= best, "{:?}: {} regressed to {}", decoder, best, next);
                best = next;
            }
        }
    }

    #[test]
    fn test_corridor_finds_only_route() {
        let grid: Arc<Grid> = Arc::new(CORRIDOR.parse().unwrap());
        let optimum = optimal_route(&grid).unwrap().cost;

        for decoder in [
            DecoderKind::MaxPriorityWalk,
            DecoderKind::stochastic_walk(),
            DecoderKind::shortest_path(),
        ] {
            let mut engine = EvolutionEngine::new(Arc::clone(&grid), small_config(8, 3).with_decoder(decoder));
            let result = engine.run();
            assert_eq!(result.best.fitness, optimum);
            assert!(result.best.reached_goal);
        }
    }

    #[test]
    fn test_unreachable_goal_degrades_to_penalties() {
        let grid: Arc<Grid> = Arc::new(
            "# # # # # #\n# S 4 # 1 #\n# 7 2 # 1 #\n# # # # G #\n# # # # # #\n"
                .parse()
                .unwrap(),
        );
        let mut engine = EvolutionEngine::new(Arc::clone(&grid), small_config(10, 4));
        let result = engine.run();

        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        assert!(!result.best.reached_goal);
        assert!(result.best.fitness > grid.cost_ceiling());
        assert!(!engine.registry().is_dead_end(grid.start()));
        assert!(!engine.registry().is_dead_end(grid.goal()));
    }

    #[test]
    fn test_shortest_path_decoder_skips_junction_blocks() {
        let mut config = small_config(16, 5).with_decoder(DecoderKind::shortest_path());
        config.mutation.junction_probability = 1.0;
        let mut engine = EvolutionEngine::new(maze(8, 10), config);

        let mut population = engine.init_population(None);
        for _ in 0..4 {
            population = engine.evolve(population, MutationMode::Random);
        }
        assert!(population.iter().all(|g| g.blocked().iter().all(|b| !b)));
    }

    #[test]
    fn test_run_records_history() {
        let mut engine = EvolutionEngine::new(maze(2, 10), small_config(10, 6));
        let result = engine.run();

        assert_eq!(result.stats.generations, 6);
        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        assert_eq!(result.history.best_fitness.len(), 7);
        assert_eq!(result.history.mutation_rate.len(), 7);
        assert!(result.stats.total_evaluations >= 10);
        assert_eq!(engine.phase(), EvolutionPhase::Terminated);
        assert_eq!(result.stats.best_fitness, result.best.fitness);
    }

    #[test]
    fn test_target_cost_stops_early() {
        let grid: Arc<Grid> = Arc::new(CORRIDOR.parse().unwrap());
        let mut config = small_config(6, 100);
        config.population.target_cost = Some(3.0);

        let result = EvolutionEngine::new(grid, config).run();
        assert_eq!(result.stats.stop_reason, StopReason::TargetReached);
        assert_eq!(result.stats.generations, 0);
    }

    #[test]
    fn test_stagnation_limit_stops() {
        let grid: Arc<Grid> = Arc::new(CORRIDOR.parse().unwrap());
        let mut config = small_config(6, 100);
        config.population.stagnation_limit = Some(3);

        let result = EvolutionEngine::new(grid, config).run();
        assert_eq!(result.stats.stop_reason, StopReason::Stagnation);
        assert_eq!(result.stats.generations, 3);
    }

    #[test]
    fn test_stagnation_boosts_mutation_rate() {
        let grid: Arc<Grid> = Arc::new(CORRIDOR.parse().unwrap());
        let mut config = small_config(6, 5);
        config.adaptive.patience = 2;

        let mut engine = EvolutionEngine::new(grid, config);
        let result = engine.run();
        assert_eq!(engine.mutation_rate(), 0.4);
        assert_eq!(result.history.mutation_rate.first(), Some(&0.05));
        assert_eq!(result.history.mutation_rate.last(), Some(&0.4));
    }

    #[test]
    fn test_cancellation() {
        let mut engine = EvolutionEngine::new(maze(3, 10), small_config(5, 100));
        let cancel = engine.cancel_handle();

        // Cancel immediately
        cancel.store(true, Ordering::Relaxed);

        let result = engine.run();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 0);
    }

    #[test]
    fn test_reset_restores_run_state() {
        let mut engine = EvolutionEngine::new(maze(4, 10), small_config(8, 3));
        engine.run();
        engine.set_mutation_rate(0.3);
        engine.registry().mark_dead_end(Position::new(1, 0));

        engine.reset();
        assert_eq!(engine.registry().count(), 0);
        assert_eq!(engine.generation(), 0);
        assert_eq!(engine.mutation_rate(), 0.05);
        assert_eq!(engine.phase(), EvolutionPhase::Idle);
    }

    #[test]
    fn test_second_run_starts_fresh() {
        let mut config = small_config(10, 6);
        config.population.stagnation_limit = Some(4);
        let mut engine = EvolutionEngine::new(maze(6, 10), config);

        for _ in 0..2 {
            let result = engine.run();
            let generations = result.stats.generations;
            match result.stats.stop_reason {
                StopReason::Stagnation => assert!(generations >= 4),
                StopReason::MaxGenerations => assert_eq!(generations, 6),
                other => panic!("unexpected stop {:?}", other),
            }
            assert_eq!(result.history.best_fitness.len(), generations + 1);
            assert_eq!(result.history.dead_ends.len(), generations + 1);
            assert!(result.stats.total_evaluations <= (10 * (generations + 1)) as u64);
            assert_eq!(result.stats.best_fitness, result.best.fitness);
        }
    }

    #[test]
    fn test_zero_elitism_still_keeps_best() {
        let mut config = small_config(20, 10);
        config.genetic.elitism = 0;
        let mut engine = EvolutionEngine::new(maze(9, 12), config);

        let mut population = engine.init_population(None);
        let mut best = population.best().map(Genome::cost).unwrap();
        for _ in 0..12 {
            population = engine.evolve(population, MutationMode::Random);
            let next = population.best().map(Genome::cost).unwrap();
            assert!(next <= best, "{} regressed to {}", best, next);
            best = next;
        }
    }

    #[test]
    fn test_set_mutation_rate_clamps() {
        let mut engine = EvolutionEngine::new(maze(4, 6), small_config(4, 1));
        engine.set_mutation_rate(3.0);
        assert_eq!(engine.mutation_rate(), 1.0);
        engine.set_mutation_rate(-1.0);
        assert_eq!(engine.mutation_rate(), 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_population_size_is_invariant(
            seed in any::<u64>(),
            size in 2usize..24,
            elitism in 0usize..3,
            fresh in 0.0f64..0.5,
        ) {
            let mut config = small_config(size, 3).with_seed(seed);
            config.genetic.elitism = elitism.min(size - 1);
            config.population.fresh_blood_ratio = fresh;

            let mut engine = EvolutionEngine::new(maze(seed, 7), config);
            let mut population = engine.init_population(None);
            for _ in 0..3 {
                population = engine.evolve(population, MutationMode::Flip);
                prop_assert_eq!(population.len(), size);
                prop_assert!(population.iter().all(Genome::is_resolved));
            }
        }
    }
}
