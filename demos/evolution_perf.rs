//! Quick evolution performance test

use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;

use maze_evolve::{
    EvolutionConfig, EvolutionEngine, optimal_route,
    schema::{DecoderKind, GeneticConfig, Grid, PopulationConfig},
};

fn main() {
    env_logger::init();

    println!("=== Evolution Performance Test ===\n");

    // Test each decoder on growing mazes
    for decoder in [
        DecoderKind::MaxPriorityWalk,
        DecoderKind::stochastic_walk(),
        DecoderKind::shortest_path(),
    ] {
        println!("Decoder: {:?}", decoder);

        for grid_size in [16, 32, 64] {
            let mut rng = StdRng::seed_from_u64(42);
            let grid = match Grid::generate_solvable(grid_size, grid_size, 0.3, 9, &mut rng) {
                Ok(grid) => Arc::new(grid),
                Err(e) => {
                    eprintln!("Error generating maze: {}", e);
                    return;
                }
            };
            let optimum = optimal_route(&grid).map_or(f64::NAN, |r| r.cost);

            let config = EvolutionConfig {
                population: PopulationConfig {
                    size: 40,
                    max_generations: 30,
                    ..Default::default()
                },
                genetic: GeneticConfig {
                    mutation_rate: 0.05,
                    crossover_rate: 0.9,
                    elitism: 2,
                    tournament_size: 3,
                },
                decoder,
                random_seed: Some(42),
                ..Default::default()
            };

            let start = Instant::now();
            let mut engine = EvolutionEngine::new(grid, config);
            let result = engine.run();
            let elapsed = start.elapsed();

            let total_evals = result.stats.total_evaluations;
            let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

            println!("  Grid {}x{}:", grid_size, grid_size);
            println!("    Evaluations:  {}", total_evals);
            println!("    Elapsed:      {:.2}s", elapsed.as_secs_f64());
            println!("    Evals/sec:    {:.1}", evals_per_sec);
            println!("    Best cost:    {:.1} (optimum {:.1})", result.stats.best_fitness, optimum);
            println!("    Dead ends:    {}", result.stats.dead_ends);
        }
        println!();
    }

    println!("=== Scalability Test (fixed 48x48 maze) ===\n");

    // Test different population sizes
    for pop_size in [10, 40, 160] {
        let mut rng = StdRng::seed_from_u64(7);
        let grid = match Grid::generate_solvable(48, 48, 0.3, 9, &mut rng) {
            Ok(grid) => Arc::new(grid),
            Err(e) => {
                eprintln!("Error generating maze: {}", e);
                return;
            }
        };

        let config = EvolutionConfig {
            population: PopulationConfig {
                size: pop_size,
                max_generations: 10,
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        };

        let start = Instant::now();
        let mut engine = EvolutionEngine::new(grid, config);
        let result = engine.run();
        let elapsed = start.elapsed();

        let total_evals = result.stats.total_evaluations;
        println!(
            "Population {}: {} evals in {:.2}s ({:.1} evals/sec)",
            pop_size,
            total_evals,
            elapsed.as_secs_f64(),
            total_evals as f64 / elapsed.as_secs_f64()
        );
    }
}
