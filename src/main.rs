//! Maze Evolve CLI - Evolve routes through a grid maze file.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use maze_evolve::{
    EvolutionEngine, optimal_route,
    schema::{EvolutionConfig, Grid},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <maze.txt> [config.json] [generations]", args[0]);
        eprintln!("       {} --generate <rows> <cols> [seed]", args[0]);
        eprintln!("       {} --example", args[0]);
        eprintln!();
        eprintln!("Evolve a low-cost route through a weighted grid maze.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  maze.txt     Grid file: weights, '#' or -1 for walls, 'S' start, 'G' goal");
        eprintln!("  config.json  Evolution configuration (default settings if omitted)");
        eprintln!("  generations  Override the configured maximum generations");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--example" => {
            print_example_config();
            return;
        }
        "--generate" => {
            generate(&args[2..]);
            return;
        }
        _ => {}
    }

    let maze_path = PathBuf::from(&args[1]);
    let grid = Grid::load(&maze_path).unwrap_or_else(|e| {
        eprintln!("Error loading maze {}: {}", maze_path.display(), e);
        std::process::exit(1);
    });

    let mut config = match args.get(2) {
        Some(path) => {
            let config_str = fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Error reading config file: {}", e);
                std::process::exit(1);
            });
            serde_json::from_str::<EvolutionConfig>(&config_str).unwrap_or_else(|e| {
                eprintln!("Error parsing config: {}", e);
                std::process::exit(1);
            })
        }
        None => EvolutionConfig::default(),
    };

    if let Some(generations) = args.get(3).and_then(|s| s.parse().ok()) {
        config.population.max_generations = generations;
    }

    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    }

    println!("Maze Evolve");
    println!("===========");
    println!(
        "Grid: {}x{}, start {}, goal {}",
        grid.rows(),
        grid.cols(),
        grid.start(),
        grid.goal()
    );
    println!("Decoder: {:?}", config.decoder);
    println!(
        "Population: {}, generations: {}",
        config.population.size, config.population.max_generations
    );
    println!();

    let optimum = optimal_route(&grid).map(|r| r.cost);
    match optimum {
        Some(cost) => println!("Optimal route cost: {}", cost),
        None => println!("Goal is unreachable; expect penalty scores"),
    }
    println!();

    let grid = Arc::new(grid);
    let report_every = (config.population.max_generations / 10).max(1);
    let mut engine = EvolutionEngine::new(Arc::clone(&grid), config);

    let result = engine.run_with_callback(|progress| {
        if progress.generation % report_every == 0 {
            println!(
                "  Gen {:>5}: best={:.1} avg={:.1} rate={:.2}{} dead_ends={}",
                progress.generation,
                progress.best_fitness,
                progress.avg_fitness,
                progress.mutation_rate,
                if progress.boosted { " (boosted)" } else { "" },
                progress.dead_ends
            );
        }
    });

    let stats = &result.stats;
    println!();
    println!("Stopped: {:?} after {} generations", stats.stop_reason, stats.generations);
    println!(
        "Best cost: {:.1} ({})",
        result.best.fitness,
        if result.best.reached_goal {
            "reached goal"
        } else {
            "goal not reached"
        }
    );
    if let Some(cost) = optimum
        && result.best.reached_goal
        && cost > 0.0
    {
        println!(
            "Optimality gap: {:.2}%",
            (result.best.fitness - cost) / cost * 100.0
        );
    }
    println!("Route length: {} cells", result.best.path.len());
    println!("Dead ends discovered: {}", stats.dead_ends);
    println!(
        "Time: {:.2}s ({:.0} decodes/s)",
        stats.elapsed_seconds, stats.evaluations_per_second
    );
}

fn generate(args: &[String]) {
    let parse = |i: usize, name: &str| -> usize {
        args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
            eprintln!("Missing or invalid {}", name);
            std::process::exit(1);
        })
    };
    let rows = parse(0, "rows");
    let cols = parse(1, "cols");
    let seed: u64 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(rand::random);

    let mut rng = StdRng::seed_from_u64(seed);
    match Grid::generate_solvable(rows, cols, 0.3, 9, &mut rng) {
        Ok(grid) => print!("{}", grid),
        Err(e) => {
            eprintln!("Error generating maze: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_example_config() {
    let config = EvolutionConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
