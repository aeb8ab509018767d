//! Evolutionary search for low-cost grid routes.
//!
//! # Overview
//!
//! The evolutionary search system consists of:
//!
//! - **Genome Operations** (`genome`): Random generation, path seeding,
//!   crossover, and mutation with junction blocking
//! - **Population** (`population`): Ranking, tournament selection, and
//!   parallel fitness resolution
//! - **Adaptive Mutation** (`adaptive`): Mutation-rate boost under stagnation
//! - **Search Engine** (`search`): Elitist generational GA with fresh blood
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use maze_evolve::schema::{DecoderKind, EvolutionConfig, Grid};
//! use maze_evolve::compute::evolution::EvolutionEngine;
//!
//! let grid: Grid = Grid::load("maze.txt").unwrap();
//! let config = EvolutionConfig::new(100, 0.05, 0.9, 2)
//!     .with_decoder(DecoderKind::stochastic_walk());
//!
//! let mut engine = EvolutionEngine::new(Arc::new(grid), config);
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: best cost = {:.1}",
//!         progress.generation, progress.best_fitness);
//! });
//!
//! println!("Best route cost: {:.1}", result.best.fitness);
//! ```

mod adaptive;
mod genome;
mod population;
mod search;

pub use adaptive::StagnationTracker;
pub use genome::{Genome, GenomeRng};
pub use population::Population;
pub use search::EvolutionEngine;
