//! Maze Evolve - Genetic search for low-cost routes through weighted grids.
//!
//! Candidate solutions are per-cell priority genomes. A decoder turns each
//! genome into a concrete route and scores it by the summed weight of the
//! cells it crosses; an elitist genetic algorithm breeds cheaper routes.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Grid model, configuration and reporting types
//! - `compute`: Dead-end registry, decoders and the evolution engine
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use maze_evolve::{EvolutionConfig, EvolutionEngine, Grid, optimal_route};
//!
//! let grid: Grid = "\
//! S 1 4 1
//! 1 # 2 1
//! 3 1 1 G
//! ".parse().unwrap();
//!
//! let optimum = optimal_route(&grid).map(|r| r.cost);
//!
//! let mut engine = EvolutionEngine::new(Arc::new(grid), EvolutionConfig::default());
//! let result = engine.run();
//!
//! println!("Evolved cost {:.1}, optimum {:?}", result.best.fitness, optimum);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EvolutionEngine, Genome, Population};
pub use compute::{DeadEndRegistry, Decoder, optimal_route};
pub use schema::{DecoderKind, EvolutionConfig, Grid, MutationMode, Position};
