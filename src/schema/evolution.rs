//! Progress and result types reported by an evolution run.
//!
//! These are plain serializable records consumed by drivers (CLI, UIs) for
//! progress reporting and visualization.

use serde::{Deserialize, Serialize};

use super::Position;

/// Progress update emitted after every generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Current generation number (0 = initial population).
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Best cost seen so far (lower is better).
    pub best_fitness: f64,
    /// Average cost of the current population.
    pub avg_fitness: f64,
    /// Best cost in this generation.
    pub generation_best: f64,
    /// Generations since the last improvement.
    pub stagnation_count: usize,
    /// Mutation rate that will be used for the next generation.
    pub mutation_rate: f64,
    /// Whether the stagnation boost is active.
    pub boosted: bool,
    /// Cells currently marked in the dead-end registry.
    pub dead_ends: usize,
    /// Current best individual.
    pub best_candidate: Option<CandidateSnapshot>,
    /// Current phase of the run.
    pub phase: EvolutionPhase,
}

/// Snapshot of an individual for reporting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CandidateSnapshot {
    /// Unique identifier.
    pub id: u64,
    /// Route cost or failure penalty.
    pub fitness: f64,
    /// Whether the decoded path ends at the goal.
    pub reached_goal: bool,
    /// Decoded path (partial progress if the goal was not reached).
    pub path: Vec<Position>,
    /// Cells this individual personally avoids.
    pub blocked: Vec<Position>,
    /// Generation this individual was created.
    pub generation: usize,
    /// Parent IDs (for genealogy).
    pub parents: Vec<u64>,
}

/// Per-generation history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best cost per generation.
    pub best_fitness: Vec<f64>,
    /// Average cost per generation.
    pub avg_fitness: Vec<f64>,
    /// Mutation rate in force per generation.
    pub mutation_rate: Vec<f64>,
    /// Dead-end registry size per generation.
    pub dead_ends: Vec<usize>,
}

/// Current phase of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EvolutionPhase {
    /// No population yet.
    #[default]
    Idle,
    /// Building and decoding the initial population.
    Initializing,
    /// Breeding and decoding generations.
    Evolving,
    /// Run finished.
    Terminated,
}

/// Final result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Best individual found.
    pub best: CandidateSnapshot,
    /// Statistics from the run.
    pub stats: EvolutionStats,
    /// Full history for analysis.
    pub history: EvolutionHistory,
}

/// Statistics from a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations evolved after initialization.
    pub generations: usize,
    /// Total decode calls.
    pub total_evaluations: u64,
    /// Best cost achieved.
    pub best_fitness: f64,
    /// Average cost of the final population.
    pub final_avg_fitness: f64,
    /// Dead-end cells discovered.
    pub dead_ends: usize,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Decode calls per second.
    pub evaluations_per_second: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason a run stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// Reached target cost.
    TargetReached,
    /// Stagnation limit hit.
    Stagnation,
    /// Cancelled through the cancel handle.
    Cancelled,
}
