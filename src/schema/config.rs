//! Configuration types for evolutionary route search.

use serde::{Deserialize, Serialize};

/// Top-level configuration for an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionConfig {
    /// Population and run-length settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Selection, crossover and elitism.
    #[serde(default)]
    pub genetic: GeneticConfig,
    /// Mutation operator settings.
    #[serde(default)]
    pub mutation: MutationConfig,
    /// Genome-to-path decoding policy.
    #[serde(default)]
    pub decoder: DecoderKind,
    /// Mutation-rate boost under stagnation.
    #[serde(default)]
    pub adaptive: AdaptiveMutationConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl EvolutionConfig {
    /// Configuration from the four classic GA knobs, everything else default.
    pub fn new(
        population_size: usize,
        mutation_rate: f64,
        crossover_rate: f64,
        elitism_count: usize,
    ) -> Self {
        Self {
            population: PopulationConfig {
                size: population_size,
                ..Default::default()
            },
            genetic: GeneticConfig {
                mutation_rate,
                crossover_rate,
                elitism: elitism_count,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_decoder(mut self, decoder: DecoderKind) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in the population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Maximum number of generations for [`run`](crate::compute::evolution::EvolutionEngine::run).
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Fraction of each generation replaced by fresh random individuals.
    #[serde(default = "default_fresh_blood_ratio")]
    pub fresh_blood_ratio: f64,
    /// Individuals biased toward a supplied seed path.
    #[serde(default = "default_seeded_individuals")]
    pub seeded_individuals: usize,
    /// Stop once the best cost drops to or below this value.
    #[serde(default)]
    pub target_cost: Option<f64>,
    /// Stop after this many generations without improvement.
    #[serde(default)]
    pub stagnation_limit: Option<usize>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            fresh_blood_ratio: default_fresh_blood_ratio(),
            seeded_individuals: default_seeded_individuals(),
            target_cost: None,
            stagnation_limit: None,
        }
    }
}

fn default_population_size() -> usize {
    100
}
fn default_max_generations() -> usize {
    500
}
fn default_fresh_blood_ratio() -> f64 {
    0.15
}
fn default_seeded_individuals() -> usize {
    2
}

/// Genetic operator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Per-gene mutation probability (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Probability of uniform crossover instead of cloning (0.0-1.0).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Number of best individuals carried over unchanged.
    #[serde(default = "default_elitism")]
    pub elitism: usize,
    /// Individuals sampled per tournament.
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            mutation_rate: default_mutation_rate(),
            crossover_rate: default_crossover_rate(),
            elitism: default_elitism(),
            tournament_size: default_tournament_size(),
        }
    }
}

fn default_mutation_rate() -> f64 {
    0.05
}
fn default_crossover_rate() -> f64 {
    0.9
}
fn default_elitism() -> usize {
    2
}
fn default_tournament_size() -> usize {
    5
}

/// How a mutated priority gene is reassigned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum MutationMode {
    /// Fresh uniform value in [0, 1].
    #[default]
    Random,
    /// Push toward the opposite extreme: high genes drop to [0, 0.2),
    /// low genes jump to [0.8, 1.0).
    Flip,
    /// Flip 30% of the time, otherwise a small Gaussian nudge.
    Hybrid,
}

/// Mutation operator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Gene reassignment mode.
    #[serde(default)]
    pub mode: MutationMode,
    /// Chance that a blocked cell is forgotten on each mutation.
    #[serde(default = "default_decay_probability")]
    pub decay_probability: f64,
    /// Chance of running junction blocking along the parent's path.
    #[serde(default = "default_junction_probability")]
    pub junction_probability: f64,
    /// Upper bound on junction exits blocked per mutation.
    #[serde(default = "default_max_junction_blocks")]
    pub max_junction_blocks: usize,
    /// Shortest parent path eligible for junction blocking.
    #[serde(default = "default_min_parent_path")]
    pub min_parent_path: usize,
    /// Random path positions probed while looking for junctions.
    #[serde(default = "default_junction_attempts")]
    pub junction_attempts: usize,
    /// Standard deviation of the hybrid mode's nudge.
    #[serde(default = "default_nudge_strength")]
    pub nudge_strength: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            mode: MutationMode::default(),
            decay_probability: default_decay_probability(),
            junction_probability: default_junction_probability(),
            max_junction_blocks: default_max_junction_blocks(),
            min_parent_path: default_min_parent_path(),
            junction_attempts: default_junction_attempts(),
            nudge_strength: default_nudge_strength(),
        }
    }
}

fn default_decay_probability() -> f64 {
    0.15
}
fn default_junction_probability() -> f64 {
    0.6
}
fn default_max_junction_blocks() -> usize {
    3
}
fn default_min_parent_path() -> usize {
    5
}
fn default_junction_attempts() -> usize {
    50
}
fn default_nudge_strength() -> f64 {
    0.05
}

/// Decoding policy selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DecoderKind {
    /// Best-first search over priority-discounted edge costs.
    ShortestPath {
        /// Exponent applied to the priority discount.
        #[serde(default = "default_shortest_path_alpha")]
        alpha: f64,
        /// Add a Manhattan-distance heuristic (A* ordering).
        #[serde(default)]
        heuristic: bool,
    },
    /// Depth-first walk sampling neighbors by `priority^alpha`.
    StochasticWalk {
        #[serde(default = "default_walk_alpha")]
        alpha: f64,
    },
    /// Depth-first walk always taking the highest-priority neighbor.
    MaxPriorityWalk,
}

impl Default for DecoderKind {
    fn default() -> Self {
        Self::MaxPriorityWalk
    }
}

impl DecoderKind {
    pub fn shortest_path() -> Self {
        Self::ShortestPath {
            alpha: default_shortest_path_alpha(),
            heuristic: false,
        }
    }

    pub fn stochastic_walk() -> Self {
        Self::StochasticWalk {
            alpha: default_walk_alpha(),
        }
    }
}

fn default_shortest_path_alpha() -> f64 {
    4.0
}
fn default_walk_alpha() -> f64 {
    2.0
}

/// Stagnation policy: boost the mutation rate when the best cost stalls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveMutationConfig {
    #[serde(default = "default_adaptive_enabled")]
    pub enabled: bool,
    /// Generations without improvement before boosting.
    #[serde(default = "default_patience")]
    pub patience: usize,
    /// Minimum cost decrease that counts as improvement.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Mutation rate used while stagnating.
    #[serde(default = "default_boosted_rate")]
    pub boosted_rate: f64,
}

impl Default for AdaptiveMutationConfig {
    fn default() -> Self {
        Self {
            enabled: default_adaptive_enabled(),
            patience: default_patience(),
            epsilon: default_epsilon(),
            boosted_rate: default_boosted_rate(),
        }
    }
}

fn default_adaptive_enabled() -> bool {
    true
}
fn default_patience() -> usize {
    50
}
fn default_epsilon() -> f64 {
    1e-4
}
fn default_boosted_rate() -> f64 {
    0.4
}

impl EvolutionConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population.size < 2 {
            return Err(ConfigError::PopulationTooSmall);
        }
        if self.genetic.elitism == 0 {
            return Err(ConfigError::NoElitism);
        }
        if self.genetic.elitism >= self.population.size {
            return Err(ConfigError::ElitismTooLarge {
                elitism: self.genetic.elitism,
                population: self.population.size,
            });
        }
        if self.genetic.tournament_size == 0 {
            return Err(ConfigError::InvalidTournamentSize);
        }

        let check_rate = |value: f64, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidRate { name, value })
            }
        };

        check_rate(self.genetic.mutation_rate, "mutation_rate")?;
        check_rate(self.genetic.crossover_rate, "crossover_rate")?;
        check_rate(self.mutation.decay_probability, "decay_probability")?;
        check_rate(self.mutation.junction_probability, "junction_probability")?;
        check_rate(self.adaptive.boosted_rate, "boosted_rate")?;

        if !(0.0..1.0).contains(&self.population.fresh_blood_ratio) {
            return Err(ConfigError::InvalidFreshBlood(
                self.population.fresh_blood_ratio,
            ));
        }

        match self.decoder {
            DecoderKind::ShortestPath { alpha, .. } | DecoderKind::StochasticWalk { alpha }
                if !(alpha.is_finite() && alpha > 0.0) =>
            {
                Err(ConfigError::InvalidAlpha(alpha))
            }
            _ => Ok(()),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Elitism ({elitism}) must be smaller than the population ({population})")]
    ElitismTooLarge { elitism: usize, population: usize },
    #[error("Elitism must keep at least one genome")]
    NoElitism,
    #[error("Tournament size must be positive")]
    InvalidTournamentSize,
    #[error("{name} must lie in [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("Fresh blood ratio must lie in [0, 1), got {0}")]
    InvalidFreshBlood(f64),
    #[error("Decoder alpha must be positive and finite, got {0}")]
    InvalidAlpha(f64),
}
