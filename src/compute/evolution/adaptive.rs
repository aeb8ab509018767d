//! Stagnation policy for the mutation rate.

use crate::schema::AdaptiveMutationConfig;

/// Tracks the best cost across generations and decides when the mutation
/// rate should be boosted or restored.
///
/// A generation whose best cost does not beat the running best by more than
/// `epsilon` counts as stagnant. Once more than `patience` stagnant
/// generations pass, the boosted rate is requested; the first real
/// improvement requests the default rate again.
#[derive(Debug, Clone)]
pub struct StagnationTracker {
    config: AdaptiveMutationConfig,
    default_rate: f64,
    best: f64,
    stagnant: usize,
    boosted: bool,
}

impl StagnationTracker {
    pub fn new(config: AdaptiveMutationConfig, default_rate: f64) -> Self {
        Self {
            config,
            default_rate,
            best: f64::INFINITY,
            stagnant: 0,
            boosted: false,
        }
    }

    /// Record a generation's best cost. Returns the mutation rate to switch
    /// to, if it should change.
    pub fn observe(&mut self, best_cost: f64) -> Option<f64> {
        if best_cost < self.best - self.config.epsilon {
            self.best = best_cost;
            self.stagnant = 0;
            if self.boosted {
                self.boosted = false;
                return Some(self.default_rate);
            }
            return None;
        }

        self.best = self.best.min(best_cost);
        self.stagnant += 1;

        if self.config.enabled && !self.boosted && self.stagnant > self.config.patience {
            self.boosted = true;
            return Some(self.config.boosted_rate);
        }
        None
    }

    /// Best cost observed so far.
    pub fn best(&self) -> f64 {
        self.best
    }

    /// Consecutive stagnant generations.
    pub fn stagnation_count(&self) -> usize {
        self.stagnant
    }

    pub fn is_boosted(&self) -> bool {
        self.boosted
    }

    pub fn default_rate(&self) -> f64 {
        self.default_rate
    }

    pub fn reset(&mut self) {
        self.best = f64::INFINITY;
        self.stagnant = 0;
        self.boosted = false;
    }
}
