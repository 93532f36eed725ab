use crate::{Error, Result};

/// Tunables of one optimization run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OptimizerConfig {
    pub max_iterations: usize,
    /// Iterations a vacated (cell, pci) pair stays forbidden.
    pub tabu_tenure: usize,
    /// Non-improving iterations tolerated once no CRITICAL/HIGH conflicts remain.
    pub stall_limit: usize,
    /// Stall count at which the loop switches to diversification.
    pub diversify_after: usize,
    pub recolor_batch: usize,
    pub diversified_batch: usize,
    /// Share of the best-scored candidates the scorer samples from.
    pub top_fraction: f64,
    /// Neighborhood considered when re-homing a colliding cell (meters).
    pub proximity_radius_m: f64,
    /// Fixed seed for reproducible runs; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            tabu_tenure: 7,
            stall_limit: 5,
            diversify_after: 3,
            recolor_batch: 5,
            diversified_batch: 10,
            top_fraction: 0.2,
            proximity_radius_m: 50_000.0,
            seed: None,
        }
    }
}

impl OptimizerConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::invalid_input("max_iterations must be > 0"));
        }
        if self.recolor_batch == 0 || self.diversified_batch == 0 {
            return Err(Error::invalid_input(format!(
                "recolor batches must be > 0, got recolor_batch={} diversified_batch={}",
                self.recolor_batch, self.diversified_batch
            )));
        }
        if !(self.top_fraction > 0.0 && self.top_fraction <= 1.0) {
            return Err(Error::invalid_input(format!(
                "top_fraction must be in (0, 1], got {}",
                self.top_fraction
            )));
        }
        if !(self.proximity_radius_m.is_finite() && self.proximity_radius_m > 0.0) {
            return Err(Error::invalid_input(format!(
                "proximity_radius_m must be > 0, got {}",
                self.proximity_radius_m
            )));
        }
        Ok(())
    }
}
