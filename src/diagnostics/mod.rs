//! Diagnostics and statistics
//!
//! This module provides statistics collection for evolutionary runs and the
//! result type returned by the default finishing step.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fitness::problem::Direction;
use crate::population::individual::Individual;
use crate::population::population::Population;

/// Statistics for a single generation
///
/// Objective statistics use raw objective values. `best_*` describe the best
/// individual under the feasibility-first order; mean and worst are taken
/// over feasible individuals only and are `None` when there are none.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation number (0 is the initial population)
    pub generation: usize,
    /// Total objective evaluations so far
    pub evaluations: usize,
    /// Objective of the best individual
    pub best_objective: f64,
    /// Constraint violation of the best individual
    pub best_violation: f64,
    /// Mean objective over feasible individuals
    pub mean_objective: Option<f64>,
    /// Worst objective over feasible individuals
    pub worst_objective: Option<f64>,
    /// Number of feasible individuals
    pub feasible_count: usize,
}

impl GenerationStats {
    /// Compute statistics from an evaluated population
    ///
    /// Returns `None` when the population carries no objective values.
    pub fn from_population(
        population: &Population,
        generation: usize,
        evaluations: usize,
        direction: Direction,
    ) -> Option<Self> {
        let obj_v = population.obj_v()?;
        let best = population.best_index(direction)?;

        let feasible: Vec<f64> = (0..population.sizes())
            .filter(|&i| population.violation(i) <= 0.0)
            .map(|i| obj_v[(i, 0)])
            .collect();

        let mean = if feasible.is_empty() {
            None
        } else {
            Some(feasible.iter().sum::<f64>() / feasible.len() as f64)
        };
        let worst = feasible.iter().copied().reduce(|worst, v| {
            if direction.is_better(worst, v) {
                v
            } else {
                worst
            }
        });

        Some(Self {
            generation,
            evaluations,
            best_objective: obj_v[(best, 0)],
            best_violation: population.violation(best),
            mean_objective: mean,
            worst_objective: worst,
            feasible_count: feasible.len(),
        })
    }

    /// Whether the best individual is feasible
    pub fn best_is_feasible(&self) -> bool {
        self.best_violation <= 0.0
    }
}

/// Statistics collector for an entire evolution run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Statistics per generation
    pub generations: Vec<GenerationStats>,
    /// Total runtime in milliseconds
    pub total_runtime_ms: f64,
    /// Reason for termination
    pub termination_reason: Option<String>,
}

impl EvolutionStats {
    /// Create a new stats collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a generation's statistics
    pub fn record(&mut self, stats: GenerationStats) {
        self.generations.push(stats);
    }

    /// Get the number of generations recorded
    pub fn num_generations(&self) -> usize {
        self.generations.len()
    }

    /// Get the final best objective
    pub fn final_best_objective(&self) -> Option<f64> {
        self.generations.last().map(|g| g.best_objective)
    }

    /// Get the history of best objective values
    pub fn best_objective_history(&self) -> Vec<f64> {
        self.generations.iter().map(|g| g.best_objective).collect()
    }

    /// Get the history of feasible counts
    pub fn feasible_history(&self) -> Vec<usize> {
        self.generations.iter().map(|g| g.feasible_count).collect()
    }

    /// Set the termination reason
    pub fn set_termination_reason(&mut self, reason: &str) {
        self.termination_reason = Some(reason.to_string());
    }

    /// Set the total runtime
    pub fn set_runtime(&mut self, duration: Duration) {
        self.total_runtime_ms = duration.as_secs_f64() * 1000.0;
    }

    /// Serialize the collected statistics as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Get a summary of the evolution run
    pub fn summary(&self) -> String {
        let final_best = self.final_best_objective().unwrap_or(f64::NAN);
        format!(
            "Evolution Summary:\n\
             - Generations: {}\n\
             - Final best objective: {:.6}\n\
             - Runtime: {:.2}ms\n\
             - Termination: {}",
            self.num_generations(),
            final_best,
            self.total_runtime_ms,
            self.termination_reason.as_deref().unwrap_or("unknown")
        )
    }
}

/// Result of an evolution run
#[derive(Clone, Debug)]
pub struct EvolutionResult {
    /// The best individual found in the final population
    pub best: Individual,
    /// Raw objective of the best individual
    pub best_objective: f64,
    /// Number of generations completed
    pub generations: usize,
    /// Total objective evaluations
    pub evaluations: usize,
    /// Statistics for the run
    pub stats: EvolutionStats,
    /// The final population
    pub population: Population,
}

impl EvolutionResult {
    /// Best decision vector (decoded)
    pub fn best_solution(&self) -> &[f64] {
        &self.best.phen
    }

    /// Whether the best individual violates no constraint
    pub fn is_feasible(&self) -> bool {
        self.best.is_feasible()
    }
}

pub mod prelude {
    pub use super::{EvolutionResult, EvolutionStats, GenerationStats};
}
