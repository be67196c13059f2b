//! Individual snapshot type
//!
//! An [`Individual`] is an owned copy of one row across a population's
//! matrices, used when a single solution leaves the matrix world (for
//! example the best solution reported at the end of a run).

use serde::{Deserialize, Serialize};

use crate::fitness::problem::Direction;

/// One row of a population, detached from its matrices
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    /// Chromosome (genetic values)
    pub chrom: Vec<f64>,
    /// Decoded decision variables
    pub phen: Vec<f64>,
    /// Objective values
    pub objectives: Vec<f64>,
    /// Constraint violation (0 means feasible)
    pub cv: f64,
    /// Scaled fitness, if it was computed
    pub fitness: Option<f64>,
}

impl Individual {
    /// Whether this individual violates no constraint
    pub fn is_feasible(&self) -> bool {
        self.cv <= 0.0
    }

    /// First objective value
    pub fn objective(&self) -> f64 {
        self.objectives.first().copied().unwrap_or(f64::NAN)
    }

    /// Check if this individual is better than another
    ///
    /// Feasibility dominates; among feasible individuals the objective decides
    /// in the given direction, among infeasible ones the smaller violation wins.
    pub fn is_better_than(&self, other: &Self, direction: Direction) -> bool {
        match (self.is_feasible(), other.is_feasible()) {
            (true, false) => true,
            (false, true) => false,
            (true, true) => direction.is_better(self.objective(), other.objective()),
            (false, false) => self.cv < other.cv,
        }
    }
}
