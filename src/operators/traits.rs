//! Operator traits
//!
//! This module defines the core operator traits for matrix-based
//! differential evolution. Operators read population matrices and return new
//! ones; none of them modifies its inputs.

use nalgebra::{DMatrix, DVector};
use rand::Rng;

use crate::error::OperatorError;
use crate::genome::field::Field;

/// Index selection operator
///
/// Draws row indices from a fitness vector.
pub trait IndexSelector: Send + Sync {
    /// Select `count` indices
    fn select<R: Rng>(
        &self,
        fitness: &DVector<f64>,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>, OperatorError>;
}

/// Mutation operator over a whole chromosome matrix
pub trait MatrixMutation: Send + Sync {
    /// Produce one mutant row per row of `chrom`
    ///
    /// `base_vectors` holds the base-vector matrices, each shaped like `chrom`.
    fn mutate<R: Rng>(
        &self,
        chrom: &DMatrix<f64>,
        base_vectors: &[DMatrix<f64>],
        field: &Field,
        rng: &mut R,
    ) -> Result<DMatrix<f64>, OperatorError>;
}

/// Recombination operator over a stacked parent/donor matrix
pub trait MatrixCrossover: Send + Sync {
    /// Recombine the top half of `merged` with its bottom half, row by row
    fn recombine<R: Rng>(
        &self,
        merged: &DMatrix<f64>,
        rng: &mut R,
    ) -> Result<DMatrix<f64>, OperatorError>;

    /// Per-gene probability of inheriting from the donor
    fn crossover_probability(&self) -> f64 {
        1.0
    }
}
