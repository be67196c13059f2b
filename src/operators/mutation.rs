//! Differential mutation
//!
//! Builds mutant rows as `base + F * (x_r1 - x_r2)` and repairs genes that
//! leave the field's bounds.

use log::trace;
use nalgebra::DMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::OperatorError;
use crate::genome::bounds::BoundaryRepair;
use crate::genome::field::Field;
use crate::operators::traits::MatrixMutation;

/// Differential mutation with a scale factor `F`
///
/// Given one base matrix, the difference pair is drawn at random from the
/// population for each row: `r1` and `r2` differ from each other and from
/// the row index whenever the population has at least three rows. Given
/// three matrices `[base, a, b]`, the mutant is `base + F * (a - b)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifferentialMutation {
    /// Scale factor applied to the difference vector
    pub scale_factor: f64,
    /// Repair applied to out-of-bounds genes
    pub repair: BoundaryRepair,
}

impl DifferentialMutation {
    /// Create a new differential mutation with reflective repair
    pub fn new(scale_factor: f64) -> Self {
        assert!(
            scale_factor.is_finite() && scale_factor > 0.0,
            "Scale factor must be positive"
        );
        Self {
            scale_factor,
            repair: BoundaryRepair::default(),
        }
    }

    /// Set the boundary repair
    pub fn with_repair(mut self, repair: BoundaryRepair) -> Self {
        self.repair = repair;
        self
    }
}

impl Default for DifferentialMutation {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl MatrixMutation for DifferentialMutation {
    fn mutate<R: Rng>(
        &self,
        chrom: &DMatrix<f64>,
        base_vectors: &[DMatrix<f64>],
        field: &Field,
        rng: &mut R,
    ) -> Result<DMatrix<f64>, OperatorError> {
        let (n, d) = chrom.shape();
        if n == 0 {
            return Err(OperatorError::MutationFailed(
                "population is empty".to_string(),
            ));
        }
        if d != field.dimension() {
            return Err(OperatorError::MutationFailed(format!(
                "chromosome has {} columns but the field has {}",
                d,
                field.dimension()
            )));
        }
        if base_vectors.len() != 1 && base_vectors.len() != 3 {
            return Err(OperatorError::MutationFailed(format!(
                "expected 1 or 3 base-vector matrices, got {}",
                base_vectors.len()
            )));
        }
        if let Some(bad) = base_vectors.iter().find(|m| m.shape() != (n, d)) {
            return Err(OperatorError::MutationFailed(format!(
                "base-vector matrix is {}x{}, expected {}x{}",
                bad.nrows(),
                bad.ncols(),
                n,
                d
            )));
        }

        let base = &base_vectors[0];
        let mut mutant = DMatrix::zeros(n, d);
        let mut repaired = 0usize;

        for i in 0..n {
            let (a, a_row, b, b_row) = if base_vectors.len() == 3 {
                (&base_vectors[1], i, &base_vectors[2], i)
            } else {
                let (r1, r2) = difference_pair(i, n, rng);
                (chrom, r1, chrom, r2)
            };

            for j in 0..d {
                let value = base[(i, j)] + self.scale_factor * (a[(a_row, j)] - b[(b_row, j)]);
                let bounds = field.bound(j);
                if !bounds.contains(value) {
                    repaired += 1;
                }
                mutant[(i, j)] = self.repair.apply(value, bounds, rng);
            }
        }

        if repaired > 0 {
            trace!(
                "differential mutation: {} of {} genes repaired ({})",
                repaired,
                n * d,
                self.repair.name()
            );
        }
        Ok(mutant)
    }
}

/// Draw the difference-vector row indices for row `i`
fn difference_pair<R: Rng>(i: usize, n: usize, rng: &mut R) -> (usize, usize) {
    match n {
        1 => (0, 0),
        2 => (1 - i, i),
        _ => {
            let r1 = sample_excluding(n, &[i], rng);
            let mut taken = [i, r1];
            taken.sort_unstable();
            let r2 = sample_excluding(n, &taken, rng);
            (r1, r2)
        }
    }
}

/// Uniform index in `0..n` outside `excluded` (sorted, distinct, all < n)
fn sample_excluding<R: Rng>(n: usize, excluded: &[usize], rng: &mut R) -> usize {
    let mut r = rng.gen_range(0..n - excluded.len());
    for &e in excluded {
        if r >= e {
            r += 1;
        }
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::bounds::Bounds;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_excluding() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let r = sample_excluding(5, &[1, 3], &mut rng);
            assert!(r < 5 && r != 1 && r != 3);
        }
    }

    #[test]
    fn test_difference_pair_distinct() {
        let mut rng = StdRng::seed_from_u64(4);
        for i in 0..6 {
            for _ in 0..100 {
                let (r1, r2) = difference_pair(i, 6, &mut rng);
                assert!(r1 != i && r2 != i && r1 != r2);
            }
        }
        assert_eq!(difference_pair(0, 2, &mut rng), (1, 0));
        assert_eq!(difference_pair(0, 1, &mut rng), (0, 0));
    }

    #[test]
    fn test_shape_and_bounds() {
        let mut rng = StdRng::seed_from_u64(8);
        let field = Field::symmetric(1.0, 3);
        let chrom = DMatrix::from_fn(10, 3, |i, j| ((i + j) as f64 / 12.0) * 2.0 - 1.0);
        let op = DifferentialMutation::new(0.9);
        let out = op.mutate(&chrom, &[chrom.clone()], &field, &mut rng).unwrap();
        assert_eq!(out.shape(), (10, 3));
        assert!(field.contains(&out));
    }

    #[test]
    fn test_three_matrix_form() {
        let mut rng = StdRng::seed_from_u64(8);
        let field = Field::uniform(Bounds::new(-10.0, 10.0), 2);
        let base = DMatrix::from_element(2, 2, 1.0);
        let a = DMatrix::from_element(2, 2, 3.0);
        let b = DMatrix::from_element(2, 2, 1.0);
        let op = DifferentialMutation::new(0.5);
        let out = op
            .mutate(&base, &[base.clone(), a, b], &field, &mut rng)
            .unwrap();
        for v in out.iter() {
            assert_relative_eq!(*v, 2.0);
        }
    }

    #[test]
    fn test_clip_repair() {
        let mut rng = StdRng::seed_from_u64(8);
        let field = Field::uniform(Bounds::new(0.0, 1.0), 1);
        let base = DMatrix::from_element(1, 1, 0.9);
        let a = DMatrix::from_element(1, 1, 1.0);
        let b = DMatrix::from_element(1, 1, 0.0);
        let op = DifferentialMutation::new(0.5).with_repair(BoundaryRepair::Clip);
        let out = op
            .mutate(&base, &[base.clone(), a, b], &field, &mut rng)
            .unwrap();
        assert_relative_eq!(out[(0, 0)], 1.0);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let mut rng = StdRng::seed_from_u64(8);
        let field = Field::symmetric(1.0, 2);
        let chrom = DMatrix::zeros(4, 2);
        let op = DifferentialMutation::default();

        assert!(op.mutate(&chrom, &[], &field, &mut rng).is_err());
        assert!(op
            .mutate(&chrom, &[chrom.clone(), chrom.clone()], &field, &mut rng)
            .is_err());
        assert!(op
            .mutate(&chrom, &[DMatrix::zeros(3, 2)], &field, &mut rng)
            .is_err());
        assert!(op
            .mutate(&DMatrix::zeros(4, 3), &[DMatrix::zeros(4, 3)], &field, &mut rng)
            .is_err());
    }

    #[test]
    fn test_input_untouched() {
        let mut rng = StdRng::seed_from_u64(1);
        let field = Field::symmetric(2.0, 2);
        let chrom = DMatrix::from_fn(5, 2, |i, j| (i as f64 - j as f64) * 0.3);
        let before = chrom.clone();
        DifferentialMutation::default()
            .mutate(&chrom, &[chrom.clone()], &field, &mut rng)
            .unwrap();
        assert_eq!(chrom, before);
    }

    #[test]
    #[should_panic(expected = "Scale factor must be positive")]
    fn test_invalid_scale_factor() {
        DifferentialMutation::new(0.0);
    }
}
