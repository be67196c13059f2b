//! Binomial crossover
//!
//! Recombines each parent with its mutant gene by gene.

use nalgebra::DMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::OperatorError;
use crate::operators::traits::MatrixCrossover;

/// Binomial (uniform) crossover for differential evolution
///
/// The input stacks N parents over N mutants. Trial row `i` takes gene `j`
/// from mutant `i` with probability `cr`, and always at one randomly chosen
/// position `jrand`, so every trial inherits at least one mutant gene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinomialCrossover {
    /// Crossover rate
    pub cr: f64,
}

impl BinomialCrossover {
    /// Create a new binomial crossover
    pub fn new(cr: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&cr),
            "Crossover rate must be in [0, 1]"
        );
        Self { cr }
    }
}

impl Default for BinomialCrossover {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl MatrixCrossover for BinomialCrossover {
    fn recombine<R: Rng>(
        &self,
        merged: &DMatrix<f64>,
        rng: &mut R,
    ) -> Result<DMatrix<f64>, OperatorError> {
        let (rows, d) = merged.shape();
        if rows == 0 || rows % 2 != 0 {
            return Err(OperatorError::CrossoverFailed(format!(
                "stacked parent/mutant matrix needs a positive even row count, got {}",
                rows
            )));
        }
        if d == 0 {
            return Err(OperatorError::CrossoverFailed(
                "chromosomes have no genes".to_string(),
            ));
        }

        let n = rows / 2;
        let mut trial = merged.rows(0, n).into_owned();
        for i in 0..n {
            let jrand = rng.gen_range(0..d);
            for j in 0..d {
                if j == jrand || rng.gen::<f64>() < self.cr {
                    trial[(i, j)] = merged[(i + n, j)];
                }
            }
        }
        Ok(trial)
    }

    fn crossover_probability(&self) -> f64 {
        self.cr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stacked(n: usize, d: usize) -> DMatrix<f64> {
        // Parents are 0, mutants are 1
        DMatrix::from_fn(2 * n, d, |i, _| if i < n { 0.0 } else { 1.0 })
    }

    #[test]
    fn test_output_shape() {
        let mut rng = StdRng::seed_from_u64(2);
        let out = BinomialCrossover::default()
            .recombine(&stacked(7, 4), &mut rng)
            .unwrap();
        assert_eq!(out.shape(), (7, 4));
    }

    #[test]
    fn test_mandatory_mutant_gene() {
        let mut rng = StdRng::seed_from_u64(2);
        let out = BinomialCrossover::new(0.0)
            .recombine(&stacked(20, 5), &mut rng)
            .unwrap();
        for i in 0..20 {
            let inherited: f64 = out.row(i).sum();
            assert_eq!(inherited, 1.0);
        }
    }

    #[test]
    fn test_full_rate_copies_mutant() {
        let mut rng = StdRng::seed_from_u64(2);
        let out = BinomialCrossover::new(1.0)
            .recombine(&stacked(5, 3), &mut rng)
            .unwrap();
        assert!(out.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_genes_come_from_parent_or_mutant() {
        let mut rng = StdRng::seed_from_u64(6);
        let merged = DMatrix::from_fn(6, 4, |i, j| (i * 10 + j) as f64);
        let out = BinomialCrossover::default().recombine(&merged, &mut rng).unwrap();
        for i in 0..3 {
            for j in 0..4 {
                let v = out[(i, j)];
                assert!(v == merged[(i, j)] || v == merged[(i + 3, j)]);
            }
        }
    }

    #[test]
    fn test_odd_rows_rejected() {
        let mut rng = StdRng::seed_from_u64(2);
        let merged = DMatrix::zeros(5, 3);
        assert!(BinomialCrossover::default().recombine(&merged, &mut rng).is_err());
    }

    #[test]
    fn test_input_untouched() {
        let mut rng = StdRng::seed_from_u64(2);
        let merged = stacked(4, 3);
        let before = merged.clone();
        BinomialCrossover::default().recombine(&merged, &mut rng).unwrap();
        assert_eq!(merged, before);
    }

    #[test]
    #[should_panic(expected = "Crossover rate must be in [0, 1]")]
    fn test_invalid_rate() {
        BinomialCrossover::new(1.5);
    }
}
