//! Selection operators
//!
//! This module provides the two index selectors used by the DE loop:
//! fitness-proportional candidate selection ([`Ecs`]) for base vectors and
//! one-to-one survivor selection ([`Otos`]) for replacement.

use nalgebra::DVector;
use rand::Rng;
use rand::distributions::WeightedError;
use rand_distr::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};

use crate::error::OperatorError;
use crate::operators::traits::IndexSelector;

/// Named selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Fitness-proportional draws with replacement
    Ecs,
    /// One-to-one survivor selection over a stacked parent/offspring vector
    Otos,
}

/// Select `count` indices from `fitness` under the given policy
pub fn select<R: Rng>(
    policy: SelectionPolicy,
    fitness: &DVector<f64>,
    count: usize,
    rng: &mut R,
) -> Result<Vec<usize>, OperatorError> {
    match policy {
        SelectionPolicy::Ecs => Ecs::new().select(fitness, count, rng),
        SelectionPolicy::Otos => Otos::new().select(fitness, count, rng),
    }
}

/// Fitness-proportional candidate selection
///
/// Each draw picks index `i` with probability `fitness[i] / Σ fitness`.
/// This stands in for a deterministic "best individual" lookup when building
/// target-to-best base vectors.
#[derive(Clone, Debug, Default)]
pub struct Ecs {
    without_replacement: bool,
}

impl Ecs {
    /// Draw with replacement
    pub fn new() -> Self {
        Self {
            without_replacement: false,
        }
    }

    /// Draw without replacement; `count` may not exceed the number of
    /// individuals with nonzero fitness
    pub fn without_replacement() -> Self {
        Self {
            without_replacement: true,
        }
    }
}

impl IndexSelector for Ecs {
    fn select<R: Rng>(
        &self,
        fitness: &DVector<f64>,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>, OperatorError> {
        if fitness.is_empty() {
            return Err(OperatorError::SelectionFailed(
                "fitness vector is empty".to_string(),
            ));
        }
        if let Some(bad) = fitness.iter().find(|f| !f.is_finite() || **f < 0.0) {
            return Err(OperatorError::SelectionFailed(format!(
                "fitness values must be finite and non-negative, found {}",
                bad
            )));
        }

        let mut weights: Vec<f64> = fitness.iter().copied().collect();
        if !self.without_replacement {
            return match WeightedIndex::new(&weights) {
                Ok(dist) => Ok((0..count).map(|_| dist.sample(rng)).collect()),
                // Nothing to prefer: every index is equally likely
                Err(WeightedError::AllWeightsZero) => {
                    Ok((0..count).map(|_| rng.gen_range(0..fitness.len())).collect())
                }
                Err(e) => Err(OperatorError::SelectionFailed(e.to_string())),
            };
        }

        let nonzero = fitness.iter().filter(|&&f| f > 0.0).count();
        if count > nonzero {
            return Err(OperatorError::SelectionFailed(format!(
                "cannot draw {} distinct indices from {} individuals with nonzero fitness",
                count, nonzero
            )));
        }
        let mut picked = Vec::with_capacity(count);
        for _ in 0..count {
            let dist = WeightedIndex::new(&weights)
                .map_err(|e| OperatorError::SelectionFailed(e.to_string()))?;
            let i = dist.sample(rng);
            weights[i] = 0.0;
            picked.push(i);
        }
        Ok(picked)
    }
}

/// One-to-one survivor selection
///
/// The fitness vector stacks N parents over N offspring. For each position
/// `i` the parent `i` survives unless offspring `i + N` is strictly fitter.
#[derive(Clone, Debug, Default)]
pub struct Otos;

impl Otos {
    /// Create a new one-to-one survivor selector
    pub fn new() -> Self {
        Self
    }
}

impl IndexSelector for Otos {
    fn select<R: Rng>(
        &self,
        fitness: &DVector<f64>,
        count: usize,
        _rng: &mut R,
    ) -> Result<Vec<usize>, OperatorError> {
        if fitness.len() % 2 != 0 {
            return Err(OperatorError::SelectionFailed(format!(
                "one-to-one selection needs an even fitness length, got {}",
                fitness.len()
            )));
        }
        let n = fitness.len() / 2;
        if count != n {
            return Err(OperatorError::SelectionFailed(format!(
                "one-to-one selection returns exactly {} survivors, {} requested",
                n, count
            )));
        }
        if fitness.iter().any(|f| f.is_nan()) {
            return Err(OperatorError::SelectionFailed(
                "fitness contains NaN".to_string(),
            ));
        }
        Ok((0..n)
            .map(|i| if fitness[i] >= fitness[i + n] { i } else { i + n })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_otos_example() {
        let mut rng = StdRng::seed_from_u64(0);
        let fitness = DVector::from_vec(vec![5.0, 3.0, 5.0, 9.0]);
        let survivors = select(SelectionPolicy::Otos, &fitness, 2, &mut rng).unwrap();
        assert_eq!(survivors, vec![0, 3]);
    }

    #[test]
    fn test_otos_errors() {
        let mut rng = StdRng::seed_from_u64(0);
        let odd = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(Otos::new().select(&odd, 1, &mut rng).is_err());
        let even = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        assert!(Otos::new().select(&even, 3, &mut rng).is_err());
    }

    #[test]
    fn test_ecs_valid_indices() {
        let mut rng = StdRng::seed_from_u64(11);
        let fitness = DVector::from_vec(vec![0.5, 1.0, 1.5, 2.0]);
        let picked = select(SelectionPolicy::Ecs, &fitness, 100, &mut rng).unwrap();
        assert_eq!(picked.len(), 100);
        assert!(picked.iter().all(|&i| i < 4));
    }

    #[test]
    fn test_ecs_prefers_fitter() {
        let mut rng = StdRng::seed_from_u64(5);
        let fitness = DVector::from_vec(vec![0.1, 10.0]);
        let picked = Ecs::new().select(&fitness, 1000, &mut rng).unwrap();
        let fit_count = picked.iter().filter(|&&i| i == 1).count();
        assert!(fit_count > 900);
    }

    #[test]
    fn test_ecs_zero_weight_never_drawn() {
        let mut rng = StdRng::seed_from_u64(5);
        let fitness = DVector::from_vec(vec![0.0, 1.0, 0.0, 1.0]);
        let picked = Ecs::new().select(&fitness, 200, &mut rng).unwrap();
        assert!(picked.iter().all(|&i| i == 1 || i == 3));
    }

    #[test]
    fn test_ecs_all_zero_falls_back_to_uniform() {
        let mut rng = StdRng::seed_from_u64(5);
        let fitness = DVector::from_vec(vec![0.0; 3]);
        let picked = Ecs::new().select(&fitness, 30, &mut rng).unwrap();
        assert_eq!(picked.len(), 30);
    }

    #[test]
    fn test_ecs_rejects_negative() {
        let mut rng = StdRng::seed_from_u64(5);
        let fitness = DVector::from_vec(vec![1.0, -1.0]);
        assert!(Ecs::new().select(&fitness, 1, &mut rng).is_err());
        assert!(Ecs::new()
            .select(&DVector::from_vec(vec![]), 1, &mut rng)
            .is_err());
    }

    #[test]
    fn test_ecs_without_replacement() {
        let mut rng = StdRng::seed_from_u64(9);
        let fitness = DVector::from_vec(vec![1.0, 0.0, 2.0, 3.0]);
        let mut picked = Ecs::without_replacement()
            .select(&fitness, 3, &mut rng)
            .unwrap();
        picked.sort();
        assert_eq!(picked, vec![0, 2, 3]);

        assert!(Ecs::without_replacement()
            .select(&fitness, 4, &mut rng)
            .is_err());
    }

    #[test]
    fn test_ecs_reproducible() {
        let fitness = DVector::from_vec(vec![0.2, 0.7, 1.1, 0.4, 1.6]);
        let a = Ecs::new()
            .select(&fitness, 20, &mut StdRng::seed_from_u64(42))
            .unwrap();
        let b = Ecs::new()
            .select(&fitness, 20, &mut StdRng::seed_from_u64(42))
            .unwrap();
        assert_eq!(a, b);
    }
}
