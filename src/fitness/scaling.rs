//! Fitness scaling
//!
//! Turns sign-adjusted objective values (larger is better) and optional
//! constraint violations into strictly positive fitness values for
//! fitness-proportional selection.
//!
//! Two guarantees hold for every method:
//! - every feasible individual gets more fitness than every infeasible one;
//! - among feasible individuals fitness never decreases with the objective,
//!   and among infeasible ones it never increases with the violation.

use std::cmp::Ordering;

use log::warn;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_shape, EvoResult, EvolutionError};

/// Scaling transform applied by [`FitnessScaler`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMethod {
    /// Baker's linear ranking over the feasibility-first order
    ///
    /// `pressure` is the expected number of copies of the best individual and
    /// must lie in (1, 2) so the worst individual keeps positive fitness.
    Rank {
        /// Selection pressure
        pressure: f64,
    },
    /// Min-max scaling: feasible into [1, 2], infeasible into [0.1, 0.9]
    Linear,
}

impl Default for ScalingMethod {
    fn default() -> Self {
        Self::Rank { pressure: 1.8 }
    }
}

/// Maps objectives and violations to selection fitness
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FitnessScaler {
    method: ScalingMethod,
}

impl FitnessScaler {
    /// Create a scaler, validating the method parameters
    pub fn new(method: ScalingMethod) -> EvoResult<Self> {
        if let ScalingMethod::Rank { pressure } = method {
            if !(pressure > 1.0 && pressure < 2.0) {
                return Err(EvolutionError::Configuration(format!(
                    "rank pressure must lie in (1, 2), got {}",
                    pressure
                )));
            }
        }
        Ok(Self { method })
    }

    /// Linear ranking scaler with the given pressure
    pub fn rank(pressure: f64) -> EvoResult<Self> {
        Self::new(ScalingMethod::Rank { pressure })
    }

    /// Min-max scaler
    pub fn linear() -> Self {
        Self {
            method: ScalingMethod::Linear,
        }
    }

    /// Scaling method in use
    pub fn method(&self) -> ScalingMethod {
        self.method
    }

    /// Compute fitness for every individual
    ///
    /// `signed_objectives` must already be oriented so that larger is better.
    /// Inputs are never modified.
    pub fn scale(
        &self,
        signed_objectives: &DVector<f64>,
        violations: Option<&DVector<f64>>,
    ) -> EvoResult<DVector<f64>> {
        let n = signed_objectives.len();
        if n == 0 {
            return Err(EvolutionError::EmptyPopulation);
        }
        if let Some(cv) = violations {
            ensure_shape("CV rows", n, cv.len())?;
        }
        if signed_objectives.iter().any(|v| !v.is_finite()) {
            return Err(EvolutionError::Precondition(
                "objective values passed to scaling must be finite".to_string(),
            ));
        }

        let keys: Vec<Key> = (0..n)
            .map(|i| {
                let cv = violations.map_or(0.0, |v| v[i]);
                if cv <= 0.0 {
                    Key::Feasible(signed_objectives[i])
                } else {
                    Key::Infeasible(cv)
                }
            })
            .collect();

        let feasible = keys.iter().filter(|k| matches!(k, Key::Feasible(_))).count();
        if feasible == 0 {
            warn!("fitness scaling: all {} individuals are infeasible", n);
        } else if n > 1 && keys.iter().all(|k| k.compare(&keys[0]) == Ordering::Equal) {
            warn!("fitness scaling: all {} individuals are tied", n);
        }

        let fitness = match self.method {
            ScalingMethod::Rank { pressure } => rank_fitness(&keys, pressure),
            ScalingMethod::Linear => linear_fitness(&keys),
        };
        Ok(DVector::from_vec(fitness))
    }
}

/// Feasibility-first ordering key; larger is better
#[derive(Debug, Clone, Copy)]
enum Key {
    Feasible(f64),
    Infeasible(f64),
}

impl Key {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Feasible(a), Key::Feasible(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Key::Infeasible(a), Key::Infeasible(b)) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
            (Key::Feasible(_), Key::Infeasible(_)) => Ordering::Greater,
            (Key::Infeasible(_), Key::Feasible(_)) => Ordering::Less,
        }
    }
}

fn rank_fitness(keys: &[Key], pressure: f64) -> Vec<f64> {
    let n = keys.len();
    if n == 1 {
        return vec![1.0];
    }

    // Ascending: worst first
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| keys[a].compare(&keys[b]));

    let mut positions = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && keys[order[end]].compare(&keys[order[start]]) == Ordering::Equal {
            end += 1;
        }
        // Tied individuals share their mean position
        let mean = (start + end - 1) as f64 / 2.0;
        for &i in &order[start..end] {
            positions[i] = mean;
        }
        start = end;
    }

    positions
        .into_iter()
        .map(|p| 2.0 - pressure + 2.0 * (pressure - 1.0) * p / (n - 1) as f64)
        .collect()
}

fn linear_fitness(keys: &[Key]) -> Vec<f64> {
    let (obj_lo, obj_hi) = min_max(keys.iter().filter_map(|k| match k {
        Key::Feasible(v) => Some(*v),
        Key::Infeasible(_) => None,
    }));
    let (cv_lo, cv_hi) = min_max(keys.iter().filter_map(|k| match k {
        Key::Infeasible(v) => Some(*v),
        Key::Feasible(_) => None,
    }));

    keys.iter()
        .map(|k| match *k {
            Key::Feasible(v) if obj_hi > obj_lo => 1.0 + (v - obj_lo) / (obj_hi - obj_lo),
            Key::Feasible(_) => 2.0,
            Key::Infeasible(cv) if cv_hi > cv_lo => 0.1 + 0.8 * (cv_hi - cv) / (cv_hi - cv_lo),
            Key::Infeasible(_) => 0.5,
        })
        .collect()
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scalers() -> Vec<FitnessScaler> {
        vec![FitnessScaler::default(), FitnessScaler::linear()]
    }

    #[test]
    fn test_monotonic_in_objective() {
        let signed = DVector::from_vec(vec![-3.0, 1.0, -1.0, 7.0]);
        for scaler in scalers() {
            let f = scaler.scale(&signed, None).unwrap();
            assert!(f[3] > f[1] && f[1] > f[2] && f[2] > f[0]);
            assert!(f.iter().all(|&v| v > 0.0));
        }
    }

    #[test]
    fn test_feasible_dominates_infeasible() {
        let signed = DVector::from_vec(vec![-1000.0, 50.0, 49.0, -2.0]);
        let cv = DVector::from_vec(vec![0.0, 0.1, 3.0, 0.0]);
        for scaler in scalers() {
            let f = scaler.scale(&signed, Some(&cv)).unwrap();
            let min_feasible = f[0].min(f[3]);
            let max_infeasible = f[1].max(f[2]);
            assert!(min_feasible > max_infeasible);
            // Smaller violation is better
            assert!(f[1] > f[2]);
        }
    }

    #[test]
    fn test_all_tied_is_positive_and_equal() {
        let signed = DVector::from_vec(vec![4.0; 5]);
        for scaler in scalers() {
            let f = scaler.scale(&signed, None).unwrap();
            assert!(f.iter().all(|&v| v > 0.0 && v.is_finite()));
            for v in f.iter() {
                assert_relative_eq!(*v, f[0]);
            }
        }
    }

    #[test]
    fn test_all_infeasible_is_positive() {
        let signed = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let cv = DVector::from_vec(vec![2.0, 2.0, 2.0]);
        for scaler in scalers() {
            let f = scaler.scale(&signed, Some(&cv)).unwrap();
            assert!(f.iter().all(|&v| v > 0.0 && v.is_finite()));
        }
    }

    #[test]
    fn test_rank_values() {
        let scaler = FitnessScaler::rank(1.5).unwrap();
        let f = scaler
            .scale(&DVector::from_vec(vec![10.0, 0.0, 5.0]), None)
            .unwrap();
        assert_relative_eq!(f[1], 0.5);
        assert_relative_eq!(f[2], 1.0);
        assert_relative_eq!(f[0], 1.5);
    }

    #[test]
    fn test_rank_ties_share_fitness() {
        let scaler = FitnessScaler::rank(1.5).unwrap();
        let f = scaler
            .scale(&DVector::from_vec(vec![1.0, 3.0, 3.0, 0.0]), None)
            .unwrap();
        assert_relative_eq!(f[1], f[2]);
        assert!(f[1] > f[0] && f[0] > f[3]);
    }

    #[test]
    fn test_single_individual() {
        let f = FitnessScaler::default()
            .scale(&DVector::from_vec(vec![-2.0]), None)
            .unwrap();
        assert_eq!(f.len(), 1);
        assert!(f[0] > 0.0);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(FitnessScaler::rank(2.0).is_err());
        assert!(FitnessScaler::rank(1.0).is_err());

        let scaler = FitnessScaler::default();
        let signed = DVector::from_vec(vec![1.0, 2.0]);
        let cv = DVector::from_vec(vec![0.0]);
        assert!(matches!(
            scaler.scale(&signed, Some(&cv)),
            Err(EvolutionError::ShapeMismatch { .. })
        ));
        let nan = DVector::from_vec(vec![1.0, f64::NAN]);
        assert!(scaler.scale(&nan, None).is_err());
        assert!(scaler.scale(&DVector::from_vec(vec![]), None).is_err());
    }

    #[test]
    fn test_inputs_untouched() {
        let signed = DVector::from_vec(vec![3.0, 1.0, 2.0]);
        let cv = DVector::from_vec(vec![0.0, 1.0, 0.0]);
        let (s0, c0) = (signed.clone(), cv.clone());
        FitnessScaler::default().scale(&signed, Some(&cv)).unwrap();
        assert_eq!(signed, s0);
        assert_eq!(cv, c0);
    }
}
