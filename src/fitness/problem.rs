//! Objective evaluator contract
//!
//! A [`Problem`] maps a phenotype matrix (one decision vector per row) to an
//! objective matrix and, for constrained problems, a constraint-violation
//! vector. The library treats it as an untrusted black box: everything it
//! returns is checked before it reaches a population.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{EvoResult, EvolutionError};
use crate::genome::field::Field;
use crate::population::population::Population;

/// Optimization direction of the objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Smaller objective values are better
    #[default]
    Minimize,
    /// Larger objective values are better
    Maximize,
}

impl Direction {
    /// Factor that turns an objective into a larger-is-better value
    pub fn sign(&self) -> f64 {
        match self {
            Self::Minimize => -1.0,
            Self::Maximize => 1.0,
        }
    }

    /// Whether objective `a` is strictly better than `b`
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        match self {
            Self::Minimize => a < b,
            Self::Maximize => a > b,
        }
    }
}

/// Output of one evaluator call
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Objective values, N×M
    pub obj_v: DMatrix<f64>,
    /// Constraint violations, N entries, absent for unconstrained problems
    pub cv: Option<DVector<f64>>,
}

impl Evaluation {
    /// Unconstrained evaluation result
    pub fn unconstrained(obj_v: DMatrix<f64>) -> Self {
        Self { obj_v, cv: None }
    }

    /// Constrained evaluation result
    pub fn constrained(obj_v: DMatrix<f64>, cv: DVector<f64>) -> Self {
        Self { obj_v, cv: Some(cv) }
    }
}

/// Objective evaluator
///
/// Implementations must be stateless across calls: the same phenotype matrix
/// must always produce the same evaluation.
pub trait Problem {
    /// Name used in logs and results
    fn name(&self) -> &str {
        "problem"
    }

    /// Search space of the problem
    fn field(&self) -> Field;

    /// Whether the objective is minimized or maximized
    fn direction(&self) -> Direction {
        Direction::Minimize
    }

    /// Evaluate every row of `phen`
    fn evaluate(&self, phen: &DMatrix<f64>) -> EvoResult<Evaluation>;
}

/// Run `problem` on a decoded population and attach the checked results
pub fn evaluate<P: Problem + ?Sized>(problem: &P, population: Population) -> EvoResult<Population> {
    let phen = population.phen().ok_or_else(|| {
        EvolutionError::Precondition("population must be decoded before evaluation".to_string())
    })?;
    let evaluation = problem.evaluate(phen)?;
    population.with_objectives(evaluation.obj_v, evaluation.cv)
}

type RowFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// Problem built from per-row closures
///
/// Rows are evaluated in parallel when the `parallel` feature is enabled; the
/// output order always follows the input rows.
pub struct ObjectiveFn {
    name: String,
    field: Field,
    direction: Direction,
    objective: Box<RowFn>,
    violation: Option<Box<RowFn>>,
}

impl ObjectiveFn {
    /// Create a minimization problem from an objective closure
    pub fn new<F>(field: Field, objective: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: "objective".to_string(),
            field,
            direction: Direction::Minimize,
            objective: Box::new(objective),
            violation: None,
        }
    }

    /// Set the problem name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the optimization direction
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Add a constraint-violation closure (0 means feasible)
    pub fn with_violation<C>(mut self, violation: C) -> Self
    where
        C: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        self.violation = Some(Box::new(violation));
        self
    }

    fn map_rows(rows: &[Vec<f64>], f: &RowFn) -> Vec<f64> {
        #[cfg(feature = "parallel")]
        {
            rows.par_iter().map(|row| f(row.as_slice())).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            rows.iter().map(|row| f(row.as_slice())).collect()
        }
    }
}

impl Problem for ObjectiveFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn field(&self) -> Field {
        self.field.clone()
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn evaluate(&self, phen: &DMatrix<f64>) -> EvoResult<Evaluation> {
        let rows: Vec<Vec<f64>> = phen
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect();
        let objectives = Self::map_rows(&rows, self.objective.as_ref());
        let obj_v = DMatrix::from_vec(rows.len(), 1, objectives);
        let cv = self
            .violation
            .as_ref()
            .map(|v| DVector::from_vec(Self::map_rows(&rows, v.as_ref())));
        Ok(Evaluation { obj_v, cv })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_sign() {
        assert_eq!(Direction::Minimize.sign(), -1.0);
        assert_eq!(Direction::Maximize.sign(), 1.0);
        assert!(Direction::Minimize.is_better(1.0, 2.0));
        assert!(!Direction::Minimize.is_better(2.0, 2.0));
        assert!(Direction::Maximize.is_better(3.0, 2.0));
    }

    #[test]
    fn test_objective_fn_preserves_row_order() {
        let field = Field::symmetric(10.0, 2);
        let problem = ObjectiveFn::new(field, |x| x[0] * 10.0 + x[1]);
        let phen = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let evaluation = problem.evaluate(&phen).unwrap();
        assert_eq!(evaluation.obj_v.nrows(), 3);
        assert_eq!(evaluation.obj_v[(0, 0)], 12.0);
        assert_eq!(evaluation.obj_v[(1, 0)], 34.0);
        assert_eq!(evaluation.obj_v[(2, 0)], 56.0);
        assert!(evaluation.cv.is_none());
    }

    #[test]
    fn test_objective_fn_violation() {
        let field = Field::symmetric(10.0, 1);
        let problem =
            ObjectiveFn::new(field, |x| x[0]).with_violation(|x| (x[0] - 1.0).max(0.0));
        let phen = DMatrix::from_row_slice(2, 1, &[0.5, 3.0]);
        let evaluation = problem.evaluate(&phen).unwrap();
        let cv = evaluation.cv.unwrap();
        assert_eq!(cv[0], 0.0);
        assert_eq!(cv[1], 2.0);
    }

    #[test]
    fn test_evaluate_requires_decoded_population() {
        let field = Field::symmetric(1.0, 1);
        let problem = ObjectiveFn::new(field.clone(), |x| x[0]);
        let pop = Population::new(field, DMatrix::zeros(2, 1)).unwrap();
        assert!(matches!(
            evaluate(&problem, pop.clone()),
            Err(EvolutionError::Precondition(_))
        ));
        let pop = evaluate(&problem, pop.decoded().unwrap()).unwrap();
        assert!(pop.is_evaluated());
    }

    #[test]
    fn test_evaluate_rejects_non_finite() {
        let field = Field::symmetric(1.0, 1);
        let problem = ObjectiveFn::new(field.clone(), |_| f64::INFINITY);
        let pop = Population::new(field, DMatrix::zeros(2, 1))
            .unwrap()
            .decoded()
            .unwrap();
        assert!(matches!(
            evaluate(&problem, pop),
            Err(EvolutionError::EvaluatorContract(_))
        ));
    }
}
