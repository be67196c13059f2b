//! Benchmark problems
//!
//! This module provides standard benchmark functions for testing the
//! optimizer. All of them are minimization problems.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};

use crate::error::{ensure_shape, EvoResult};
use crate::fitness::problem::{Direction, Evaluation, Problem};
use crate::genome::field::Field;

/// Trait for benchmark functions
pub trait BenchmarkFunction: Send + Sync {
    /// Name of the benchmark function
    fn name(&self) -> &'static str;

    /// Dimensionality of the problem
    fn dimension(&self) -> usize;

    /// Search space bounds (min, max), the same on every variable
    fn bounds(&self) -> (f64, f64);

    /// Optimal (minimum) objective value
    fn optimal_value(&self) -> f64;

    /// Evaluate the function on one decision vector
    fn evaluate_raw(&self, x: &[f64]) -> f64;
}

/// Sphere function: f(x) = Σxᵢ²
///
/// Unimodal, convex, separable. Optimum at origin.
#[derive(Clone, Debug)]
pub struct Sphere {
    dimension: usize,
    half_width: f64,
}

impl Sphere {
    /// Create a new Sphere function over [-5.12, 5.12]^n
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            half_width: 5.12,
        }
    }

    /// Use `[-half_width, half_width]` on every variable
    pub fn with_half_width(mut self, half_width: f64) -> Self {
        self.half_width = half_width;
        self
    }
}

impl BenchmarkFunction for Sphere {
    fn name(&self) -> &'static str {
        "Sphere"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn bounds(&self) -> (f64, f64) {
        (-self.half_width, self.half_width)
    }

    fn optimal_value(&self) -> f64 {
        0.0
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        x.iter().map(|xi| xi * xi).sum()
    }
}

/// Rastrigin function: f(x) = 10n + Σ(xᵢ² - 10cos(2πxᵢ))
///
/// Highly multimodal with many local minima. Optimum at origin.
#[derive(Clone, Debug)]
pub struct Rastrigin {
    dimension: usize,
}

impl Rastrigin {
    /// Create a new Rastrigin function
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl BenchmarkFunction for Rastrigin {
    fn name(&self) -> &'static str {
        "Rastrigin"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn bounds(&self) -> (f64, f64) {
        (-5.12, 5.12)
    }

    fn optimal_value(&self) -> f64 {
        0.0
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        let n = x.len() as f64;
        10.0 * n
            + x.iter()
                .map(|xi| xi * xi - 10.0 * (2.0 * PI * xi).cos())
                .sum::<f64>()
    }
}

/// Rosenbrock function: f(x) = Σ[100(xᵢ₊₁ - xᵢ²)² + (1 - xᵢ)²]
///
/// Valley structure, non-separable. Optimum at (1,1,...,1).
#[derive(Clone, Debug)]
pub struct Rosenbrock {
    dimension: usize,
}

impl Rosenbrock {
    /// Create a new Rosenbrock function
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl BenchmarkFunction for Rosenbrock {
    fn name(&self) -> &'static str {
        "Rosenbrock"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn bounds(&self) -> (f64, f64) {
        (-5.0, 10.0)
    }

    fn optimal_value(&self) -> f64 {
        0.0
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        x.windows(2)
            .map(|w| 100.0 * (w[1] - w[0] * w[0]).powi(2) + (1.0 - w[0]).powi(2))
            .sum()
    }
}

/// Ackley function
///
/// Multimodal with a nearly flat outer region. Optimum at origin.
#[derive(Clone, Debug)]
pub struct Ackley {
    dimension: usize,
}

impl Ackley {
    /// Create a new Ackley function
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl BenchmarkFunction for Ackley {
    fn name(&self) -> &'static str {
        "Ackley"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn bounds(&self) -> (f64, f64) {
        (-32.768, 32.768)
    }

    fn optimal_value(&self) -> f64 {
        0.0
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        let n = x.len() as f64;
        let sum_sq = x.iter().map(|xi| xi * xi).sum::<f64>() / n;
        let sum_cos = x.iter().map(|xi| (2.0 * PI * xi).cos()).sum::<f64>() / n;
        -20.0 * (-0.2 * sum_sq.sqrt()).exp() - sum_cos.exp() + 20.0 + std::f64::consts::E
    }
}

fn evaluate_rows<B: BenchmarkFunction>(bench: &B, phen: &DMatrix<f64>) -> EvoResult<DMatrix<f64>> {
    ensure_shape("Phen columns", bench.dimension(), phen.ncols())?;
    let values: Vec<f64> = phen
        .row_iter()
        .map(|row| {
            let x: Vec<f64> = row.iter().copied().collect();
            bench.evaluate_raw(&x)
        })
        .collect();
    Ok(DMatrix::from_vec(values.len(), 1, values))
}

macro_rules! benchmark_problem {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Problem for $ty {
                fn name(&self) -> &str {
                    BenchmarkFunction::name(self)
                }

                fn field(&self) -> Field {
                    let (lo, hi) = BenchmarkFunction::bounds(self);
                    Field::uniform(
                        crate::genome::bounds::Bounds::new(lo, hi),
                        BenchmarkFunction::dimension(self),
                    )
                }

                fn direction(&self) -> Direction {
                    Direction::Minimize
                }

                fn evaluate(&self, phen: &DMatrix<f64>) -> EvoResult<Evaluation> {
                    evaluate_rows(self, phen).map(Evaluation::unconstrained)
                }
            }
        )*
    };
}

benchmark_problem!(Sphere, Rastrigin, Rosenbrock, Ackley);

/// Sphere restricted to the half-space Σxᵢ ≥ 1
///
/// The violation is `max(0, 1 - Σxᵢ)`. Optimum at xᵢ = 1/n with value 1/n.
#[derive(Clone, Debug)]
pub struct ConstrainedSphere {
    dimension: usize,
}

impl ConstrainedSphere {
    /// Create a new constrained sphere
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Optimal objective value
    pub fn optimal_value(&self) -> f64 {
        1.0 / self.dimension as f64
    }
}

impl Problem for ConstrainedSphere {
    fn name(&self) -> &str {
        "ConstrainedSphere"
    }

    fn field(&self) -> Field {
        Field::symmetric(5.0, self.dimension)
    }

    fn evaluate(&self, phen: &DMatrix<f64>) -> EvoResult<Evaluation> {
        ensure_shape("Phen columns", self.dimension, phen.ncols())?;
        let obj_v = DMatrix::from_fn(phen.nrows(), 1, |i, _| {
            phen.row(i).iter().map(|x| x * x).sum::<f64>()
        });
        let cv = DVector::from_fn(phen.nrows(), |i, _| (1.0 - phen.row(i).sum()).max(0.0));
        Ok(Evaluation::constrained(obj_v, cv))
    }
}
