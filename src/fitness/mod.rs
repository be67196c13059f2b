//! Fitness evaluation and scaling
//!
//! This module provides the objective evaluator contract, benchmark
//! problems, and the fitness scaler used for selection.

pub mod benchmarks;
pub mod problem;
pub mod scaling;

pub mod prelude {
    pub use super::benchmarks::*;
    pub use super::problem::*;
    pub use super::scaling::*;
}
