//! Differential evolution operators
//!
//! This module provides index selection, differential mutation, and binomial
//! crossover over population matrices.

pub mod crossover;
pub mod mutation;
pub mod selection;
pub mod traits;

pub mod prelude {
    pub use super::crossover::*;
    pub use super::mutation::*;
    pub use super::selection::*;
    pub use super::traits::*;
}
