//! Evolutionary algorithms
//!
//! This module provides the differential evolution loop.

pub mod target_to_best;

pub mod prelude {
    pub use super::target_to_best::*;
}
