//! Matrix populations
//!
//! This module provides the row-aligned [`population::Population`] and the
//! detached [`individual::Individual`] snapshot.

pub mod individual;
#[allow(clippy::module_inception)]
pub mod population;

pub mod prelude {
    pub use super::individual::*;
    pub use super::population::*;
}
