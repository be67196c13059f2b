//! Search-space description
//!
//! This module provides variable bounds, repair policies, and the field
//! descriptor that decodes chromosomes into decision variables.

pub mod bounds;
pub mod field;

pub mod prelude {
    pub use super::bounds::*;
    pub use super::field::*;
}
