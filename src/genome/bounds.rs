//! Bounds for decision variables
//!
//! This module provides per-variable bounds and the repair policies used to
//! bring out-of-range genes back into the search box.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EvoResult, EvolutionError};

/// Bounds for a single decision variable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct Bounds {
    /// Lower bound (inclusive)
    pub min: f64,
    /// Upper bound (inclusive)
    pub max: f64,
}

impl Bounds {
    /// Create new bounds
    ///
    /// # Panics
    /// Panics if min > max or either end is not finite
    pub fn new(min: f64, max: f64) -> Self {
        assert!(
            min.is_finite() && max.is_finite() && min <= max,
            "Invalid bounds: min ({}) must be <= max ({}) and both finite",
            min,
            max
        );
        Self { min, max }
    }

    /// Create new bounds, rejecting min > max and non-finite ends
    pub fn try_new(min: f64, max: f64) -> EvoResult<Self> {
        if min.is_finite() && max.is_finite() && min <= max {
            Ok(Self { min, max })
        } else {
            Err(EvolutionError::Precondition(format!(
                "invalid bounds: min ({}) must be <= max ({}) and both finite",
                min, max
            )))
        }
    }

    /// Create symmetric bounds centered at 0
    pub fn symmetric(half_width: f64) -> Self {
        Self::new(-half_width, half_width)
    }

    /// Get the range (max - min)
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Check if a value is within bounds
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp a value to be within bounds
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Mirror a value back across the bound it crossed
    ///
    /// Overshoots larger than the range land on the crossed bound.
    pub fn reflect(&self, value: f64) -> f64 {
        let reflected = if value < self.min {
            2.0 * self.min - value
        } else if value > self.max {
            2.0 * self.max - value
        } else {
            return value;
        };
        self.clamp(reflected)
    }

    /// Draw a value uniformly from the bounds
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.range() > 0.0 {
            rng.gen_range(self.min..=self.max)
        } else {
            self.min
        }
    }
}

#[derive(Deserialize)]
struct RawBounds {
    min: f64,
    max: f64,
}

impl TryFrom<RawBounds> for Bounds {
    type Error = EvolutionError;

    fn try_from(raw: RawBounds) -> EvoResult<Self> {
        Self::try_new(raw.min, raw.max)
    }
}

impl From<(f64, f64)> for Bounds {
    fn from((min, max): (f64, f64)) -> Self {
        Self::new(min, max)
    }
}

/// Policy for repairing genes that leave their bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryRepair {
    /// Clamp onto the violated bound
    Clip,
    /// Mirror back into the box across the violated bound
    #[default]
    Reflect,
    /// Replace with a uniform draw inside the bounds
    Resample,
}

impl BoundaryRepair {
    /// Repair a single value; values already in bounds are returned unchanged
    pub fn apply<R: Rng>(&self, value: f64, bounds: &Bounds, rng: &mut R) -> f64 {
        if bounds.contains(value) {
            return value;
        }
        match self {
            Self::Clip => bounds.clamp(value),
            Self::Reflect => bounds.reflect(value),
            Self::Resample => bounds.sample(rng),
        }
    }

    /// Short name used in log output
    pub fn name(&self) -> &'static str {
        match self {
            Self::Clip => "clip",
            Self::Reflect => "reflect",
            Self::Resample => "resample",
        }
    }
}
