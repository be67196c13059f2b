//! Field descriptor and decoder
//!
//! A [`Field`] declares how a chromosome matrix maps onto decision variables:
//! the encoding, per-variable bounds, and whether each variable is continuous
//! or integer. Decoding a real-integer chromosome is the identity except for
//! integer variables, which are rounded to the nearest admissible integer.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_shape, EvoResult, EvolutionError};
use crate::genome::bounds::Bounds;

/// Chromosome encoding of a population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Real-valued (or integer-valued) genes stored directly
    RealInteger,
    /// Gray-coded bit strings
    BinaryGray,
    /// Permutations of variable indices
    Permutation,
}

impl Encoding {
    /// Short code for this encoding
    pub fn code(&self) -> &'static str {
        match self {
            Self::RealInteger => "RI",
            Self::BinaryGray => "BG",
            Self::Permutation => "P",
        }
    }
}

/// Kind of a single decision variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// Any real value inside the bounds
    #[default]
    Continuous,
    /// Integral values inside the bounds
    Integer,
}

/// Declared search space for a population's chromosomes
///
/// Deserialization goes through [`Field::new`], so a decoded field always has
/// one kind per variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldSpec")]
pub struct Field {
    encoding: Encoding,
    bounds: Vec<Bounds>,
    kinds: Vec<VariableKind>,
}

impl Field {
    /// Create a field, checking that bounds and kinds line up
    pub fn new(
        encoding: Encoding,
        bounds: Vec<Bounds>,
        kinds: Vec<VariableKind>,
    ) -> EvoResult<Self> {
        if bounds.is_empty() {
            return Err(EvolutionError::Precondition(
                "field must declare at least one variable".to_string(),
            ));
        }
        ensure_shape("field variable kinds", bounds.len(), kinds.len())?;
        Ok(Self {
            encoding,
            bounds,
            kinds,
        })
    }

    /// Real-integer field whose variables are all continuous
    pub fn continuous(bounds: Vec<Bounds>) -> Self {
        let kinds = vec![VariableKind::Continuous; bounds.len()];
        Self {
            encoding: Encoding::RealInteger,
            bounds,
            kinds,
        }
    }

    /// Real-integer continuous field with the same bounds on every variable
    pub fn uniform(bound: Bounds, dimension: usize) -> Self {
        Self::continuous(vec![bound; dimension])
    }

    /// Real-integer continuous field over `[-half_width, half_width]^dimension`
    pub fn symmetric(half_width: f64, dimension: usize) -> Self {
        Self::uniform(Bounds::symmetric(half_width), dimension)
    }

    /// Replace the variable kinds
    pub fn with_kinds(mut self, kinds: Vec<VariableKind>) -> EvoResult<Self> {
        ensure_shape("field variable kinds", self.bounds.len(), kinds.len())?;
        self.kinds = kinds;
        Ok(self)
    }

    /// Encoding of chromosomes over this field
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Number of decision variables
    pub fn dimension(&self) -> usize {
        self.bounds.len()
    }

    /// All per-variable bounds
    pub fn bounds(&self) -> &[Bounds] {
        &self.bounds
    }

    /// Bounds of variable `j`
    pub fn bound(&self, j: usize) -> &Bounds {
        &self.bounds[j]
    }

    /// Kinds of all variables
    pub fn kinds(&self) -> &[VariableKind] {
        &self.kinds
    }

    /// Check that every gene of every row lies inside its bounds
    pub fn contains(&self, chrom: &DMatrix<f64>) -> bool {
        chrom.ncols() == self.dimension()
            && chrom
                .row_iter()
                .all(|row| row.iter().zip(&self.bounds).all(|(&v, b)| b.contains(v)))
    }

    /// Decode a chromosome matrix into the phenotype matrix
    pub fn decode(&self, chrom: &DMatrix<f64>) -> EvoResult<DMatrix<f64>> {
        if self.encoding != Encoding::RealInteger {
            return Err(EvolutionError::Precondition(format!(
                "cannot decode encoding '{}' as real-integer",
                self.encoding.code()
            )));
        }
        ensure_shape("Chrom columns", self.dimension(), chrom.ncols())?;

        let mut phen = chrom.clone();
        for (j, kind) in self.kinds.iter().enumerate() {
            if *kind == VariableKind::Integer {
                let b = &self.bounds[j];
                for v in phen.column_mut(j).iter_mut() {
                    *v = integer_in(b, *v);
                }
            }
        }
        Ok(phen)
    }
}

#[derive(Deserialize)]
struct FieldSpec {
    encoding: Encoding,
    bounds: Vec<Bounds>,
    kinds: Vec<VariableKind>,
}

impl TryFrom<FieldSpec> for Field {
    type Error = EvolutionError;

    fn try_from(spec: FieldSpec) -> EvoResult<Self> {
        Field::new(spec.encoding, spec.bounds, spec.kinds)
    }
}

/// Nearest integer to `value` that still lies inside `bounds`
fn integer_in(bounds: &Bounds, value: f64) -> f64 {
    let rounded = value.round();
    if rounded < bounds.min {
        bounds.min.ceil()
    } else if rounded > bounds.max {
        bounds.max.floor()
    } else {
        rounded
    }
}
