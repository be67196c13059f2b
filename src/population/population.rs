//! Population type
//!
//! This module provides the matrix [`Population`]: a fixed-size set of
//! individuals stored as row-aligned matrices.
//!
//! | matrix  | shape | meaning                                   |
//! |---------|-------|-------------------------------------------|
//! | `chrom` | N×D   | genetic values                            |
//! | `phen`  | N×D   | decoded decision variables                |
//! | `obj_v` | N×M   | objective values                          |
//! | `cv`    | N     | constraint violation, 0 means feasible    |
//! | `fitn_v`| N     | scaled fitness used only for selection    |
//!
//! Every operation returns a new snapshot; nothing is updated in place.

use nalgebra::{DMatrix, DVector};
use rand::Rng;

use crate::error::{ensure_shape, EvoResult, EvolutionError};
use crate::fitness::problem::Direction;
use crate::genome::field::Field;
use crate::population::individual::Individual;

/// A population of individuals stored as aligned matrices
#[derive(Clone, Debug, PartialEq)]
pub struct Population {
    field: Field,
    chrom: DMatrix<f64>,
    phen: Option<DMatrix<f64>>,
    obj_v: Option<DMatrix<f64>>,
    cv: Option<DVector<f64>>,
    fitn_v: Option<DVector<f64>>,
}

impl Population {
    /// Create a population from a chromosome matrix
    pub fn new(field: Field, chrom: DMatrix<f64>) -> EvoResult<Self> {
        if chrom.nrows() == 0 {
            return Err(EvolutionError::EmptyPopulation);
        }
        ensure_shape("Chrom columns", field.dimension(), chrom.ncols())?;
        Ok(Self {
            field,
            chrom,
            phen: None,
            obj_v: None,
            cv: None,
            fitn_v: None,
        })
    }

    /// Create a population from an already decoded decision matrix
    ///
    /// The matrix is used as both chromosome and phenotype.
    pub fn from_phenotype(field: Field, phen: DMatrix<f64>) -> EvoResult<Self> {
        let mut population = Self::new(field, phen.clone())?;
        population.phen = Some(phen);
        Ok(population)
    }

    /// Create a population with chromosomes drawn uniformly inside the field
    pub fn random<R: Rng>(field: Field, size: usize, rng: &mut R) -> EvoResult<Self> {
        if size == 0 {
            return Err(EvolutionError::EmptyPopulation);
        }
        let dimension = field.dimension();
        let mut chrom = DMatrix::zeros(size, dimension);
        for i in 0..size {
            for j in 0..dimension {
                chrom[(i, j)] = field.bound(j).sample(rng);
            }
        }
        Self::new(field, chrom)
    }

    /// Number of individuals (N)
    pub fn sizes(&self) -> usize {
        self.chrom.nrows()
    }

    /// Number of decision variables (D)
    pub fn dimension(&self) -> usize {
        self.chrom.ncols()
    }

    /// Field the chromosomes live in
    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Chromosome matrix
    pub fn chrom(&self) -> &DMatrix<f64> {
        &self.chrom
    }

    /// Phenotype matrix, once decoded
    pub fn phen(&self) -> Option<&DMatrix<f64>> {
        self.phen.as_ref()
    }

    /// Objective matrix, once evaluated
    pub fn obj_v(&self) -> Option<&DMatrix<f64>> {
        self.obj_v.as_ref()
    }

    /// Constraint violations, if the problem is constrained
    pub fn cv(&self) -> Option<&DVector<f64>> {
        self.cv.as_ref()
    }

    /// Scaled fitness, once computed
    pub fn fitn_v(&self) -> Option<&DVector<f64>> {
        self.fitn_v.as_ref()
    }

    /// Whether objective values are present
    pub fn is_evaluated(&self) -> bool {
        self.obj_v.is_some()
    }

    /// Decode the chromosomes through the field
    pub fn decoded(mut self) -> EvoResult<Self> {
        self.phen = Some(self.field.decode(&self.chrom)?);
        Ok(self)
    }

    /// Copy the structure of this population with new chromosomes
    ///
    /// Phenotype, objectives, violations and fitness belong to the old
    /// chromosomes and are dropped.
    pub fn with_chrom(&self, chrom: DMatrix<f64>) -> EvoResult<Self> {
        ensure_shape("Chrom rows", self.sizes(), chrom.nrows())?;
        Self::new(self.field.clone(), chrom)
    }

    /// Attach evaluator output, checking the evaluator contract
    ///
    /// Objectives must have one row per individual and be finite; violations,
    /// when present, must have one entry per individual and be finite and
    /// non-negative. Any previous fitness is dropped.
    pub fn with_objectives(
        mut self,
        obj_v: DMatrix<f64>,
        cv: Option<DVector<f64>>,
    ) -> EvoResult<Self> {
        if obj_v.nrows() != self.sizes() || obj_v.ncols() == 0 {
            return Err(EvolutionError::EvaluatorContract(format!(
                "ObjV must be {}xM with M >= 1, got {}x{}",
                self.sizes(),
                obj_v.nrows(),
                obj_v.ncols()
            )));
        }
        if let Some((i, j)) = first_where(&obj_v, |v| !v.is_finite()) {
            return Err(EvolutionError::EvaluatorContract(format!(
                "ObjV[{}, {}] is not finite ({})",
                i,
                j,
                obj_v[(i, j)]
            )));
        }
        if let Some(ref cv) = cv {
            if cv.len() != self.sizes() {
                return Err(EvolutionError::EvaluatorContract(format!(
                    "CV must have {} rows, got {}",
                    self.sizes(),
                    cv.len()
                )));
            }
            if let Some(i) = cv.iter().position(|v| !v.is_finite() || *v < 0.0) {
                return Err(EvolutionError::EvaluatorContract(format!(
                    "CV[{}] must be finite and non-negative, got {}",
                    i, cv[i]
                )));
            }
        }
        self.obj_v = Some(obj_v);
        self.cv = cv;
        self.fitn_v = None;
        Ok(self)
    }

    /// Attach freshly scaled fitness
    pub fn with_fitness(mut self, fitn_v: DVector<f64>) -> EvoResult<Self> {
        ensure_shape("FitnV rows", self.sizes(), fitn_v.len())?;
        self.fitn_v = Some(fitn_v);
        Ok(self)
    }

    /// Stack `other` below this population
    ///
    /// Optional matrices survive only when both sides carry them; carrying
    /// one on a single side is a shape error. Fitness never survives a merge
    /// and must be rescaled over the merged rows.
    pub fn concat(&self, other: &Self) -> EvoResult<Self> {
        ensure_shape("Chrom columns", self.dimension(), other.dimension())?;
        if self.field != other.field {
            return Err(EvolutionError::Precondition(
                "cannot merge populations over different fields".to_string(),
            ));
        }
        Ok(Self {
            field: self.field.clone(),
            chrom: vstack(&self.chrom, &other.chrom)?,
            phen: merge_optional("Phen", self.phen.as_ref(), other.phen.as_ref(), vstack)?,
            obj_v: merge_optional("ObjV", self.obj_v.as_ref(), other.obj_v.as_ref(), vstack)?,
            cv: merge_optional("CV", self.cv.as_ref(), other.cv.as_ref(), |a, b| {
                Ok(DVector::from_iterator(
                    a.len() + b.len(),
                    a.iter().chain(b.iter()).copied(),
                ))
            })?,
            fitn_v: None,
        })
    }

    /// Build a population from the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> EvoResult<Self> {
        if indices.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.sizes()) {
            return Err(EvolutionError::Precondition(format!(
                "row index {} out of range for population of {}",
                bad,
                self.sizes()
            )));
        }
        let pick = |m: &DMatrix<f64>| {
            DMatrix::from_fn(indices.len(), m.ncols(), |r, c| m[(indices[r], c)])
        };
        let pick_vec =
            |v: &DVector<f64>| DVector::from_iterator(indices.len(), indices.iter().map(|&i| v[i]));
        Ok(Self {
            field: self.field.clone(),
            chrom: pick(&self.chrom),
            phen: self.phen.as_ref().map(pick),
            obj_v: self.obj_v.as_ref().map(pick),
            cv: self.cv.as_ref().map(pick_vec),
            fitn_v: self.fitn_v.as_ref().map(pick_vec),
        })
    }

    /// Keep the first `size` individuals
    pub fn truncate(&self, size: usize) -> EvoResult<Self> {
        let size = size.min(self.sizes());
        let indices: Vec<usize> = (0..size).collect();
        self.select_rows(&indices)
    }

    /// Constraint violation of individual `i` (0 when unconstrained)
    pub fn violation(&self, i: usize) -> f64 {
        self.cv.as_ref().map_or(0.0, |cv| cv[i])
    }

    /// Number of feasible individuals
    pub fn feasible_count(&self) -> usize {
        match self.cv {
            Some(ref cv) => cv.iter().filter(|&&v| v <= 0.0).count(),
            None => self.sizes(),
        }
    }

    /// Copy out individual `i`
    pub fn individual(&self, i: usize) -> Option<Individual> {
        if i >= self.sizes() {
            return None;
        }
        let row = |m: &DMatrix<f64>| m.row(i).iter().copied().collect::<Vec<f64>>();
        Some(Individual {
            chrom: row(&self.chrom),
            phen: self.phen.as_ref().map(row).unwrap_or_default(),
            objectives: self.obj_v.as_ref().map(row).unwrap_or_default(),
            cv: self.violation(i),
            fitness: self.fitn_v.as_ref().map(|f| f[i]),
        })
    }

    /// Index of the best evaluated individual
    ///
    /// Feasible individuals are compared on the first objective in the given
    /// direction; if none is feasible the least violating one is returned.
    pub fn best_index(&self, direction: Direction) -> Option<usize> {
        let obj_v = self.obj_v.as_ref()?;
        let mut best: Option<usize> = None;
        for i in 0..self.sizes() {
            best = match best {
                None => Some(i),
                Some(b) => {
                    let (fi, fb) = (self.violation(i) <= 0.0, self.violation(b) <= 0.0);
                    let better = match (fi, fb) {
                        (true, false) => true,
                        (false, true) => false,
                        (true, true) => direction.is_better(obj_v[(i, 0)], obj_v[(b, 0)]),
                        (false, false) => self.violation(i) < self.violation(b),
                    };
                    Some(if better { i } else { b })
                }
            };
        }
        best
    }

    /// Check that every present matrix agrees with `sizes` and the field
    pub fn validate(&self) -> EvoResult<()> {
        let n = self.sizes();
        if n == 0 {
            return Err(EvolutionError::EmptyPopulation);
        }
        ensure_shape("Chrom columns", self.field.dimension(), self.dimension())?;
        if let Some(ref phen) = self.phen {
            ensure_shape("Phen rows", n, phen.nrows())?;
            ensure_shape("Phen columns", self.dimension(), phen.ncols())?;
        }
        if let Some(ref obj_v) = self.obj_v {
            ensure_shape("ObjV rows", n, obj_v.nrows())?;
        }
        if let Some(ref cv) = self.cv {
            ensure_shape("CV rows", n, cv.len())?;
        }
        if let Some(ref fitn_v) = self.fitn_v {
            ensure_shape("FitnV rows", n, fitn_v.len())?;
        }
        Ok(())
    }
}

/// Stack two matrices vertically
pub(crate) fn vstack(top: &DMatrix<f64>, bottom: &DMatrix<f64>) -> EvoResult<DMatrix<f64>> {
    ensure_shape("stacked columns", top.ncols(), bottom.ncols())?;
    let split = top.nrows();
    Ok(DMatrix::from_fn(
        split + bottom.nrows(),
        top.ncols(),
        |i, j| {
            if i < split {
                top[(i, j)]
            } else {
                bottom[(i - split, j)]
            }
        },
    ))
}

fn merge_optional<T, F>(
    what: &str,
    a: Option<&T>,
    b: Option<&T>,
    merge: F,
) -> EvoResult<Option<T>>
where
    F: FnOnce(&T, &T) -> EvoResult<T>,
{
    match (a, b) {
        (Some(a), Some(b)) => merge(a, b).map(Some),
        (None, None) => Ok(None),
        _ => Err(EvolutionError::Precondition(format!(
            "{} present on only one side of a merge",
            what
        ))),
    }
}

fn first_where<P: Fn(f64) -> bool>(m: &DMatrix<f64>, pred: P) -> Option<(usize, usize)> {
    (0..m.nrows())
        .flat_map(|i| (0..m.ncols()).map(move |j| (i, j)))
        .find(|&(i, j)| pred(m[(i, j)]))
}
