//! DE/target-to-best/1/bin
//!
//! Differential evolution with a stochastic target-to-best base vector,
//! binomial crossover and one-to-one survivor replacement.
//!
//! One generation:
//!
//! 1. draw `r0` by fitness-proportional selection on the current fitness;
//! 2. build base vectors `Xr0 = X + k * (X[r0] - X)`;
//! 3. mutate: `V = Xr0 + F * (X[r1] - X[r2])`, repairing out-of-bounds genes;
//! 4. recombine `[X; V]` binomially into trial vectors `U`;
//! 5. decode and evaluate `U` once (N evaluations);
//! 6. rescale fitness over `[X; U]` and keep, per position, the parent unless
//!    its trial is strictly fitter.

use std::time::Instant;

use log::{debug, info, trace};
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{EvolutionResult, EvolutionStats, GenerationStats};
use crate::error::{ensure_shape, EvoResult, EvolutionError};
use crate::fitness::problem::{evaluate, Direction, Problem};
use crate::fitness::scaling::{FitnessScaler, ScalingMethod};
use crate::genome::bounds::BoundaryRepair;
use crate::genome::field::{Encoding, Field};
use crate::operators::crossover::BinomialCrossover;
use crate::operators::mutation::DifferentialMutation;
use crate::operators::selection::{Ecs, Otos};
use crate::operators::traits::{IndexSelector, MatrixCrossover, MatrixMutation};
use crate::population::population::{vstack, Population};
use crate::termination::{EvolutionState, MaxGenerations, TerminationCriterion};

/// Configuration for DE/target-to-best/1/bin
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeConfig {
    /// Differential scale factor F
    pub scale_factor: f64,
    /// Binomial crossover rate Cr
    pub crossover_rate: f64,
    /// Blend k of the base vector towards the selected candidate
    pub base_blend: f64,
    /// Fitness scaling method
    pub scaling: ScalingMethod,
    /// Repair for mutant genes outside the bounds
    pub repair: BoundaryRepair,
    /// Whether to keep per-generation statistics
    pub record_history: bool,
}

impl Default for DeConfig {
    fn default() -> Self {
        Self {
            scale_factor: 0.5,
            crossover_rate: 0.5,
            base_blend: 0.5,
            scaling: ScalingMethod::default(),
            repair: BoundaryRepair::default(),
            record_history: true,
        }
    }
}

impl DeConfig {
    /// Check every parameter range
    pub fn validate(&self) -> EvoResult<()> {
        if !(self.scale_factor.is_finite() && self.scale_factor > 0.0) {
            return Err(EvolutionError::Configuration(format!(
                "scale factor F must be finite and positive, got {}",
                self.scale_factor
            )));
        }
        if !(self.crossover_rate > 0.0 && self.crossover_rate <= 1.0) {
            return Err(EvolutionError::Configuration(format!(
                "crossover rate Cr must lie in (0, 1], got {}",
                self.crossover_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.base_blend) {
            return Err(EvolutionError::Configuration(format!(
                "base blend k must lie in [0, 1], got {}",
                self.base_blend
            )));
        }
        FitnessScaler::new(self.scaling)?;
        Ok(())
    }

    /// Parse and validate a JSON configuration; missing keys take defaults
    pub fn from_json(json: &str) -> EvoResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EvolutionError::Configuration(format!("invalid JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize as JSON
    pub fn to_json(&self) -> EvoResult<String> {
        serde_json::to_string(self).map_err(|e| EvolutionError::Configuration(e.to_string()))
    }
}

/// Phase of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// Chromosomes present, nothing evaluated
    Initialized,
    /// Initial evaluation and seed merge
    EvaluatingInitial,
    /// Generations running
    Iterating,
    /// Termination criterion satisfied
    Terminated,
}

impl LoopState {
    fn advance(self, next: LoopState) -> LoopState {
        trace!("loop state {:?} -> {:?}", self, next);
        next
    }
}

/// Run counters handed to a [`Finisher`]
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Generations completed
    pub generations: usize,
    /// Total objective evaluations
    pub evaluations: usize,
    /// Optimization direction of the problem
    pub direction: Direction,
    /// Phase the loop ended in
    pub state: LoopState,
    /// Collected statistics
    pub stats: EvolutionStats,
}

/// Intermediate matrices of one generation
#[derive(Clone, Debug, PartialEq)]
pub struct Offspring {
    /// Candidate row drawn for each base vector
    pub r0: Vec<usize>,
    /// Base vectors `Xr0`
    pub base: DMatrix<f64>,
    /// Mutant vectors `V`, repaired into the bounds
    pub mutant: DMatrix<f64>,
    /// Trial vectors `U`
    pub trial: DMatrix<f64>,
}

/// Turns the final population into the caller's result, once per run
pub trait Finisher {
    /// Result type
    type Output;

    /// Consume the final population
    fn finish(&self, population: Population, summary: RunSummary) -> EvoResult<Self::Output>;
}

impl<F, O> Finisher for F
where
    F: Fn(Population, RunSummary) -> EvoResult<O>,
{
    type Output = O;

    fn finish(&self, population: Population, summary: RunSummary) -> EvoResult<O> {
        self(population, summary)
    }
}

/// Default finisher: reports the best individual of the final population
#[derive(Clone, Copy, Debug, Default)]
pub struct BestIndividualFinisher;

impl Finisher for BestIndividualFinisher {
    type Output = EvolutionResult;

    fn finish(&self, population: Population, summary: RunSummary) -> EvoResult<EvolutionResult> {
        let best = population
            .best_index(summary.direction)
            .and_then(|i| population.individual(i))
            .ok_or_else(|| {
                EvolutionError::Precondition("final population is not evaluated".to_string())
            })?;
        Ok(EvolutionResult {
            best_objective: best.objective(),
            best,
            generations: summary.generations,
            evaluations: summary.evaluations,
            stats: summary.stats,
            population,
        })
    }
}

/// Builder for DeTargetToBest1Bin
pub struct DeTargetToBest1BinBuilder<P, T> {
    config: DeConfig,
    problem: Option<P>,
    termination: Option<T>,
}

impl DeTargetToBest1BinBuilder<(), ()> {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: DeConfig::default(),
            problem: None,
            termination: None,
        }
    }
}

impl Default for DeTargetToBest1BinBuilder<(), ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T> DeTargetToBest1BinBuilder<P, T> {
    /// Replace the whole configuration
    pub fn config(mut self, config: DeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the scale factor F
    pub fn scale_factor(mut self, f: f64) -> Self {
        self.config.scale_factor = f;
        self
    }

    /// Set the crossover rate Cr
    pub fn crossover_rate(mut self, cr: f64) -> Self {
        self.config.crossover_rate = cr;
        self
    }

    /// Set the base-vector blend k
    pub fn base_blend(mut self, k: f64) -> Self {
        self.config.base_blend = k;
        self
    }

    /// Set the fitness scaling method
    pub fn scaling(mut self, scaling: ScalingMethod) -> Self {
        self.config.scaling = scaling;
        self
    }

    /// Set the boundary repair
    pub fn repair(mut self, repair: BoundaryRepair) -> Self {
        self.config.repair = repair;
        self
    }

    /// Enable or disable per-generation statistics
    pub fn record_history(mut self, enabled: bool) -> Self {
        self.config.record_history = enabled;
        self
    }

    /// Set the problem to optimize
    pub fn problem<NewP>(self, problem: NewP) -> DeTargetToBest1BinBuilder<NewP, T>
    where
        NewP: Problem,
    {
        DeTargetToBest1BinBuilder {
            config: self.config,
            problem: Some(problem),
            termination: self.termination,
        }
    }

    /// Set the termination criterion
    pub fn termination<NewT>(self, termination: NewT) -> DeTargetToBest1BinBuilder<P, NewT>
    where
        NewT: TerminationCriterion,
    {
        DeTargetToBest1BinBuilder {
            config: self.config,
            problem: self.problem,
            termination: Some(termination),
        }
    }

    /// Set max generations (convenience method)
    pub fn max_generations(self, max: usize) -> DeTargetToBest1BinBuilder<P, MaxGenerations> {
        self.termination(MaxGenerations::new(max))
    }
}

impl<P, T> DeTargetToBest1BinBuilder<P, T>
where
    P: Problem,
    T: TerminationCriterion,
{
    /// Build the optimizer
    pub fn build(self) -> EvoResult<DeTargetToBest1Bin<P, T>> {
        self.config.validate()?;

        let problem = self.problem.ok_or_else(|| {
            EvolutionError::Configuration("Problem must be specified".to_string())
        })?;

        let termination = self.termination.ok_or_else(|| {
            EvolutionError::Configuration("Termination criterion must be specified".to_string())
        })?;

        Ok(DeTargetToBest1Bin {
            scaler: FitnessScaler::new(self.config.scaling)?,
            mutation: DifferentialMutation::new(self.config.scale_factor)
                .with_repair(self.config.repair),
            crossover: BinomialCrossover::new(self.config.crossover_rate),
            candidates: Ecs::new(),
            survivors: Otos::new(),
            config: self.config,
            problem,
            termination,
        })
    }
}

/// DE/target-to-best/1/bin optimizer
pub struct DeTargetToBest1Bin<P, T> {
    config: DeConfig,
    problem: P,
    termination: T,
    scaler: FitnessScaler,
    mutation: DifferentialMutation,
    crossover: BinomialCrossover,
    candidates: Ecs,
    survivors: Otos,
}

impl DeTargetToBest1Bin<(), ()> {
    /// Create a builder
    pub fn builder() -> DeTargetToBest1BinBuilder<(), ()> {
        DeTargetToBest1BinBuilder::new()
    }
}

impl<P, T> DeTargetToBest1Bin<P, T>
where
    P: Problem,
    T: TerminationCriterion,
{
    /// Configuration in use
    pub fn config(&self) -> &DeConfig {
        &self.config
    }

    /// Problem being optimized
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Sample a population of `size` uniformly inside the problem's field
    pub fn initial_population<R: Rng>(&self, size: usize, rng: &mut R) -> EvoResult<Population> {
        Population::random(self.problem.field(), size, rng)
    }

    /// Run from `population` and report the best individual
    pub fn run<R: Rng>(&self, population: Population, rng: &mut R) -> EvoResult<EvolutionResult> {
        self.run_with_seed(population, None, rng)
    }

    /// Run with optional seed individuals merged ahead of the population
    ///
    /// The merged set is truncated to the population size, seed rows first.
    /// Seed individuals that already carry objectives are not re-evaluated.
    /// Unevaluated ones are evaluated and counted, so the evaluation count
    /// after the initial phase is N plus the number of such seed rows.
    pub fn run_with_seed<R: Rng>(
        &self,
        population: Population,
        seed: Option<Population>,
        rng: &mut R,
    ) -> EvoResult<EvolutionResult> {
        self.run_with_finisher(population, seed, &BestIndividualFinisher, rng)
    }

    /// Run and hand the final population to `finisher`
    pub fn run_with_finisher<R, Fin>(
        &self,
        population: Population,
        seed: Option<Population>,
        finisher: &Fin,
        rng: &mut R,
    ) -> EvoResult<Fin::Output>
    where
        R: Rng,
        Fin: Finisher + ?Sized,
    {
        let start_time = Instant::now();
        self.check_population(&population)?;
        if let Some(ref seed) = seed {
            self.check_population(seed)?;
        }

        let n = population.sizes();
        let direction = self.problem.direction();
        info!(
            "{}: DE/target-to-best/1/bin starting with N={}, D={}, F={}, Cr={}, k={}",
            self.problem.name(),
            n,
            population.dimension(),
            self.mutation.scale_factor,
            self.crossover.crossover_probability(),
            self.config.base_blend
        );

        let mut state = LoopState::Initialized;
        state = state.advance(LoopState::EvaluatingInitial);
        let (mut population, mut evaluations) = self.initialize(population, seed)?;
        state = state.advance(LoopState::Iterating);

        let mut stats = EvolutionStats::new();
        let mut history: Vec<f64> = Vec::new();
        let mut generation = 0;
        let mut current = self.observe(&population, generation, evaluations, &mut stats, &mut history)?;

        loop {
            let stop = {
                let view = EvolutionState {
                    generation,
                    evaluations,
                    best_objective: current.best_objective,
                    best_feasible: current.best_is_feasible(),
                    direction,
                    population: &population,
                    objective_history: &history,
                };
                self.termination.should_terminate(&view)
            };
            if stop {
                stats.set_termination_reason(self.termination.reason());
                break;
            }

            population = self.step(&population, rng)?;
            generation += 1;
            evaluations += n;
            current = self.observe(&population, generation, evaluations, &mut stats, &mut history)?;
            debug!(
                "generation {}: evaluations={}, best={:.6e}, cv={:.3e}, feasible={}/{}",
                generation,
                evaluations,
                current.best_objective,
                current.best_violation,
                current.feasible_count,
                n
            );
        }

        state = state.advance(LoopState::Terminated);
        stats.set_runtime(start_time.elapsed());
        info!(
            "{}: terminated ({}) after {} generations and {} evaluations, best objective {:.6e}",
            self.problem.name(),
            stats.termination_reason.as_deref().unwrap_or("unknown"),
            generation,
            evaluations,
            current.best_objective
        );

        finisher.finish(
            population,
            RunSummary {
                generations: generation,
                evaluations,
                direction,
                state,
                stats,
            },
        )
    }

    /// Advance an evaluated, scaled population by one generation
    ///
    /// Returns the N survivors with their objectives and the fitness computed
    /// over the merged parent/trial set.
    pub fn step<R: Rng>(&self, population: &Population, rng: &mut R) -> EvoResult<Population> {
        let n = population.sizes();
        let fitn_v = population.fitn_v().ok_or_else(|| {
            EvolutionError::Precondition("population has no fitness to select on".to_string())
        })?;
        let offspring = self.offspring(population.chrom(), fitn_v, population.field(), rng)?;

        let trials = population.with_chrom(offspring.trial)?.decoded()?;
        let experiment = evaluate(&self.problem, trials)?;
        check_single_objective(&experiment)?;

        let merged = self.assign_fitness(population.concat(&experiment)?)?;
        let merged_fitness = merged.fitn_v().ok_or_else(|| {
            EvolutionError::Precondition("merged population has no fitness".to_string())
        })?;
        let keep = self.survivors.select(merged_fitness, n, rng)?;
        trace!(
            "survivor selection kept {} trial vectors out of {}",
            keep.iter().filter(|&&i| i >= n).count(),
            n
        );

        let next = merged.select_rows(&keep)?;
        ensure_shape("population size", n, next.sizes())?;
        next.validate()?;
        Ok(next)
    }

    /// Draw `r0`, build base vectors, mutate and recombine
    ///
    /// Consumes randomness in a fixed order, so a seeded generator yields the
    /// same matrices on every call.
    pub fn offspring<R: Rng>(
        &self,
        chrom: &DMatrix<f64>,
        fitn_v: &DVector<f64>,
        field: &Field,
        rng: &mut R,
    ) -> EvoResult<Offspring> {
        let (n, d) = chrom.shape();
        ensure_shape("FitnV rows", n, fitn_v.len())?;
        let r0 = self.candidates.select(fitn_v, n, rng)?;
        let k = self.config.base_blend;
        let base = DMatrix::from_fn(n, d, |i, j| {
            chrom[(i, j)] + k * (chrom[(r0[i], j)] - chrom[(i, j)])
        });
        let mutant = self.mutation.mutate(chrom, &[base.clone()], field, rng)?;
        let trial = self.crossover.recombine(&vstack(chrom, &mutant)?, rng)?;
        Ok(Offspring {
            r0,
            base,
            mutant,
            trial,
        })
    }

    /// Initial evaluation, seed merge and first fitness
    fn initialize(
        &self,
        population: Population,
        seed: Option<Population>,
    ) -> EvoResult<(Population, usize)> {
        let n = population.sizes();
        let population = evaluate(&self.problem, population.decoded()?)?;
        check_single_objective(&population)?;
        let mut evaluations = n;

        let population = match seed {
            None => population,
            Some(seed) => {
                let seed = if seed.phen().is_none() {
                    seed.decoded()?
                } else {
                    seed
                };
                let seed = if seed.is_evaluated() {
                    seed
                } else {
                    evaluations += seed.sizes();
                    evaluate(&self.problem, seed)?
                };
                check_single_objective(&seed)?;
                debug!("merging {} seed individuals ahead of {}", seed.sizes(), n);
                seed.concat(&population)?.truncate(n)?
            }
        };

        Ok((self.assign_fitness(population)?, evaluations))
    }

    /// Scale sign-adjusted objectives and violations into fitness
    fn assign_fitness(&self, population: Population) -> EvoResult<Population> {
        let sign = self.problem.direction().sign();
        let fitn_v = {
            let obj_v = population.obj_v().ok_or_else(|| {
                EvolutionError::Precondition("population is not evaluated".to_string())
            })?;
            let signed = DVector::from_iterator(obj_v.nrows(), obj_v.column(0).iter().map(|v| v * sign));
            self.scaler.scale(&signed, population.cv())?
        };
        population.with_fitness(fitn_v)
    }

    fn observe(
        &self,
        population: &Population,
        generation: usize,
        evaluations: usize,
        stats: &mut EvolutionStats,
        history: &mut Vec<f64>,
    ) -> EvoResult<GenerationStats> {
        let current = GenerationStats::from_population(
            population,
            generation,
            evaluations,
            self.problem.direction(),
        )
        .ok_or_else(|| EvolutionError::Precondition("population is not evaluated".to_string()))?;
        history.push(current.best_objective);
        if self.config.record_history {
            stats.record(current.clone());
        }
        Ok(current)
    }

    fn check_population(&self, population: &Population) -> EvoResult<()> {
        let field = self.problem.field();
        if field.encoding() != Encoding::RealInteger {
            return Err(EvolutionError::Precondition(format!(
                "DE/target-to-best/1/bin needs a real-integer field, got '{}'",
                field.encoding().code()
            )));
        }
        ensure_shape("Chrom columns", field.dimension(), population.dimension())?;
        if population.field() != &field {
            return Err(EvolutionError::Precondition(
                "population field differs from the problem's field".to_string(),
            ));
        }
        if !field.contains(population.chrom()) {
            return Err(EvolutionError::Precondition(
                "Chrom has genes outside the field's bounds".to_string(),
            ));
        }
        population.validate()
    }
}

fn check_single_objective(population: &Population) -> EvoResult<()> {
    match population.obj_v() {
        Some(obj_v) if obj_v.ncols() == 1 => Ok(()),
        Some(obj_v) => Err(EvolutionError::Precondition(format!(
            "single-objective optimizer got {} objectives",
            obj_v.ncols()
        ))),
        None => Err(EvolutionError::Precondition(
            "population is not evaluated".to_string(),
        )),
    }
}
