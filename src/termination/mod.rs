//! Termination criteria
//!
//! The evolution loop consults a [`TerminationCriterion`] once per
//! generation, before doing that generation's work, and stops as soon as it
//! answers `true`.

use crate::fitness::problem::Direction;
use crate::population::population::Population;

/// Evolution state for termination checking
#[derive(Clone, Debug)]
pub struct EvolutionState<'a> {
    /// Generations completed so far
    pub generation: usize,
    /// Total objective evaluations so far
    pub evaluations: usize,
    /// Raw objective of the current best individual
    pub best_objective: f64,
    /// Whether the current best individual is feasible
    pub best_feasible: bool,
    /// Optimization direction of the problem
    pub direction: Direction,
    /// Reference to the current population
    pub population: &'a Population,
    /// Best objective per generation, the initial population first
    pub objective_history: &'a [f64],
}

/// Termination criterion trait
pub trait TerminationCriterion: Send + Sync {
    /// Check if evolution should terminate
    fn should_terminate(&self, state: &EvolutionState) -> bool;

    /// Get a description of why termination occurred
    fn reason(&self) -> &'static str;
}

impl TerminationCriterion for Box<dyn TerminationCriterion> {
    fn should_terminate(&self, state: &EvolutionState) -> bool {
        self.as_ref().should_terminate(state)
    }

    fn reason(&self) -> &'static str {
        self.as_ref().reason()
    }
}

/// Terminate after a maximum number of generations
#[derive(Clone, Debug)]
pub struct MaxGenerations(pub usize);

impl MaxGenerations {
    /// Create a new max generations criterion
    pub fn new(max: usize) -> Self {
        Self(max)
    }
}

impl TerminationCriterion for MaxGenerations {
    fn should_terminate(&self, state: &EvolutionState) -> bool {
        state.generation >= self.0
    }

    fn reason(&self) -> &'static str {
        "Maximum generations reached"
    }
}

/// Terminate once a number of objective evaluations has been spent
///
/// Evaluations are counted a whole population at a time, so a run may
/// overshoot the budget by up to one population.
#[derive(Clone, Debug)]
pub struct MaxEvaluations(pub usize);

impl MaxEvaluations {
    /// Create a new max evaluations criterion
    pub fn new(max: usize) -> Self {
        Self(max)
    }
}

impl TerminationCriterion for MaxEvaluations {
    fn should_terminate(&self, state: &EvolutionState) -> bool {
        state.evaluations >= self.0
    }

    fn reason(&self) -> &'static str {
        "Maximum evaluations reached"
    }
}

/// Terminate when a feasible best individual reaches a target objective
#[derive(Clone, Debug)]
pub struct TargetObjective {
    /// Target objective value
    pub target: f64,
    /// Tolerance for reaching target
    pub tolerance: f64,
}

impl TargetObjective {
    /// Create a new target objective criterion
    pub fn new(target: f64) -> Self {
        Self {
            target,
            tolerance: 0.0,
        }
    }

    /// Create with a tolerance
    pub fn with_tolerance(target: f64, tolerance: f64) -> Self {
        Self { target, tolerance }
    }
}

impl TerminationCriterion for TargetObjective {
    fn should_terminate(&self, state: &EvolutionState) -> bool {
        if !state.best_feasible {
            return false;
        }
        match state.direction {
            Direction::Minimize => state.best_objective <= self.target + self.tolerance,
            Direction::Maximize => state.best_objective >= self.target - self.tolerance,
        }
    }

    fn reason(&self) -> &'static str {
        "Target objective reached"
    }
}

/// Terminate when the best objective stops moving
#[derive(Clone, Debug)]
pub struct ObjectiveStagnation {
    /// Number of history entries to look back
    pub window: usize,
    /// Minimum change over the window
    pub epsilon: f64,
}

impl ObjectiveStagnation {
    /// Create a new objective stagnation criterion
    pub fn new(window: usize, epsilon: f64) -> Self {
        Self { window, epsilon }
    }
}

impl TerminationCriterion for ObjectiveStagnation {
    fn should_terminate(&self, state: &EvolutionState) -> bool {
        let history = state.objective_history;
        if self.window == 0 || history.len() < self.window {
            return false;
        }

        let window = &history[history.len() - self.window..];
        let first = window[0];
        let last = window[window.len() - 1];
        (last - first).abs() < self.epsilon
    }

    fn reason(&self) -> &'static str {
        "Objective stagnation detected"
    }
}

/// Caller-supplied stop predicate
pub struct Predicate<F>(pub F);

impl<F> TerminationCriterion for Predicate<F>
where
    F: Fn(&EvolutionState) -> bool + Send + Sync,
{
    fn should_terminate(&self, state: &EvolutionState) -> bool {
        (self.0)(state)
    }

    fn reason(&self) -> &'static str {
        "Stop predicate returned true"
    }
}

/// Combine criteria with OR logic (any one triggers termination)
pub struct AnyOf {
    criteria: Vec<Box<dyn TerminationCriterion>>,
}

impl AnyOf {
    /// Create a new AnyOf combinator
    pub fn new(criteria: Vec<Box<dyn TerminationCriterion>>) -> Self {
        Self { criteria }
    }
}

impl TerminationCriterion for AnyOf {
    fn should_terminate(&self, state: &EvolutionState) -> bool {
        self.criteria.iter().any(|c| c.should_terminate(state))
    }

    fn reason(&self) -> &'static str {
        "One of multiple criteria met"
    }
}

/// Combine criteria with AND logic (all must trigger for termination)
pub struct AllOf {
    criteria: Vec<Box<dyn TerminationCriterion>>,
}

impl AllOf {
    /// Create a new AllOf combinator
    pub fn new(criteria: Vec<Box<dyn TerminationCriterion>>) -> Self {
        Self { criteria }
    }
}

impl TerminationCriterion for AllOf {
    fn should_terminate(&self, state: &EvolutionState) -> bool {
        !self.criteria.is_empty() && self.criteria.iter().all(|c| c.should_terminate(state))
    }

    fn reason(&self) -> &'static str {
        "All criteria met"
    }
}

pub mod prelude {
    pub use super::{
        AllOf, AnyOf, EvolutionState, MaxEvaluations, MaxGenerations, ObjectiveStagnation,
        Predicate, TargetObjective, TerminationCriterion,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::field::Field;
    use nalgebra::DMatrix;

    fn population() -> Population {
        Population::new(Field::symmetric(1.0, 1), DMatrix::zeros(2, 1)).unwrap()
    }

    fn create_test_state<'a>(
        generation: usize,
        evaluations: usize,
        best_objective: f64,
        population: &'a Population,
        objective_history: &'a [f64],
    ) -> EvolutionState<'a> {
        EvolutionState {
            generation,
            evaluations,
            best_objective,
            best_feasible: true,
            direction: Direction::Minimize,
            population,
            objective_history,
        }
    }

    #[test]
    fn test_max_generations() {
        let pop = population();
        let history = vec![];
        let criterion = MaxGenerations::new(100);

        let state = create_test_state(50, 0, 10.0, &pop, &history);
        assert!(!criterion.should_terminate(&state));

        let state = create_test_state(100, 0, 10.0, &pop, &history);
        assert!(criterion.should_terminate(&state));
    }

    #[test]
    fn test_max_evaluations() {
        let pop = population();
        let history = vec![];
        let criterion = MaxEvaluations::new(1000);

        let state = create_test_state(0, 500, 10.0, &pop, &history);
        assert!(!criterion.should_terminate(&state));

        let state = create_test_state(0, 1000, 10.0, &pop, &history);
        assert!(criterion.should_terminate(&state));
    }

    #[test]
    fn test_objective_stagnation() {
        let pop = population();
        let criterion = ObjectiveStagnation::new(5, 0.01);

        // Not enough history
        let history = vec![5.0, 4.0, 3.0];
        let state = create_test_state(0, 0, 3.0, &pop, &history);
        assert!(!criterion.should_terminate(&state));

        let history = vec![5.0, 4.0, 3.0, 2.0, 1.0];
        let state = create_test_state(0, 0, 1.0, &pop, &history);
        assert!(!criterion.should_terminate(&state));

        let history = vec![9.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let state = create_test_state(0, 0, 1.0, &pop, &history);
        assert!(criterion.should_terminate(&state));
    }

    #[test]
    fn test_target_objective_minimize() {
        let pop = population();
        let history = vec![];
        let criterion = TargetObjective::new(0.0);

        let state = create_test_state(0, 0, 10.0, &pop, &history);
        assert!(!criterion.should_terminate(&state));

        let state = create_test_state(0, 0, 0.0, &pop, &history);
        assert!(criterion.should_terminate(&state));

        let criterion = TargetObjective::with_tolerance(0.0, 0.1);
        let state = create_test_state(0, 0, 0.05, &pop, &history);
        assert!(criterion.should_terminate(&state));
    }

    #[test]
    fn test_target_objective_needs_feasible_best() {
        let pop = population();
        let history = vec![];
        let mut state = create_test_state(0, 0, -1.0, &pop, &history);
        state.best_feasible = false;
        assert!(!TargetObjective::new(0.0).should_terminate(&state));
    }

    #[test]
    fn test_target_objective_maximize() {
        let pop = population();
        let history = vec![];
        let mut state = create_test_state(0, 0, 9.0, &pop, &history);
        state.direction = Direction::Maximize;
        assert!(!TargetObjective::new(10.0).should_terminate(&state));
        state.best_objective = 10.5;
        assert!(TargetObjective::new(10.0).should_terminate(&state));
    }

    #[test]
    fn test_predicate() {
        let pop = population();
        let history = vec![];
        let criterion = Predicate(|s: &EvolutionState| s.evaluations > 40);
        let state = create_test_state(3, 40, 0.0, &pop, &history);
        assert!(!criterion.should_terminate(&state));
        let state = create_test_state(3, 41, 0.0, &pop, &history);
        assert!(criterion.should_terminate(&state));
    }

    #[test]
    fn test_any_of() {
        let pop = population();
        let history = vec![];
        let criterion = AnyOf::new(vec![
            Box::new(MaxGenerations::new(100)),
            Box::new(TargetObjective::new(0.0)),
        ]);

        let state = create_test_state(50, 0, 10.0, &pop, &history);
        assert!(!criterion.should_terminate(&state));

        let state = create_test_state(100, 0, 10.0, &pop, &history);
        assert!(criterion.should_terminate(&state));

        let state = create_test_state(50, 0, 0.0, &pop, &history);
        assert!(criterion.should_terminate(&state));
    }

    #[test]
    fn test_all_of() {
        let pop = population();
        let history = vec![];
        let criterion = AllOf::new(vec![
            Box::new(MaxGenerations::new(100)),
            Box::new(TargetObjective::new(0.0)),
        ]);

        let state = create_test_state(100, 0, 10.0, &pop, &history);
        assert!(!criterion.should_terminate(&state));

        let state = create_test_state(50, 0, 0.0, &pop, &history);
        assert!(!criterion.should_terminate(&state));

        let state = create_test_state(100, 0, 0.0, &pop, &history);
        assert!(criterion.should_terminate(&state));

        assert!(!AllOf::new(vec![]).should_terminate(&state));
    }
}
