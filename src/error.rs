//! Error types for tobest-de
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Error type for operator failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OperatorError {
    /// Crossover operation failed
    #[error("Crossover failed: {0}")]
    CrossoverFailed(String),

    /// Mutation operation failed
    #[error("Mutation failed: {0}")]
    MutationFailed(String),

    /// Selection operation failed
    #[error("Selection failed: {0}")]
    SelectionFailed(String),

    /// Invalid operator configuration
    #[error("Invalid operator configuration: {0}")]
    InvalidConfiguration(String),
}

/// Top-level error type for evolution operations
#[derive(Debug, Error)]
pub enum EvolutionError {
    /// Operator error
    #[error("Operator error: {0}")]
    Operator(#[from] OperatorError),

    /// A precondition of the loop or an operator does not hold
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Two matrices that must line up do not
    #[error("Shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Which matrix or dimension disagreed
        what: &'static str,
        /// Expected size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// The objective evaluator returned malformed data
    #[error("Evaluator contract violated: {0}")]
    EvaluatorContract(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Empty population
    #[error("Empty population")]
    EmptyPopulation,
}

/// Result type alias for evolution operations
pub type EvoResult<T> = Result<T, EvolutionError>;

/// Check that `actual` equals `expected`, naming the offending dimension otherwise
pub(crate) fn ensure_shape(what: &'static str, expected: usize, actual: usize) -> EvoResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(EvolutionError::ShapeMismatch {
            what,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_error_display() {
        let err = OperatorError::CrossoverFailed("odd row count".to_string());
        assert_eq!(err.to_string(), "Crossover failed: odd row count");

        let err = OperatorError::InvalidConfiguration("F must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid operator configuration: F must be positive"
        );
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = EvolutionError::ShapeMismatch {
            what: "ObjV rows",
            expected: 10,
            actual: 5,
        };
        assert_eq!(
            err.to_string(),
            "Shape mismatch in ObjV rows: expected 10, got 5"
        );
    }

    #[test]
    fn test_evolution_error_from_operator_error() {
        let op_err = OperatorError::SelectionFailed("empty fitness".to_string());
        let evo_err: EvolutionError = op_err.into();
        assert!(matches!(evo_err, EvolutionError::Operator(_)));
    }

    #[test]
    fn test_ensure_shape() {
        assert!(ensure_shape("Chrom columns", 3, 3).is_ok());
        let err = ensure_shape("Chrom columns", 3, 4).unwrap_err();
        assert!(matches!(
            err,
            EvolutionError::ShapeMismatch {
                expected: 3,
                actual: 4,
                ..
            }
        ));
    }
}
