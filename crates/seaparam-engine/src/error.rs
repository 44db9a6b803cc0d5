//! Error types for the equation engine.

use thiserror::Error;

/// Failures local to a single equation.
///
/// None of these abort a batch operation: callers collect them per parameter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EquationError {
    #[error("computed parameter `{name}` is referenced but has no definition")]
    UnknownReference { name: String },

    #[error("cyclic definition: {}", cycle.join(" -> "))]
    CyclicDefinition { cycle: Vec<String> },

    #[error("some identifiers do not exist in the current data: {}", identifiers.join(", "))]
    MissingDependency { identifiers: Vec<String> },

    #[error("functions not available in the sandbox: {}", names.join(", "))]
    MissingFunction { names: Vec<String> },

    #[error("the equation could not be computed: {equation}: {message}")]
    Evaluation { equation: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by a tabular store mutation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("column `{column}` has {found} rows, the table has {expected}")]
    RowCountMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("column name `{0}` is reserved")]
    ReservedName(String),
}
