//! Error types for seaparam core.

use seaparam_engine::{EquationError, StoreError};
use thiserror::Error;

/// Errors raised by dataset operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("column `{0}` already exists")]
    DuplicateColumn(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("column `{0}` not found")]
    NotFound(String),

    #[error("computed parameter `{param}`: {source}")]
    Equation {
        param: String,
        #[source]
        source: EquationError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl CoreError {
    pub fn equation(param: impl Into<String>, source: impl Into<EquationError>) -> Self {
        CoreError::Equation {
            param: param.into(),
            source: source.into(),
        }
    }

    /// Structural errors abort the whole operation; the rest belong to a
    /// single computed parameter.
    pub fn is_structural(&self) -> bool {
        matches!(self, CoreError::DuplicateColumn(_) | CoreError::Validation(_))
    }

    pub fn equation_error(&self) -> Option<&EquationError> {
        match self {
            CoreError::Equation { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        CoreError::Validation(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
