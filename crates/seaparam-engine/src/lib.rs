//! seaparam_engine - Column model + computed-parameter equation engine.

pub(crate) mod builtins;
pub mod engine;
pub mod error;
pub mod functions;

pub use error::{EquationError, StoreError};
