//! Equation engine API.
//!
//! This module provides the core computation engine for computed parameters:
//!
//! - [`Column`], [`DataType`], [`Table`] - Typed column storage
//! - [`TabularStore`] - The store interface the evaluator writes into
//! - [`resolve_equation`] - Expand nested `${NAME}` placeholders
//! - [`extract_identifiers`] - Find the data columns an equation reads
//! - [`preprocess_equation`] - Normalise an equation for Rhai evaluation
//! - [`Sandbox`] - Whitelisted Rhai engine with masked ambient names
//! - [`evaluate`] / [`probe`] - Compute a column from an equation
//! - [`round_half_even`] / [`format_value`] - Deterministic rounding and display

mod column;
mod deps;
mod eval;
mod format;
mod preprocess;
mod resolve;
mod sandbox;
mod table;

pub use column::{Column, DataType, IntWidth};
pub use deps::{EquationIdentifiers, extract_identifiers, is_numeric_literal};
pub use eval::{SCRATCH_COLUMN, compute, evaluate, probe};
pub use format::{format_value, round_half_even};
pub use preprocess::{preprocess_equation, strip_whitespace};
pub use resolve::{placeholder_re, resolve_definition, resolve_equation};
pub use sandbox::{Sandbox, SandboxBuilder, SandboxEntry};
pub use table::{TabularStore, Table};
