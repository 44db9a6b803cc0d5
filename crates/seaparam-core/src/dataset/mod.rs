//! Dataset state and the computed-parameter lifecycle.

mod ingest;
mod ops;
mod shared;
mod state;

pub use ingest::{IngestReport, sanitize_header};
pub use ops::{DependencyStatus, ParameterOverview, RecomputeReport};
pub use shared::SharedDataset;
pub use state::Dataset;
