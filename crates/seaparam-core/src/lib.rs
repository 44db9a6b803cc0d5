//! seaparam-core - Column registry, dataset ingest and the computed-parameter
//! lifecycle.

pub mod config;
pub mod dataset;
pub mod definitions;
pub mod error;
pub mod infer;
pub mod notify;
pub mod registry;
pub mod storage;

pub use config::Settings;
pub use dataset::{
    Dataset, DependencyStatus, IngestReport, ParameterOverview, RecomputeReport, SharedDataset,
};
pub use definitions::{Definition, DefinitionSource, InMemoryDefinitions, ProjectSettingsFile};
pub use error::{CoreError, Result};
pub use notify::{ColumnsRemovedNotifier, LogNotifier, RecordingNotifier};
pub use registry::{ColumnAttr, ColumnDescriptor, ColumnRegistry, ColumnRevision};
