use std::fmt;

use seaparam_engine::engine::{DataType, Sandbox, Table, TabularStore};

use crate::config::Settings;
use crate::definitions::{Definition, DefinitionSource};
use crate::error::Result;
use crate::registry::{ColumnDescriptor, ColumnRegistry, ColumnRevision};

/// One loaded dataset: data, column metadata and everything needed to
/// evaluate computed parameters against it.
///
/// Callers serialize access; [`super::SharedDataset`] adds a lock for
/// multi-caller use.
pub struct Dataset {
    pub(crate) table: Table,
    pub(crate) registry: ColumnRegistry,
    pub(crate) settings: Settings,
    pub(crate) sandbox: Sandbox,
    pub(crate) definitions: Box<dyn DefinitionSource>,
    pub(crate) display_precision: u32,
}

impl Dataset {
    /// Assemble a dataset from a table and a registry that already agree.
    pub fn from_parts(
        table: Table,
        registry: ColumnRegistry,
        settings: Settings,
        sandbox: Sandbox,
        definitions: Box<dyn DefinitionSource>,
    ) -> Result<Self> {
        registry.validate(&table, &settings.flag_suffix)?;
        let display_precision = registry
            .iter()
            .filter(|(_, d)| d.data_type == DataType::Float)
            .filter_map(|(_, d)| d.precision)
            .max()
            .unwrap_or(0)
            .min(settings.max_display_precision);
        Ok(Dataset {
            table,
            registry,
            settings,
            sandbox,
            definitions,
            display_precision,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Swap the evaluation sandbox, e.g. after function files changed.
    pub fn set_sandbox(&mut self, sandbox: Sandbox) {
        self.sandbox = sandbox;
    }

    /// Current definitions, re-read from the source.
    pub fn definitions(&self) -> Result<Vec<Definition>> {
        self.definitions.list_definitions()
    }

    /// Largest float precision of the ingested data, capped.
    pub fn display_precision(&self) -> u32 {
        self.display_precision
    }

    pub fn descriptor(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.registry.get(name)
    }

    /// Update unit, precision or export of a column.
    pub fn revise(&mut self, name: &str, revision: ColumnRevision) -> Result<&ColumnDescriptor> {
        self.registry.revise(name, revision)
    }

    pub(crate) fn check_consistency(&self) -> Result<()> {
        self.registry
            .validate(&self.table, &self.settings.flag_suffix)
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("rows", &self.table.row_count())
            .field("columns", &self.table.column_count())
            .field("display_precision", &self.display_precision)
            .finish_non_exhaustive()
    }
}
