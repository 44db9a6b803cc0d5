use std::collections::BTreeSet;

use seaparam_engine::engine::{
    Column, DataType, SCRATCH_COLUMN, TabularStore, evaluate, probe, resolve_definition,
};
use seaparam_engine::{EquationError, StoreError};

use super::Dataset;
use crate::definitions::{Definition, equation_lookup};
use crate::error::{CoreError, Result};
use crate::notify::ColumnsRemovedNotifier;
use crate::registry::{ColumnAttr, ColumnDescriptor};

/// Outcome of [`Dataset::recompute_all`].
#[derive(Debug, Default)]
pub struct RecomputeReport {
    pub added: Vec<String>,
    /// Definitions that could not be computed, with the reason.
    pub failed: Vec<(String, CoreError)>,
}

impl RecomputeReport {
    pub fn failed_names(&self) -> BTreeSet<String> {
        self.failed.iter().map(|(name, _)| name.clone()).collect()
    }
}

/// Whether a definition could be computed against the current data.
#[derive(Clone, Debug, PartialEq)]
pub struct DependencyStatus {
    pub name: String,
    pub satisfied: bool,
    pub reason: Option<String>,
}

/// Columns grouped by role, plus computed-parameter status.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterOverview {
    /// Parameter columns holding at least one value.
    pub params: Vec<String>,
    pub flags: Vec<String>,
    pub non_qc: Vec<String>,
    pub required: Vec<String>,
    pub computed: Vec<String>,
    pub dependencies: Vec<DependencyStatus>,
}

fn resolve_in(
    definitions: &[Definition],
    name: &str,
) -> std::result::Result<String, EquationError> {
    let lookup = equation_lookup(definitions);
    resolve_definition(name, |n| lookup.get(n).map(|eq| eq.to_string()))
}

impl Dataset {
    /// Fully expanded equation of the definition called `name`.
    pub fn resolve(&self, name: &str) -> Result<String> {
        let definitions = self.definitions.list_definitions()?;
        resolve_in(&definitions, name).map_err(|e| CoreError::equation(name, e))
    }

    /// Compute the definition called `name` and register it as a column.
    ///
    /// On failure neither the data nor the registry is changed.
    pub fn add(&mut self, name: &str) -> Result<&ColumnDescriptor> {
        let definitions = self.definitions.list_definitions()?;
        self.add_from(&definitions, name)?;
        self.registry
            .get(name)
            .ok_or_else(|| CoreError::NotFound(name.to_string()))
    }

    fn add_from(&mut self, definitions: &[Definition], name: &str) -> Result<()> {
        self.check_consistency()?;
        if name == SCRATCH_COLUMN {
            return Err(CoreError::equation(
                name,
                StoreError::ReservedName(name.to_string()),
            ));
        }
        if self.registry.contains(name) || self.table.contains_column(name) {
            return Err(CoreError::DuplicateColumn(name.to_string()));
        }
        let definition = definitions
            .iter()
            .find(|d| d.param_name == name)
            .ok_or_else(|| {
                CoreError::equation(
                    name,
                    EquationError::UnknownReference {
                        name: name.to_string(),
                    },
                )
            })?;

        let equation = resolve_in(definitions, name).map_err(|e| CoreError::equation(name, e))?;
        evaluate(
            &self.sandbox,
            name,
            &equation,
            definition.precision,
            &mut self.table,
        )
        .map_err(|e| CoreError::equation(name, e))?;

        let data_type = self
            .table
            .get_column(name)
            .map_or(DataType::Empty, Column::data_type);
        let mut descriptor = ColumnDescriptor::new([ColumnAttr::Computed], data_type);
        descriptor.unit = definition.units.clone();
        descriptor.precision = Some(definition.precision);
        descriptor.export = false;
        if let Err(e) = self.registry.register_descriptor(&self.table, name, descriptor) {
            self.table.remove_column(name);
            return Err(e);
        }

        tracing::info!(param = name, equation = %equation, "computed parameter added");
        Ok(())
    }

    /// Remove a column from the data and the registry. A parameter takes its
    /// flag column with it. Returns the removed names.
    pub fn delete(&mut self, name: &str) -> Result<Vec<String>> {
        self.check_consistency()?;
        let descriptor = self
            .registry
            .get(name)
            .ok_or_else(|| CoreError::NotFound(name.to_string()))?;

        if descriptor.has(ColumnAttr::ParamFlag)
            && let Some(param) = self.settings.param_of_flag(name)
            && self.registry.get(param).is_some_and(ColumnDescriptor::needs_flag)
        {
            return Err(CoreError::Validation(format!(
                "flag column `{name}` belongs to parameter `{param}`, delete the parameter instead"
            )));
        }

        let mut removed = vec![name.to_string()];
        if descriptor.has(ColumnAttr::Param) {
            let flag = self.settings.flag_name(name);
            if self.registry.contains(&flag) {
                removed.push(flag);
            }
        }

        for column in &removed {
            self.table.remove_column(column);
            self.registry.remove(column);
        }
        tracing::info!(columns = %removed.join(","), "columns deleted");
        Ok(removed)
    }

    /// Drop the definition called `name` and its column, if active.
    pub fn delete_definition(&mut self, name: &str) -> Result<()> {
        let definitions = self.definitions.list_definitions()?;
        if !definitions.iter().any(|d| d.param_name == name) {
            return Err(CoreError::NotFound(name.to_string()));
        }
        if self
            .registry
            .get(name)
            .is_some_and(|d| d.has(ColumnAttr::Computed))
        {
            self.delete(name)?;
        }
        self.definitions.remove_definition(name)
    }

    /// Drop every computed column and add the definitions again in their
    /// listed order.
    ///
    /// Definitions named after a data column are skipped. Failed definitions
    /// are collected, and `notifier` is told which columns are now missing.
    pub fn recompute_all(
        &mut self,
        notifier: Option<&mut dyn ColumnsRemovedNotifier>,
    ) -> Result<RecomputeReport> {
        self.check_consistency()?;
        let definitions = self.definitions.list_definitions()?;
        self.drop_computed();

        let mut report = RecomputeReport::default();
        for definition in &definitions {
            let name = definition.param_name.as_str();
            if self.registry.contains(name) {
                tracing::debug!(param = name, "definition shadows an existing column; skipped");
                continue;
            }
            match self.add_from(&definitions, name) {
                Ok(()) => report.added.push(name.to_string()),
                Err(e) if e.is_structural() => return Err(e),
                Err(e) => {
                    tracing::warn!(param = name, error = %e, "computed parameter failed");
                    report.failed.push((name.to_string(), e));
                }
            }
        }

        if !report.failed.is_empty()
            && let Some(notifier) = notifier
        {
            notifier.notify_columns_removed(&report.failed_names());
        }
        tracing::info!(
            added = report.added.len(),
            failed = report.failed.len(),
            "computed parameters recomputed"
        );
        Ok(report)
    }

    fn drop_computed(&mut self) {
        let computed: Vec<String> = self
            .registry
            .iter()
            .filter(|(_, d)| d.has(ColumnAttr::Computed))
            .map(|(name, _)| name.to_string())
            .collect();
        for name in computed {
            self.table.remove_column(&name);
            self.registry.remove(&name);
        }
    }

    /// Dry-run every definition against the current data.
    pub fn check_dependencies(&mut self) -> Result<Vec<DependencyStatus>> {
        self.check_consistency()?;
        let definitions = self.definitions.list_definitions()?;
        let mut statuses = Vec::with_capacity(definitions.len());
        for definition in &definitions {
            let name = definition.param_name.clone();
            let outcome = resolve_in(&definitions, &name)
                .and_then(|equation| probe(&self.sandbox, &equation, &mut self.table));
            statuses.push(match outcome {
                Ok(()) => DependencyStatus {
                    name,
                    satisfied: true,
                    reason: None,
                },
                Err(e) => {
                    tracing::debug!(param = %name, error = %e, "dependencies not satisfied");
                    DependencyStatus {
                        name,
                        satisfied: false,
                        reason: Some(e.to_string()),
                    }
                }
            });
        }
        Ok(statuses)
    }

    pub fn parameter_overview(&mut self) -> Result<ParameterOverview> {
        let registry = &self.registry;
        let table = &self.table;
        let params = registry.lookup_by_attrs(table, &[ColumnAttr::Param], true)?;
        let flags = registry.lookup_by_attrs(table, &[ColumnAttr::ParamFlag], false)?;
        let non_qc = registry.lookup_by_attrs(table, &[ColumnAttr::NonQcParam], true)?;
        let required = registry.lookup_by_attrs(table, &[ColumnAttr::Required], false)?;
        let computed = registry.lookup_by_attrs(table, &[ColumnAttr::Computed], false)?;
        let dependencies = self.check_dependencies()?;
        Ok(ParameterOverview {
            params,
            flags,
            non_qc,
            required,
            computed,
            dependencies,
        })
    }
}
