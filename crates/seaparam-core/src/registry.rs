//! Column registry: typed metadata for every column of a dataset.
//!
//! The registry never owns data. Every operation that needs to know about
//! physical columns takes the [`TabularStore`] holding them, so ordering
//! follows the store and divergence can be detected.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use seaparam_engine::engine::{DataType, TabularStore};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A column tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnAttr {
    Param,
    ParamFlag,
    QcParamFlag,
    NonQcParam,
    Required,
    BasicParam,
    Computed,
    Created,
}

impl ColumnAttr {
    pub const ALL: [ColumnAttr; 8] = [
        ColumnAttr::Computed,
        ColumnAttr::Param,
        ColumnAttr::NonQcParam,
        ColumnAttr::ParamFlag,
        ColumnAttr::QcParamFlag,
        ColumnAttr::Required,
        ColumnAttr::BasicParam,
        ColumnAttr::Created,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnAttr::Param => "param",
            ColumnAttr::ParamFlag => "param_flag",
            ColumnAttr::QcParamFlag => "qc_param_flag",
            ColumnAttr::NonQcParam => "non_qc_param",
            ColumnAttr::Required => "required",
            ColumnAttr::BasicParam => "basic_param",
            ColumnAttr::Computed => "computed",
            ColumnAttr::Created => "created",
        }
    }
}

impl fmt::Display for ColumnAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata recorded for one column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Source names this column was mapped from.
    #[serde(default)]
    pub external_name: Vec<String>,
    pub attrs: BTreeSet<ColumnAttr>,
    pub data_type: DataType,
    pub unit: Option<String>,
    pub precision: Option<u32>,
    pub export: bool,
}

impl ColumnDescriptor {
    pub fn new(attrs: impl IntoIterator<Item = ColumnAttr>, data_type: DataType) -> Self {
        ColumnDescriptor {
            external_name: Vec::new(),
            attrs: attrs.into_iter().collect(),
            data_type,
            unit: None,
            precision: None,
            export: true,
        }
    }

    pub fn has(&self, attr: ColumnAttr) -> bool {
        self.attrs.contains(&attr)
    }

    pub fn has_any(&self, attrs: &[ColumnAttr]) -> bool {
        attrs.iter().any(|a| self.attrs.contains(a))
    }

    /// Parameter columns that must carry a companion flag column.
    pub fn needs_flag(&self) -> bool {
        self.has(ColumnAttr::Param)
            && !self.has(ColumnAttr::NonQcParam)
            && !(self.has(ColumnAttr::BasicParam) && self.has(ColumnAttr::Created))
    }
}

/// Partial update of a descriptor. `None` fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnRevision {
    pub unit: Option<Option<String>>,
    pub precision: Option<Option<u32>>,
    pub export: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnRegistry {
    columns: BTreeMap<String, ColumnDescriptor>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut ColumnDescriptor> {
        self.columns.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnDescriptor)> {
        self.columns.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Register a column that already exists in `store`.
    pub fn register(
        &mut self,
        store: &dyn TabularStore,
        name: &str,
        attrs: impl IntoIterator<Item = ColumnAttr>,
        unit: Option<String>,
        precision: Option<u32>,
        export: bool,
    ) -> Result<&ColumnDescriptor> {
        let data_type = store
            .get_column(name)
            .map_or(DataType::Empty, |c| c.data_type());
        let mut descriptor = ColumnDescriptor::new(attrs, data_type);
        descriptor.unit = unit;
        descriptor.precision = precision;
        descriptor.export = export;
        self.register_descriptor(store, name, descriptor)
    }

    /// Register a fully built descriptor.
    pub fn register_descriptor(
        &mut self,
        store: &dyn TabularStore,
        name: &str,
        descriptor: ColumnDescriptor,
    ) -> Result<&ColumnDescriptor> {
        if self.columns.contains_key(name) {
            return Err(CoreError::DuplicateColumn(name.to_string()));
        }
        if descriptor.attrs.is_empty() {
            return Err(CoreError::Validation(format!(
                "column `{name}` must carry at least one attribute"
            )));
        }
        if !store.contains_column(name) {
            return Err(CoreError::Validation(format!(
                "column `{name}` is not in the data"
            )));
        }
        Ok(self
            .columns
            .entry(name.to_string())
            .or_insert(descriptor))
    }

    /// Columns carrying any of `attrs`, in the store's physical order.
    /// With `discard_empty` columns whose every value is missing are left out.
    pub fn lookup_by_attrs(
        &self,
        store: &dyn TabularStore,
        attrs: &[ColumnAttr],
        discard_empty: bool,
    ) -> Result<Vec<String>> {
        let mut positioned = Vec::new();
        let mut absent = Vec::new();
        for (name, descriptor) in &self.columns {
            if !descriptor.has_any(attrs) {
                continue;
            }
            match store.column_position(name) {
                Some(pos) => positioned.push((pos, name)),
                None => absent.push(name.as_str()),
            }
        }
        if !absent.is_empty() {
            return Err(CoreError::Validation(format!(
                "registry columns missing from the data: {}",
                absent.join(", ")
            )));
        }
        positioned.sort_by_key(|(pos, _)| *pos);

        Ok(positioned
            .into_iter()
            .filter(|(_, name)| {
                !discard_empty || store.get_column(name).is_some_and(|c| !c.is_all_missing())
            })
            .map(|(_, name)| name.clone())
            .collect())
    }

    /// Every column name in store order.
    pub fn all_columns(&self, store: &dyn TabularStore) -> Result<Vec<String>> {
        self.lookup_by_attrs(store, &ColumnAttr::ALL, false)
    }

    /// Drop a descriptor. Absent names are a no-op.
    pub fn remove(&mut self, name: &str) -> Option<ColumnDescriptor> {
        self.columns.remove(name)
    }

    pub fn revise(&mut self, name: &str, revision: ColumnRevision) -> Result<&ColumnDescriptor> {
        let descriptor = self
            .columns
            .get_mut(name)
            .ok_or_else(|| CoreError::NotFound(name.to_string()))?;
        if let Some(unit) = revision.unit {
            descriptor.unit = unit;
        }
        if let Some(precision) = revision.precision {
            descriptor.precision = precision;
        }
        if let Some(export) = revision.export {
            descriptor.export = export;
        }
        Ok(descriptor)
    }

    /// Check that the registry and `store` hold the same columns and that
    /// every parameter needing a flag has one.
    pub fn validate(&self, store: &dyn TabularStore, flag_suffix: &str) -> Result<()> {
        let store_names = store.column_names();
        let unregistered: Vec<&str> = store_names
            .iter()
            .filter(|n| !self.columns.contains_key(n.as_str()))
            .map(String::as_str)
            .collect();
        if !unregistered.is_empty() {
            return Err(CoreError::Validation(format!(
                "data columns without a registry entry: {}",
                unregistered.join(", ")
            )));
        }

        let mut problems = Vec::new();
        for (name, descriptor) in &self.columns {
            if !store.contains_column(name) {
                problems.push(format!("`{name}` is registered but not in the data"));
            }
            if descriptor.attrs.is_empty() {
                problems.push(format!("`{name}` has no attributes"));
            }
            if descriptor.needs_flag() {
                let flag = format!("{name}{flag_suffix}");
                if !self.columns.contains_key(&flag) {
                    problems.push(format!("`{name}` has no flag column `{flag}`"));
                }
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(problems.join("; ")))
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
