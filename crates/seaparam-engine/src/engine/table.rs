//! Tabular data store.
//!
//! [`TabularStore`] is the narrow interface the evaluator and the column
//! registry rely on. [`Table`] is the in-memory implementation: named columns
//! kept in physical order, all with the same row count.

use super::Column;
use crate::error::StoreError;

/// Rows x named columns.
pub trait TabularStore {
    fn get_column(&self, name: &str) -> Option<&Column>;

    /// Insert or overwrite a column. A new column is appended at the end; an
    /// overwritten column keeps its position.
    fn set_column(&mut self, name: &str, column: Column) -> Result<(), StoreError>;

    fn remove_column(&mut self, name: &str) -> Option<Column>;

    fn row_count(&self) -> usize;

    /// Column names in physical order.
    fn column_names(&self) -> Vec<String>;

    fn contains_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    fn column_position(&self, name: &str) -> Option<usize> {
        self.column_names().iter().position(|n| n == name)
    }
}

/// In-memory column store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    rows: usize,
    columns: Vec<(String, Column)>,
}

impl Table {
    pub fn new(rows: usize) -> Self {
        Table {
            rows,
            columns: Vec::new(),
        }
    }

    /// Build a table from named columns; every column must have `rows` values.
    pub fn from_columns(
        rows: usize,
        columns: impl IntoIterator<Item = (String, Column)>,
    ) -> Result<Self, StoreError> {
        let mut table = Table::new(rows);
        for (name, column) in columns {
            table.set_column(&name, column)?;
        }
        Ok(table)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Rename a column in place, keeping its position.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        if self.contains_column(to) {
            return false;
        }
        match self.columns.iter_mut().find(|(n, _)| n == from) {
            Some(entry) => {
                entry.0 = to.to_string();
                true
            }
            None => false,
        }
    }

    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }
}

impl TabularStore for Table {
    fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    fn set_column(&mut self, name: &str, column: Column) -> Result<(), StoreError> {
        if column.len() != self.rows {
            return Err(StoreError::RowCountMismatch {
                column: name.to_string(),
                expected: self.rows,
                found: column.len(),
            });
        }
        match self.columns.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = column,
            None => self.columns.push((name.to_string(), column)),
        }
        Ok(())
    }

    fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|(n, _)| n == name)?;
        Some(self.columns.remove(idx).1)
    }

    fn row_count(&self) -> usize {
        self.rows
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|(n, _)| n.clone()).collect()
    }

    fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == name)
    }
}
