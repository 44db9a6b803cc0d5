use std::sync::{Arc, Mutex, PoisonError};

use super::{Dataset, DependencyStatus, RecomputeReport};
use crate::error::Result;
use crate::notify::ColumnsRemovedNotifier;
use crate::registry::ColumnDescriptor;

/// A dataset shared between callers. Every operation holds the lock for its
/// whole run, so the registry and the data never diverge between calls.
#[derive(Clone, Debug)]
pub struct SharedDataset {
    inner: Arc<Mutex<Dataset>>,
}

impl SharedDataset {
    pub fn new(dataset: Dataset) -> Self {
        SharedDataset {
            inner: Arc::new(Mutex::new(dataset)),
        }
    }

    /// Run `f` with exclusive access to the dataset.
    pub fn with<R>(&self, f: impl FnOnce(&mut Dataset) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn add(&self, name: &str) -> Result<ColumnDescriptor> {
        self.with(|ds| ds.add(name).cloned())
    }

    pub fn delete(&self, name: &str) -> Result<Vec<String>> {
        self.with(|ds| ds.delete(name))
    }

    pub fn recompute_all(
        &self,
        notifier: Option<&mut dyn ColumnsRemovedNotifier>,
    ) -> Result<RecomputeReport> {
        self.with(|ds| ds.recompute_all(notifier))
    }

    pub fn check_dependencies(&self) -> Result<Vec<DependencyStatus>> {
        self.with(Dataset::check_dependencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::definitions::{Definition, InMemoryDefinitions};
    use crate::registry::{ColumnAttr, ColumnRegistry};
    use seaparam_engine::engine::{Column, Sandbox, Table, TabularStore};
    use std::thread;

    fn shared() -> SharedDataset {
        let mut table = Table::new(3);
        table
            .set_column("CTDPRS", Column::floats(vec![Some(1.0), Some(2.0), Some(3.0)]))
            .unwrap();
        let mut registry = ColumnRegistry::new();
        registry
            .register(&table, "CTDPRS", [ColumnAttr::NonQcParam], None, Some(1), true)
            .unwrap();
        let definitions: Vec<Definition> = (0..8)
            .map(|i| Definition::new(format!("P{i}"), format!("CTDPRS * {i}"), 1))
            .collect();
        let dataset = Dataset::from_parts(
            table,
            registry,
            Settings::default(),
            Sandbox::default(),
            Box::new(InMemoryDefinitions::new(definitions)),
        )
        .unwrap();
        SharedDataset::new(dataset)
    }

    #[test]
    fn test_concurrent_adds_keep_registry_and_data_in_step() {
        let shared = shared();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || shared.add(&format!("P{i}")).map(|_| ()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        shared.with(|ds| {
            assert_eq!(ds.table().column_count(), 9);
            assert_eq!(ds.registry().len(), 9);
            ds.check_consistency().unwrap();
        });
        assert!(shared.check_dependencies().unwrap().iter().all(|s| s.satisfied));
    }

    #[test]
    fn test_recompute_and_delete_through_handle() {
        let shared = shared();
        let report = shared.recompute_all(None).unwrap();
        assert_eq!(report.added.len(), 8);
        assert_eq!(shared.delete("P3").unwrap(), vec!["P3"]);
        assert!(shared.with(|ds| !ds.table().contains_column("P3")));
    }
}
