//! Notifications for views that reference computed columns.

use std::collections::BTreeSet;

/// Told which computed columns disappeared after a recompute.
pub trait ColumnsRemovedNotifier {
    fn notify_columns_removed(&mut self, names: &BTreeSet<String>);
}

/// Logs removed columns as warnings.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl ColumnsRemovedNotifier for LogNotifier {
    fn notify_columns_removed(&mut self, names: &BTreeSet<String>) {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        tracing::warn!(columns = %names.join(","), "computed columns could not be recomputed");
    }
}

/// Keeps every notification; useful for views that drop references later.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordingNotifier {
    pub removed: Vec<BTreeSet<String>>,
}

impl ColumnsRemovedNotifier for RecordingNotifier {
    fn notify_columns_removed(&mut self, names: &BTreeSet<String>) {
        self.removed.push(names.clone());
    }
}
