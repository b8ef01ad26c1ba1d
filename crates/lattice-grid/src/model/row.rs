//! Row snapshots.

use serde_json::Value;

use super::record::{Record, RecordKey};

/// A snapshot of one row of a [`DataSet`](super::DataSet).
///
/// Rows are values: holding one does not keep it in sync with the model.
/// Changes go through the data set (`set_editing`, `set_new_data`, ...), which
/// finds the live row by record key.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub(crate) index: usize,
    pub(crate) record: Record,
    pub(crate) new_data: Value,
    pub(crate) is_in_editing: bool,
    pub(crate) is_selected: bool,
}

impl Row {
    /// Position of the row in the data set when the snapshot was taken.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The record currently shown by this row.
    pub fn data(&self) -> &Record {
        &self.record
    }

    /// Identity of the row's record.
    pub fn key(&self) -> RecordKey {
        self.record.key()
    }

    /// The edited data waiting to be saved.
    ///
    /// Equal to the current data until an editor writes to it.
    pub fn new_data(&self) -> &Value {
        &self.new_data
    }

    /// Current value of one cell.
    pub fn cell(&self, column_id: &str) -> Option<&Value> {
        self.record.field(column_id)
    }

    /// Whether the row is flagged for editing.
    pub fn is_in_editing(&self) -> bool {
        self.is_in_editing
    }

    /// Whether the row was selected when the snapshot was taken.
    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    /// True for the blank row used by the create form.
    pub fn is_new(&self) -> bool {
        self.record.key().is_unassigned()
    }
}
