//! The row/column model behind a grid.
//!
//! `DataSet` owns the column definitions, the current rows, the single
//! selected row, and the pending [`SelectionIntent`]. Rows are replaced
//! wholesale by [`DataSet::set_data`]; everything else edits rows in place by
//! record key.

use std::collections::HashSet;
use std::sync::Arc;

use lattice_grid_core::logging::targets;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::column::Column;
use super::record::{Record, RecordKey};
use super::row::Row;

/// A selection to apply on the next wholesale row replacement.
///
/// Used when the row that should end up selected does not exist yet, for
/// example after a prepend that the source will only show after reloading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionIntent {
    /// Keep whatever selection survives the replacement.
    #[default]
    None,
    /// Select the first row of the next non-empty replacement.
    SelectFirst,
    /// Select the last row of the next non-empty replacement.
    SelectLast,
}

#[derive(Debug, Clone)]
struct RowState {
    record: Record,
    new_data: Value,
    editing: bool,
}

impl RowState {
    fn new(record: Record) -> Self {
        Self {
            new_data: record.value().clone(),
            record,
            editing: false,
        }
    }
}

#[derive(Debug)]
struct DataSetState {
    rows: Vec<RowState>,
    selected: Option<RecordKey>,
    /// Row keys in the order they had before the last `set_data`.
    previous_keys: Vec<RecordKey>,
    /// Index of the selected row before the last `set_data`.
    previous_selected_index: Option<usize>,
    intent: SelectionIntent,
    new_row: RowState,
}

impl DataSetState {
    fn snapshot(&self, index: usize) -> Option<Row> {
        let row = self.rows.get(index)?;
        Some(Row {
            index,
            record: row.record.clone(),
            new_data: row.new_data.clone(),
            is_in_editing: row.editing,
            is_selected: self.selected == Some(row.record.key()),
        })
    }

    fn position(&self, key: RecordKey) -> Option<usize> {
        self.rows.iter().position(|row| row.record.key() == key)
    }

    fn select_index(&mut self, index: usize) -> Option<Row> {
        let key = self.rows.get(index)?.record.key();
        self.selected = Some(key);
        self.snapshot(index)
    }
}

/// Columns, rows, and selection state for one grid.
#[derive(Debug)]
pub struct DataSet {
    columns: Vec<Arc<Column>>,
    state: RwLock<DataSetState>,
}

impl DataSet {
    /// Creates a data set from initial records and column definitions.
    pub fn new(records: Vec<Record>, columns: Vec<Column>) -> Self {
        let columns: Vec<Arc<Column>> = columns.into_iter().map(Arc::new).collect();
        let new_row = RowState::new(blank_record(&columns));
        Self {
            columns,
            state: RwLock::new(DataSetState {
                rows: records.into_iter().map(RowState::new).collect(),
                selected: None,
                previous_keys: Vec::new(),
                previous_selected_index: None,
                intent: SelectionIntent::None,
                new_row,
            }),
        }
    }

    // =========================================================================
    // Columns and rows
    // =========================================================================

    /// The column definitions, in display order.
    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    /// Looks up a column by id.
    pub fn column(&self, id: &str) -> Option<Arc<Column>> {
        self.columns.iter().find(|c| c.id() == id).cloned()
    }

    /// Snapshots of all rows.
    pub fn rows(&self) -> Vec<Row> {
        let state = self.state.read();
        (0..state.rows.len())
            .filter_map(|index| state.snapshot(index))
            .collect()
    }

    /// Snapshot of the row at `index`.
    pub fn row(&self, index: usize) -> Option<Row> {
        self.state.read().snapshot(index)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.state.read().rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.state.read().rows.is_empty()
    }

    /// Finds the row showing the same record as `data`.
    pub fn find_row_by_data(&self, data: &Record) -> Option<Row> {
        let state = self.state.read();
        let index = state.position(data.key())?;
        state.snapshot(index)
    }

    /// Replaces every row with `records`.
    ///
    /// The current selection survives if its record is still present. A
    /// pending [`SelectionIntent`] is then applied and cleared, unless the new
    /// row set is empty, in which case it stays pending.
    pub fn set_data(&self, records: Vec<Record>) {
        let mut state = self.state.write();

        state.previous_keys = state.rows.iter().map(|row| row.record.key()).collect();
        state.previous_selected_index = state.selected.and_then(|key| state.position(key));
        state.rows = records.into_iter().map(RowState::new).collect();

        if let Some(key) = state.selected
            && state.position(key).is_none()
        {
            state.selected = None;
        }

        if !state.rows.is_empty() {
            let last = state.rows.len() - 1;
            match std::mem::take(&mut state.intent) {
                SelectionIntent::SelectFirst => {
                    state.select_index(0);
                }
                SelectionIntent::SelectLast => {
                    state.select_index(last);
                }
                SelectionIntent::None => {}
            }
        }

        tracing::debug!(
            target: targets::MODEL,
            rows = state.rows.len(),
            selected = ?state.selected,
            "data set replaced"
        );
    }

    /// Replaces one record's data in place, matched by key.
    ///
    /// Returns false if no row shows that record. A row that is not being
    /// edited also has its pending data reset to the new value.
    pub fn set_row_data(&self, record: &Record) -> bool {
        let mut state = self.state.write();
        let Some(index) = state.position(record.key()) else {
            return false;
        };
        let row = &mut state.rows[index];
        row.record = record.clone();
        if !row.editing {
            row.new_data = record.value().clone();
        }
        true
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Flags a row (or the new row) as being edited.
    pub fn set_editing(&self, row: &Row, editing: bool) -> bool {
        self.with_row_state(row, |state| state.editing = editing)
    }

    /// Writes the pending edited data for a row (or the new row).
    pub fn set_new_data(&self, row: &Row, data: Value) -> bool {
        self.with_row_state(row, |state| state.new_data = data)
    }

    /// The blank row backing the create form.
    pub fn new_row(&self) -> Row {
        let state = self.state.read();
        Row {
            index: 0,
            record: state.new_row.record.clone(),
            new_data: state.new_row.new_data.clone(),
            is_in_editing: state.new_row.editing,
            is_selected: false,
        }
    }

    /// Discards the current new row and starts a fresh blank one.
    pub fn create_new_row(&self) {
        self.state.write().new_row = RowState::new(blank_record(&self.columns));
    }

    fn with_row_state<F>(&self, row: &Row, f: F) -> bool
    where
        F: FnOnce(&mut RowState),
    {
        let mut state = self.state.write();
        if row.is_new() {
            f(&mut state.new_row);
            return true;
        }
        match state.position(row.key()) {
            Some(index) => {
                f(&mut state.rows[index]);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// The selected row, if any.
    pub fn selected_row(&self) -> Option<Row> {
        let state = self.state.read();
        let index = state.position(state.selected?)?;
        state.snapshot(index)
    }

    /// Selects `row`, matched by record key.
    pub fn select_row(&self, row: &Row) -> Option<Row> {
        let mut state = self.state.write();
        let index = state.position(row.key())?;
        state.select_index(index)
    }

    /// Applies the default selection rule: keep the current selection if its
    /// row is still present, otherwise select nothing.
    pub fn select(&self) -> Option<Row> {
        self.selected_row()
    }

    /// Selects the first row.
    pub fn select_first_row(&self) -> Option<Row> {
        self.state.write().select_index(0)
    }

    /// Selects the last row.
    pub fn select_last_row(&self) -> Option<Row> {
        let mut state = self.state.write();
        let last = state.rows.len().checked_sub(1)?;
        state.select_index(last)
    }

    /// Selects the row that preceded the removed one before the last
    /// `set_data`.
    ///
    /// The removed row is the first record of the previous ordering that is
    /// missing now. If it was the first row, the new first row is selected.
    /// When nothing was removed, the row before the previous selection is
    /// used, clamped to the current bounds.
    pub fn select_previous_row(&self) -> Option<Row> {
        let mut state = self.state.write();
        let last = state.rows.len().checked_sub(1)?;

        let current: HashSet<RecordKey> = state.rows.iter().map(|row| row.record.key()).collect();
        let removed_at = state.previous_keys.iter().position(|key| !current.contains(key));

        let index = match removed_at {
            Some(0) => 0,
            Some(removed) => {
                let preceding = state.previous_keys[removed - 1];
                state.position(preceding).unwrap_or((removed - 1).min(last))
            }
            None => state
                .previous_selected_index
                .map_or(0, |index| index.saturating_sub(1))
                .min(last),
        };
        state.select_index(index)
    }

    /// Selects the first row of the next non-empty replacement.
    pub fn will_select_first_row(&self) {
        self.state.write().intent = SelectionIntent::SelectFirst;
    }

    /// Selects the last row of the next non-empty replacement.
    pub fn will_select_last_row(&self) {
        self.state.write().intent = SelectionIntent::SelectLast;
    }

    /// The intent waiting for the next replacement.
    pub fn selection_intent(&self) -> SelectionIntent {
        self.state.read().intent
    }
}

fn blank_record(columns: &[Arc<Column>]) -> Record {
    let fields: Map<String, Value> = columns
        .iter()
        .map(|column| (column.id().to_string(), Value::String(String::new())))
        .collect();
    Record::unassigned(Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(names: &[&str]) -> Vec<Record> {
        names.iter().map(|name| Record::new(json!({ "name": name }))).collect()
    }

    fn data_set(names: &[&str]) -> (DataSet, Vec<Record>) {
        let records = records(names);
        let data_set = DataSet::new(records.clone(), vec![Column::new("name")]);
        (data_set, records)
    }

    fn without(records: &[Record], index: usize) -> Vec<Record> {
        let mut records = records.to_vec();
        records.remove(index);
        records
    }

    #[test]
    fn test_rows_are_indexed_snapshots() {
        let (data_set, records) = data_set(&["a", "b"]);
        let rows = data_set.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].index(), 1);
        assert_eq!(rows[1].data(), &records[1]);
        assert_eq!(rows[1].new_data(), records[1].value());
        assert!(!rows[1].is_selected());
    }

    #[test]
    fn test_find_row_by_data_matches_key() {
        let (data_set, records) = data_set(&["a", "b"]);
        let changed = records[1].with_value(json!({"name": "B"}));
        assert_eq!(data_set.find_row_by_data(&changed).map(|r| r.index()), Some(1));
        assert!(data_set.find_row_by_data(&Record::new(json!({}))).is_none());
    }

    #[test]
    fn test_select_keeps_surviving_selection() {
        let (data_set, records) = data_set(&["a", "b", "c"]);
        data_set.select_row(&data_set.row(2).unwrap());

        data_set.set_data(vec![records[2].clone(), records[0].clone()]);
        let selected = data_set.select().unwrap();
        assert_eq!(selected.key(), records[2].key());
        assert_eq!(selected.index(), 0);
        assert!(selected.is_selected());
    }

    #[test]
    fn test_select_without_selection_is_none() {
        let (data_set, records) = data_set(&["a"]);
        data_set.set_data(records);
        assert!(data_set.select().is_none());
    }

    #[test]
    fn test_selection_dropped_when_row_disappears() {
        let (data_set, records) = data_set(&["a", "b"]);
        data_set.select_first_row();
        data_set.set_data(without(&records, 0));
        assert!(data_set.selected_row().is_none());
    }

    #[test]
    fn test_select_previous_row_after_middle_removal() {
        let (data_set, records) = data_set(&["a", "b", "c"]);
        data_set.select_row(&data_set.row(1).unwrap());

        data_set.set_data(without(&records, 1));
        let selected = data_set.select_previous_row().unwrap();
        assert_eq!(selected.key(), records[0].key());
    }

    #[test]
    fn test_select_previous_row_after_first_removal() {
        let (data_set, records) = data_set(&["a", "b", "c"]);
        data_set.set_data(without(&records, 0));
        let selected = data_set.select_previous_row().unwrap();
        assert_eq!(selected.key(), records[1].key());
    }

    #[test]
    fn test_select_previous_row_after_last_removal() {
        let (data_set, records) = data_set(&["a", "b", "c"]);
        data_set.set_data(without(&records, 2));
        let selected = data_set.select_previous_row().unwrap();
        assert_eq!(selected.key(), records[1].key());
    }

    #[test]
    fn test_select_previous_row_without_removal_uses_previous_index() {
        let (data_set, records) = data_set(&["a", "b", "c"]);
        data_set.select_row(&data_set.row(2).unwrap());
        data_set.set_data(records.clone());
        let selected = data_set.select_previous_row().unwrap();
        assert_eq!(selected.key(), records[1].key());
    }

    #[test]
    fn test_select_previous_row_on_empty() {
        let (data_set, _) = data_set(&["a"]);
        data_set.set_data(Vec::new());
        assert!(data_set.select_previous_row().is_none());
    }

    #[test]
    fn test_intent_applied_once_by_set_data() {
        let (data_set, records) = data_set(&["a", "b", "c"]);
        data_set.will_select_last_row();
        assert_eq!(data_set.selection_intent(), SelectionIntent::SelectLast);

        data_set.set_data(records.clone());
        assert_eq!(data_set.selection_intent(), SelectionIntent::None);
        assert_eq!(data_set.selected_row().unwrap().key(), records[2].key());

        // A second replacement keeps the selection instead of re-applying.
        data_set.select_first_row();
        data_set.set_data(records.clone());
        assert_eq!(data_set.selected_row().unwrap().key(), records[0].key());
    }

    #[test]
    fn test_intent_survives_empty_replacement() {
        let (data_set, records) = data_set(&["a", "b"]);
        data_set.will_select_first_row();
        data_set.set_data(Vec::new());
        assert_eq!(data_set.selection_intent(), SelectionIntent::SelectFirst);

        data_set.set_data(records.clone());
        assert_eq!(data_set.selected_row().unwrap().key(), records[0].key());
    }

    #[test]
    fn test_editing_and_pending_data() {
        let (data_set, records) = data_set(&["a"]);
        let row = data_set.row(0).unwrap();

        assert!(data_set.set_editing(&row, true));
        assert!(data_set.set_new_data(&row, json!({"name": "edited"})));
        let row = data_set.row(0).unwrap();
        assert!(row.is_in_editing());
        assert_eq!(row.new_data(), &json!({"name": "edited"}));
        assert_eq!(row.data(), &records[0]);

        // External updates leave pending edits alone.
        assert!(data_set.set_row_data(&records[0].with_value(json!({"name": "remote"}))));
        let row = data_set.row(0).unwrap();
        assert_eq!(row.cell("name"), Some(&json!("remote")));
        assert_eq!(row.new_data(), &json!({"name": "edited"}));
    }

    #[test]
    fn test_set_row_data_miss() {
        let (data_set, _) = data_set(&["a"]);
        assert!(!data_set.set_row_data(&Record::new(json!({"name": "ghost"}))));
    }

    #[test]
    fn test_new_row_lifecycle() {
        let (data_set, _) = data_set(&["a"]);
        let new_row = data_set.new_row();
        assert!(new_row.is_new());
        assert_eq!(new_row.new_data(), &json!({"name": ""}));

        data_set.set_new_data(&new_row, json!({"name": "draft"}));
        assert_eq!(data_set.new_row().new_data(), &json!({"name": "draft"}));

        data_set.create_new_row();
        assert_eq!(data_set.new_row().new_data(), &json!({"name": ""}));
    }

    #[test]
    fn test_select_last_row() {
        let (data_set, records) = data_set(&["a", "b"]);
        assert_eq!(data_set.select_last_row().unwrap().key(), records[1].key());

        let empty = DataSet::new(Vec::new(), Vec::new());
        assert!(empty.select_last_row().is_none());
        assert!(empty.select_first_row().is_none());
    }
}
