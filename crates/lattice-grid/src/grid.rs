//! The view coordinator.
//!
//! A [`Grid`] sits between a [`DataSource`] and the [`DataSet`] shown to the
//! user. It listens to the source's change stream, decides for every change
//! whether the rows are replaced and which row becomes selected, and turns
//! user commands (create, save, delete) into source calls.
//!
//! # Selection after a change
//!
//! | action | rows replaced | selection |
//! |---|---|---|
//! | load, page, filter, sort, refresh | yes | the surviving selection, if any |
//! | remove, rows left | yes | the row before the removed one |
//! | remove, nothing left | yes | last row after the next reload |
//! | prepend | unless paging | first row after the next reload |
//! | append | unless paging | last row after the next reload |
//! | add, update | no | first row |
//!
//! Only selections made right away are published on
//! [`row_selected`](Grid::row_selected). Deferred ones surface through the
//! reload that applies them.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lattice_grid::{Grid, Settings};
//! use lattice_grid::source::LocalDataSource;
//! use serde_json::json;
//!
//! let source = Arc::new(LocalDataSource::with_data(vec![
//!     json!({"name": "Ada"}),
//!     json!({"name": "Grace"}),
//! ]));
//! let settings = Settings::from_json_str(r#"{"columns": {"name": {"title": "Name"}}}"#).unwrap();
//!
//! let grid = Grid::new(source, settings);
//! assert_eq!(grid.rows().len(), 2);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use lattice_grid_core::logging::{span_names, targets};
use lattice_grid_core::{ConnectionGuard, Property, Signal};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::error::{CommandError, GridCommand};
use crate::model::{columns_from_settings, Column, CompareFn, DataSet, Record, RecordKey, Row};
use crate::settings::{FromSettingsValue, PagerSettings, Settings};
use crate::source::{ChangeAction, ChangeEvent, DataSource, SortDescriptor, SourceResult};

/// Returns true if rows should be replaced by the elements of a change with
/// `action`.
///
/// Prepends and appends only replace when the grid is not paging; with a
/// pager the source follows up with its own reload.
pub fn should_replace(action: &ChangeAction, pager_display: bool) -> bool {
    match action {
        ChangeAction::Filter
        | ChangeAction::Sort
        | ChangeAction::Page
        | ChangeAction::Remove
        | ChangeAction::Refresh
        | ChangeAction::Load => true,
        ChangeAction::Prepend | ChangeAction::Append => !pager_display,
        _ => false,
    }
}

/// Applies the selection rule for `event` to `data_set`.
///
/// Returns the row selected right away, if any. Actions whose target row
/// only exists after a reload record a selection intent instead.
pub fn determine_row_to_select(data_set: &DataSet, event: &ChangeEvent) -> Option<Row> {
    match event.action {
        ChangeAction::Load
        | ChangeAction::Page
        | ChangeAction::Filter
        | ChangeAction::Sort
        | ChangeAction::Refresh => data_set.select(),
        ChangeAction::Remove if event.elements.is_empty() => {
            data_set.will_select_last_row();
            None
        }
        ChangeAction::Remove => data_set.select_previous_row(),
        ChangeAction::Append => {
            data_set.will_select_last_row();
            None
        }
        ChangeAction::Add | ChangeAction::Update => data_set.select_first_row(),
        ChangeAction::Prepend => {
            data_set.will_select_first_row();
            None
        }
        ChangeAction::Other(_) => None,
    }
}

/// Derives the sort a grid applies when it binds a source.
///
/// The last column that is sortable and declares a default direction wins.
pub fn initial_sort(columns: &[Arc<Column>]) -> Option<SortDescriptor> {
    columns
        .iter()
        .rev()
        .find(|column| column.is_sortable() && column.default_sort_direction().is_some())
        .and_then(|column| {
            let direction = column.default_sort_direction()?;
            Some(SortDescriptor::new(column.id(), direction).with_compare(column.compare_fn()))
        })
}

/// A bound source and the grid's subscriptions on it, which end when the
/// binding is dropped.
struct SourceBinding {
    source: Arc<dyn DataSource>,
    _changed: ConnectionGuard<ChangeEvent>,
    _updated: ConnectionGuard<Record>,
}

struct GridInner {
    settings: RwLock<Arc<Settings>>,
    data_set: RwLock<Arc<DataSet>>,
    compares: HashMap<String, CompareFn>,
    binding: Mutex<Option<SourceBinding>>,
    /// Bumped on every bind and unbind. Callbacks carry the value they were
    /// created under and do nothing once it is stale.
    generation: AtomicU64,
    create_form_shown: Property<bool>,
    row_selected: Signal<Row>,
    command_failed: Signal<CommandError>,
}

/// Upgrades `weak` if the grid still exists and is bound as it was at
/// `generation`.
fn live(weak: &Weak<GridInner>, generation: u64) -> Option<Arc<GridInner>> {
    weak.upgrade()
        .filter(|inner| inner.generation.load(Ordering::SeqCst) == generation)
}

fn log_failure(result: SourceResult, what: &'static str) {
    result.on_complete(move |result| {
        if let Err(err) = result {
            tracing::warn!(target: targets::GRID, %err, "data source {what} failed");
        }
    });
}

impl GridInner {
    fn new(settings: Settings, compares: HashMap<String, CompareFn>) -> Self {
        let data_set = build_data_set(&settings, &compares);
        Self {
            settings: RwLock::new(Arc::new(settings)),
            data_set: RwLock::new(Arc::new(data_set)),
            compares,
            binding: Mutex::new(None),
            generation: AtomicU64::new(0),
            create_form_shown: Property::new(false),
            row_selected: Signal::new(),
            command_failed: Signal::new(),
        }
    }

    fn settings(&self) -> Arc<Settings> {
        self.settings.read().clone()
    }

    fn data_set(&self) -> Arc<DataSet> {
        self.data_set.read().clone()
    }

    fn source(&self) -> Option<Arc<dyn DataSource>> {
        self.binding.lock().as_ref().map(|b| b.source.clone())
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn bind(self: &Arc<Self>, source: Arc<dyn DataSource>) {
        self.unbind();

        let span = tracing::debug_span!(target: targets::GRID, span_names::BIND_SOURCE);
        let _enter = span.enter();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.prepare_source(source.as_ref());

        // Subscribe before refreshing: sources may publish the refresh
        // before `refresh` returns.
        let weak = Arc::downgrade(self);
        let changed = source.changed().connect_scoped(move |event: &ChangeEvent| {
            if let Some(inner) = live(&weak, generation) {
                inner.process_change(event);
            }
        });
        let weak = Arc::downgrade(self);
        let updated = source.updated().connect_scoped(move |record: &Record| {
            if let Some(inner) = live(&weak, generation) {
                inner.process_update(record);
            }
        });

        *self.binding.lock() = Some(SourceBinding {
            source: source.clone(),
            _changed: changed,
            _updated: updated,
        });
        tracing::debug!(target: targets::GRID, generation, "data source bound");

        log_failure(source.refresh(), "refresh");
    }

    fn unbind(&self) {
        // Dropping the binding ends both subscriptions.
        let binding = self.binding.lock().take();
        self.generation.fetch_add(1, Ordering::SeqCst);
        if binding.is_some() {
            tracing::debug!(target: targets::GRID, "data source unbound");
        }
    }

    /// Pushes the initial sort and paging to `source` without notifications.
    fn prepare_source(&self, source: &dyn DataSource) {
        if let Some(sort) = initial_sort(self.data_set().columns()) {
            tracing::debug!(
                target: targets::GRID,
                field = %sort.field,
                direction = %sort.direction,
                "applying initial sort"
            );
            log_failure(source.set_sort(vec![sort], false), "set_sort");
        }

        let pager = PagerSettings::from_settings(&self.settings());
        if pager.display {
            log_failure(source.set_paging(1, pager.per_page, false), "set_paging");
        }
    }

    fn process_change(&self, event: &ChangeEvent) -> Option<Row> {
        let span = tracing::debug_span!(
            target: targets::GRID,
            span_names::PROCESS_CHANGE,
            action = %event.action,
            elements = event.elements.len()
        );
        let _enter = span.enter();

        let data_set = self.data_set();
        // Any truthy `pager.display` counts here, unlike source preparation.
        let paging = self.settings().is_truthy("pager.display");
        if should_replace(&event.action, paging) {
            data_set.set_data(event.elements.clone());
        }

        let row = determine_row_to_select(&data_set, event);
        tracing::debug!(
            target: targets::GRID,
            selected = ?row.as_ref().map(Row::key),
            intent = ?data_set.selection_intent(),
            "change processed"
        );

        if let Some(row) = &row {
            self.row_selected.emit(row.clone());
        }
        row
    }

    fn process_update(&self, record: &Record) {
        if !self.data_set().set_row_data(record) {
            tracing::debug!(
                target: targets::GRID,
                key = %record.key(),
                "updated record is not shown, ignoring"
            );
        }
    }

    /// Settles a command result: runs `on_success` or `on_failure`, and
    /// reports failures on `command_failed`. Stale results are dropped.
    fn track<S, F>(
        self: &Arc<Self>,
        command: GridCommand,
        key: Option<RecordKey>,
        result: SourceResult,
        on_success: S,
        on_failure: F,
    ) where
        S: FnOnce(&GridInner) + Send + 'static,
        F: FnOnce(&GridInner) + Send + 'static,
    {
        let generation = self.generation();
        let weak = Arc::downgrade(self);
        let weak_failure = weak.clone();

        result.on_settled(
            move |()| {
                if let Some(inner) = live(&weak, generation) {
                    on_success(&*inner);
                }
            },
            move |source| {
                let Some(inner) = live(&weak_failure, generation) else {
                    tracing::debug!(target: targets::GRID, %command, %source, "command failed after unbind");
                    return;
                };
                on_failure(&*inner);
                let error = CommandError {
                    command,
                    key,
                    source,
                };
                tracing::warn!(target: targets::GRID, %error, "grid command failed");
                inner.command_failed.emit(error);
            },
        );
    }

    /// The current state of `row`, falling back to the snapshot itself.
    fn live_row(&self, row: &Row) -> Row {
        let data_set = self.data_set();
        if row.is_new() {
            return data_set.new_row();
        }
        data_set
            .find_row_by_data(row.data())
            .unwrap_or_else(|| row.clone())
    }

    fn bound_source(&self, command: GridCommand) -> Option<Arc<dyn DataSource>> {
        let source = self.source();
        if source.is_none() {
            tracing::warn!(target: targets::GRID, %command, "no data source bound");
        }
        source
    }
}

fn build_data_set(settings: &Settings, compares: &HashMap<String, CompareFn>) -> DataSet {
    let columns = columns_from_settings(settings.get_raw("columns").as_ref(), compares);
    DataSet::new(Vec::new(), columns)
}

/// Coordinates a data source with the rows and selection shown to the user.
///
/// Dropping the grid disconnects it from its source.
pub struct Grid {
    inner: Arc<GridInner>,
}

impl Grid {
    /// Creates a grid from `settings` and binds it to `source`.
    pub fn new(source: Arc<dyn DataSource>, settings: Settings) -> Self {
        Self::builder(settings).build(source)
    }

    /// Starts building a grid that needs extra configuration.
    pub fn builder(settings: Settings) -> GridBuilder {
        GridBuilder {
            settings,
            compares: HashMap::new(),
        }
    }

    // =========================================================================
    // Configuration and binding
    // =========================================================================

    /// Replaces the settings and rebuilds the model with no rows.
    ///
    /// The current source stays bound; its next change fills the new model.
    pub fn set_settings(&self, settings: Settings) {
        let data_set = build_data_set(&settings, &self.inner.compares);
        *self.inner.settings.write() = Arc::new(settings);
        *self.inner.data_set.write() = Arc::new(data_set);
        tracing::debug!(target: targets::GRID, "settings replaced");
    }

    /// The current settings.
    pub fn settings(&self) -> Arc<Settings> {
        self.inner.settings()
    }

    /// Looks up a setting by dotted path, returning `default` when it is
    /// missing or has the wrong type.
    pub fn setting<T: FromSettingsValue>(&self, path: &str, default: T) -> T {
        self.inner.settings().get_or(path, default)
    }

    /// Binds `source`, replacing any previous one.
    ///
    /// Applies the initial sort and paging, subscribes to the source, then
    /// asks it to refresh.
    pub fn set_source(&self, source: Arc<dyn DataSource>) {
        self.inner.bind(source);
    }

    /// The bound source, if any.
    pub fn source(&self) -> Option<Arc<dyn DataSource>> {
        self.inner.source()
    }

    /// Disconnects from the source. Pending command results are ignored.
    pub fn unbind(&self) {
        self.inner.unbind();
    }

    // =========================================================================
    // Model access
    // =========================================================================

    /// The model behind the grid.
    pub fn data_set(&self) -> Arc<DataSet> {
        self.inner.data_set()
    }

    /// The column definitions.
    pub fn columns(&self) -> Vec<Arc<Column>> {
        self.inner.data_set().columns().to_vec()
    }

    /// Snapshots of the current rows.
    pub fn rows(&self) -> Vec<Row> {
        self.inner.data_set().rows()
    }

    /// The blank row backing the create form.
    pub fn new_row(&self) -> Row {
        self.inner.data_set().new_row()
    }

    /// Selects `row` in the model.
    pub fn select_row(&self, row: &Row) -> Option<Row> {
        self.inner.data_set().select_row(row)
    }

    /// Flags `row` as being edited.
    pub fn edit(&self, row: &Row) {
        self.inner.data_set().set_editing(row, true);
    }

    /// Shows or hides the create form.
    pub fn show_create_form(&self, shown: bool) {
        self.inner.create_form_shown.set(shown);
    }

    /// Whether the create form is shown.
    pub fn create_form_shown(&self) -> bool {
        self.inner.create_form_shown.get()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Prepends the new row's pending data to the source.
    ///
    /// On success the create form is hidden and a fresh blank row replaces
    /// the new row.
    pub fn create(&self, row: &Row) {
        let Some(source) = self.inner.bound_source(GridCommand::Create) else {
            return;
        };
        let row = self.inner.live_row(row);
        let result = source.prepend(row.new_data().clone());
        self.inner.track(
            GridCommand::Create,
            None,
            result,
            |inner| {
                inner.create_form_shown.set(false);
                inner.data_set().create_new_row();
            },
            |_| {},
        );
    }

    /// Writes `row`'s pending data to the source.
    ///
    /// On success the row leaves editing; on failure it stays in editing.
    pub fn save(&self, row: &Row) {
        let Some(source) = self.inner.bound_source(GridCommand::Save) else {
            return;
        };
        let row = self.inner.live_row(row);
        let result = source.update(row.data(), row.new_data().clone());
        let failed_row = row.clone();
        self.inner.track(
            GridCommand::Save,
            Some(row.key()),
            result,
            move |inner| {
                inner.data_set().set_editing(&row, false);
            },
            move |inner| {
                inner.data_set().set_editing(&failed_row, true);
            },
        );
    }

    /// Removes `row`'s record from the source.
    ///
    /// The source's `remove` change drives the resulting selection.
    pub fn delete(&self, row: &Row) {
        let Some(source) = self.inner.bound_source(GridCommand::Delete) else {
            return;
        };
        let row = self.inner.live_row(row);
        let result = source.remove(row.data());
        self.inner
            .track(GridCommand::Delete, Some(row.key()), result, |_| {}, |_| {});
    }

    // =========================================================================
    // Signals
    // =========================================================================

    /// Emitted with the row selected in response to a change.
    pub fn row_selected(&self) -> &Signal<Row> {
        &self.inner.row_selected
    }

    /// Emitted when a create, save, or delete command fails.
    pub fn command_failed(&self) -> &Signal<CommandError> {
        &self.inner.command_failed
    }
}

impl Drop for Grid {
    fn drop(&mut self) {
        self.inner.unbind();
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("rows", &self.inner.data_set().len())
            .field("bound", &self.inner.binding.lock().is_some())
            .field("generation", &self.inner.generation())
            .finish()
    }
}

/// Builder for a [`Grid`] with per-column comparison functions.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use lattice_grid::{Grid, Settings};
/// use lattice_grid::source::LocalDataSource;
///
/// let settings = Settings::from_json_str(r#"{"columns": {"size": {"sortDirection": "asc"}}}"#).unwrap();
/// let grid = Grid::builder(settings)
///     .compare("size", |a, b| a.to_string().len().cmp(&b.to_string().len()))
///     .build(Arc::new(LocalDataSource::new()));
/// assert!(grid.columns()[0].compare_fn().is_some());
/// ```
pub struct GridBuilder {
    settings: Settings,
    compares: HashMap<String, CompareFn>,
}

impl GridBuilder {
    /// Sets the comparison used when sorting column `id`.
    pub fn compare<F>(mut self, id: impl Into<String>, compare: F) -> Self
    where
        F: Fn(&Value, &Value) -> std::cmp::Ordering + Send + Sync + 'static,
    {
        self.compares.insert(id.into(), Arc::new(compare));
        self
    }

    /// Creates the grid and binds it to `source`.
    pub fn build(self, source: Arc<dyn DataSource>) -> Grid {
        let inner = Arc::new(GridInner::new(self.settings, self.compares));
        inner.bind(source);
        Grid { inner }
    }
}
