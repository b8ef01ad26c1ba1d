//! An in-memory data source.

use std::cmp::Ordering;

use lattice_grid_core::logging::targets;
use lattice_grid_core::{Deferred, Signal};
use parking_lot::Mutex;
use serde_json::Value;

use super::{ChangeAction, ChangeEvent, DataSource, PagingState, SortDescriptor, SourceResult};
use crate::error::SourceError;
use crate::model::Record;

#[derive(Debug, Default)]
struct LocalState {
    data: Vec<Record>,
    sort: Vec<SortDescriptor>,
    paging: Option<PagingState>,
    /// `(field, needle)` pairs; a record must match all of them.
    filters: Vec<(String, String)>,
    fail_next: Option<SourceError>,
}

impl LocalState {
    fn filtered_sorted(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .data
            .iter()
            .filter(|record| {
                self.filters
                    .iter()
                    .all(|(field, needle)| matches_filter(record.field(field), needle))
            })
            .cloned()
            .collect();

        if !self.sort.is_empty() {
            records.sort_by(|a, b| {
                self.sort
                    .iter()
                    .map(|descriptor| compare_records(descriptor, a, b))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }
        records
    }

    fn elements(&self) -> Vec<Record> {
        let records = self.filtered_sorted();
        match self.paging {
            Some(paging) if paging.per_page > 0 => records
                .into_iter()
                .skip(paging.offset())
                .take(paging.per_page)
                .collect(),
            _ => records,
        }
    }

    fn event(&self, action: ChangeAction) -> ChangeEvent {
        ChangeEvent::new(action, self.elements())
            .with_paging(self.paging)
            .with_sort(self.sort.clone())
    }

    /// Clears filters and returns to the first page without notifying.
    fn reset(&mut self) {
        self.filters.clear();
        if let Some(paging) = self.paging.as_mut() {
            paging.page = 1;
        }
    }

    /// Moves back to the last page that still shows rows.
    fn clamp_page(&mut self) {
        let count = self.filtered_sorted().len();
        if let Some(paging) = self.paging.as_mut() {
            paging.page = paging.page.min(paging.last_page(count));
        }
    }

    fn position(&self, record: &Record) -> Result<usize, SourceError> {
        self.data
            .iter()
            .position(|r| r.key() == record.key())
            .ok_or(SourceError::NotFound(record.key()))
    }
}

/// A [`DataSource`] holding its records in memory.
///
/// Sorting, filtering and paging are applied when elements are published.
/// Every command settles before it returns.
///
/// With paging on, a prepend or append is followed by a `Page` change to the
/// page holding the new record, and a remove that empties the current page
/// steps back to the last page with rows.
///
/// # Example
///
/// ```
/// use lattice_grid::source::{DataSource, LocalDataSource};
/// use serde_json::json;
///
/// let source = LocalDataSource::with_data(vec![json!({"name": "a"}), json!({"name": "b"})]);
/// source.set_paging(1, 1, false);
/// assert_eq!(source.elements().len(), 1);
/// assert_eq!(source.count(), 2);
/// ```
pub struct LocalDataSource {
    state: Mutex<LocalState>,
    changed: Signal<ChangeEvent>,
    updated: Signal<Record>,
}

impl LocalDataSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LocalState::default()),
            changed: Signal::new(),
            updated: Signal::new(),
        }
    }

    /// Creates a source holding `values`, each assigned a fresh key.
    pub fn with_data(values: Vec<Value>) -> Self {
        let source = Self::new();
        source.state.lock().data = values.into_iter().map(Record::new).collect();
        source
    }

    /// Replaces all records and publishes a `Load` change.
    pub fn load(&self, values: Vec<Value>) -> SourceResult {
        let event = {
            let mut state = self.state.lock();
            state.data = values.into_iter().map(Record::new).collect();
            state.event(ChangeAction::Load)
        };
        self.publish(event);
        Deferred::resolved(Ok(()))
    }

    /// Adds a record without a position hint and publishes an `Add` change.
    pub fn add(&self, value: Value) -> SourceResult {
        let event = {
            let mut state = self.state.lock();
            if let Some(err) = state.fail_next.take() {
                return Deferred::resolved(Err(err));
            }
            state.data.push(Record::new(value));
            state.event(ChangeAction::Add)
        };
        self.publish(event);
        Deferred::resolved(Ok(()))
    }

    /// Filters `field` by case-insensitive substring. An empty needle clears
    /// the filter for that field. Returns to the first page.
    pub fn set_filter(&self, field: &str, needle: &str, notify: bool) -> SourceResult {
        let event = {
            let mut state = self.state.lock();
            state.filters.retain(|(f, _)| f != field);
            if !needle.is_empty() {
                state.filters.push((field.to_string(), needle.to_string()));
            }
            if let Some(paging) = state.paging.as_mut() {
                paging.page = 1;
            }
            notify.then(|| state.event(ChangeAction::Filter))
        };
        if let Some(event) = event {
            self.publish(event);
        }
        Deferred::resolved(Ok(()))
    }

    /// Removes every record and publishes an `empty` change.
    pub fn empty(&self) -> SourceResult {
        let event = {
            let mut state = self.state.lock();
            state.data.clear();
            state.event(ChangeAction::Other("empty".to_string()))
        };
        self.publish(event);
        Deferred::resolved(Ok(()))
    }

    /// Makes the next mutating command fail with `error`.
    pub fn fail_next_command(&self, error: SourceError) {
        self.state.lock().fail_next = Some(error);
    }

    /// The records currently published: filtered, sorted, then paged.
    pub fn elements(&self) -> Vec<Record> {
        self.state.lock().elements()
    }

    /// Number of records passing the filters, ignoring paging.
    pub fn count(&self) -> usize {
        self.state.lock().filtered_sorted().len()
    }

    /// Every record, in insertion order.
    pub fn all(&self) -> Vec<Record> {
        self.state.lock().data.clone()
    }

    /// Current paging, if any.
    pub fn paging(&self) -> Option<PagingState> {
        self.state.lock().paging
    }

    /// Current sort order.
    pub fn sort(&self) -> Vec<SortDescriptor> {
        self.state.lock().sort.clone()
    }

    /// Inserts a record and, when paging, moves to the page showing it: the
    /// first page after a prepend, the last page after an append. The page
    /// move is published as a separate `Page` change.
    fn insert(&self, value: Value, at_start: bool) -> SourceResult {
        let (event, page_event) = {
            let mut state = self.state.lock();
            if let Some(err) = state.fail_next.take() {
                return Deferred::resolved(Err(err));
            }
            state.reset();
            let record = Record::new(value);
            let action = if at_start {
                state.data.insert(0, record);
                ChangeAction::Prepend
            } else {
                state.data.push(record);
                ChangeAction::Append
            };
            let event = state.event(action);

            let count = state.data.len();
            let page_event = match state.paging.as_mut() {
                Some(paging) => {
                    paging.page = if at_start { 1 } else { paging.last_page(count) };
                    Some(state.event(ChangeAction::Page))
                }
                None => None,
            };
            (event, page_event)
        };
        self.publish(event);
        if let Some(page_event) = page_event {
            self.publish(page_event);
        }
        Deferred::resolved(Ok(()))
    }

    fn publish(&self, event: ChangeEvent) {
        tracing::debug!(
            target: targets::SOURCE,
            action = %event.action,
            elements = event.elements.len(),
            "local source changed"
        );
        self.changed.emit(event);
    }
}

impl Default for LocalDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSource for LocalDataSource {
    fn refresh(&self) -> SourceResult {
        let event = self.state.lock().event(ChangeAction::Refresh);
        self.publish(event);
        Deferred::resolved(Ok(()))
    }

    fn set_sort(&self, sort: Vec<SortDescriptor>, notify: bool) -> SourceResult {
        let event = {
            let mut state = self.state.lock();
            state.sort = sort;
            notify.then(|| state.event(ChangeAction::Sort))
        };
        if let Some(event) = event {
            self.publish(event);
        }
        Deferred::resolved(Ok(()))
    }

    fn set_paging(&self, page: usize, per_page: usize, notify: bool) -> SourceResult {
        let event = {
            let mut state = self.state.lock();
            state.paging = Some(PagingState { page, per_page });
            notify.then(|| state.event(ChangeAction::Page))
        };
        if let Some(event) = event {
            self.publish(event);
        }
        Deferred::resolved(Ok(()))
    }

    fn prepend(&self, value: Value) -> SourceResult {
        self.insert(value, true)
    }

    fn append(&self, value: Value) -> SourceResult {
        self.insert(value, false)
    }

    fn update(&self, record: &Record, value: Value) -> SourceResult {
        let (updated, event) = {
            let mut state = self.state.lock();
            if let Some(err) = state.fail_next.take() {
                return Deferred::resolved(Err(err));
            }
            let index = match state.position(record) {
                Ok(index) => index,
                Err(err) => return Deferred::resolved(Err(err)),
            };
            let merged = merge_values(state.data[index].value(), value);
            let updated = state.data[index].with_value(merged);
            state.data[index] = updated.clone();
            (updated, state.event(ChangeAction::Update))
        };
        self.updated.emit(updated);
        self.publish(event);
        Deferred::resolved(Ok(()))
    }

    fn remove(&self, record: &Record) -> SourceResult {
        let event = {
            let mut state = self.state.lock();
            if let Some(err) = state.fail_next.take() {
                return Deferred::resolved(Err(err));
            }
            match state.position(record) {
                Ok(index) => {
                    state.data.remove(index);
                }
                Err(err) => return Deferred::resolved(Err(err)),
            }
            state.clamp_page();
            state.event(ChangeAction::Remove)
        };
        self.publish(event);
        Deferred::resolved(Ok(()))
    }

    fn changed(&self) -> &Signal<ChangeEvent> {
        &self.changed
    }

    fn updated(&self) -> &Signal<Record> {
        &self.updated
    }
}

/// Overlays the fields of `patch` onto `base` when both are objects.
fn merge_values(base: &Value, patch: Value) -> Value {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            let mut merged = base.clone();
            merged.extend(patch);
            Value::Object(merged)
        }
        (_, patch) => patch,
    }
}

fn matches_filter(value: Option<&Value>, needle: &str) -> bool {
    let haystack = match value {
        Some(Value::String(s)) => s.to_lowercase(),
        Some(Value::Null) | None => return false,
        Some(other) => other.to_string().to_lowercase(),
    };
    haystack.contains(&needle.to_lowercase())
}

fn compare_records(descriptor: &SortDescriptor, a: &Record, b: &Record) -> Ordering {
    let a = a.field(&descriptor.field).unwrap_or(&Value::Null);
    let b = b.field(&descriptor.field).unwrap_or(&Value::Null);
    let ordering = match &descriptor.compare {
        Some(compare) => compare(a, b),
        None => compare_values(a, b),
    };
    descriptor.direction.apply(ordering)
}

/// Orders JSON values: null, then booleans, numbers, strings, and everything
/// else by its serialized form.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ if rank(a) == rank(b) => a.to_string().cmp(&b.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SortDirection;
    use serde_json::json;
    use std::sync::Arc;

    fn names(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.field("name").and_then(Value::as_str).unwrap_or("").to_string())
            .collect()
    }

    fn source(names: &[&str]) -> LocalDataSource {
        LocalDataSource::with_data(names.iter().map(|n| json!({ "name": n })).collect())
    }

    fn collect_events(source: &LocalDataSource) -> Arc<Mutex<Vec<ChangeEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();
        source
            .changed()
            .connect(move |event: &ChangeEvent| events_clone.lock().push(event.clone()));
        events
    }

    #[test]
    fn test_sort_default_and_custom() {
        let source = LocalDataSource::with_data(vec![
            json!({"name": "b", "age": 30}),
            json!({"name": "a", "age": 4}),
            json!({"name": "c", "age": 100}),
        ]);

        source.set_sort(vec![SortDescriptor::new("age", SortDirection::Ascending)], false);
        assert_eq!(names(&source.elements()), vec!["a", "b", "c"]);

        source.set_sort(vec![SortDescriptor::new("name", SortDirection::Descending)], false);
        assert_eq!(names(&source.elements()), vec!["c", "b", "a"]);

        // Compare ages as strings: "100" < "30" < "4".
        let by_text: crate::model::CompareFn = Arc::new(|a: &Value, b: &Value| a.to_string().cmp(&b.to_string()));
        source.set_sort(
            vec![SortDescriptor::new("age", SortDirection::Ascending).with_compare(Some(by_text))],
            false,
        );
        assert_eq!(names(&source.elements()), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_non_notifying_commands_are_silent() {
        let source = source(&["a", "b"]);
        let events = collect_events(&source);

        source.set_sort(vec![SortDescriptor::new("name", SortDirection::Ascending)], false);
        source.set_paging(1, 1, false);
        source.set_filter("name", "a", false);
        assert!(events.lock().is_empty());

        source.set_paging(2, 1, true);
        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, ChangeAction::Page);
    }

    #[test]
    fn test_paging_and_filter() {
        let source = source(&["apple", "banana", "cherry", "avocado"]);
        source.set_paging(2, 2, false);
        assert_eq!(names(&source.elements()), vec!["cherry", "avocado"]);

        source.set_filter("name", "A", true);
        assert_eq!(source.paging(), Some(PagingState { page: 1, per_page: 2 }));
        assert_eq!(source.count(), 3);
        assert_eq!(names(&source.elements()), vec!["apple", "banana"]);

        source.set_filter("name", "", false);
        assert_eq!(source.count(), 4);
    }

    #[test]
    fn test_prepend_and_append_reset_view() {
        let source = source(&["a", "b", "c"]);
        source.set_paging(2, 2, false);
        source.set_filter("name", "c", false);
        let events = collect_events(&source);

        source.prepend(json!({"name": "first"}));
        source.append(json!({"name": "last"}));

        let events = events.lock();
        let actions: Vec<_> = events.iter().map(|e| e.action.clone()).collect();
        assert_eq!(
            actions,
            vec![ChangeAction::Prepend, ChangeAction::Page, ChangeAction::Append, ChangeAction::Page]
        );
        assert_eq!(names(&events[0].elements), vec!["first", "a"]);
        assert_eq!(names(&events[1].elements), vec!["first", "a"]);
        assert_eq!(events[2].paging, Some(PagingState { page: 1, per_page: 2 }));
        // Five records at two per page: the appended one is alone on page 3.
        assert_eq!(events[3].paging, Some(PagingState { page: 3, per_page: 2 }));
        assert_eq!(names(&events[3].elements), vec!["last"]);
        assert_eq!(names(&source.all()), vec!["first", "a", "b", "c", "last"]);
    }

    #[test]
    fn test_insert_without_paging_publishes_once() {
        let source = source(&["a"]);
        let events = collect_events(&source);

        source.append(json!({"name": "b"}));
        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, ChangeAction::Append);
    }

    #[test]
    fn test_remove_steps_back_from_emptied_page() {
        let source = source(&["a", "b", "c"]);
        source.set_paging(2, 2, false);
        let events = collect_events(&source);
        let last = source.all()[2].clone();

        source.remove(&last);
        let events = events.lock();
        assert_eq!(events[0].action, ChangeAction::Remove);
        assert_eq!(events[0].paging, Some(PagingState { page: 1, per_page: 2 }));
        assert_eq!(names(&events[0].elements), vec!["a", "b"]);
    }

    #[test]
    fn test_page_far_past_the_end_is_empty() {
        let source = source(&["a", "b"]);
        source.set_paging(usize::MAX, 2, false);
        assert!(source.elements().is_empty());
        assert_eq!(source.refresh().try_take(), Ok(Ok(())));
    }

    #[test]
    fn test_update_merges_and_notifies() {
        let source = LocalDataSource::with_data(vec![json!({"name": "a", "age": 1})]);
        let record = source.all()[0].clone();

        let updated = Arc::new(Mutex::new(Vec::new()));
        let updated_clone = updated.clone();
        source
            .updated()
            .connect(move |record: &Record| updated_clone.lock().push(record.clone()));
        let events = collect_events(&source);

        let result = source.update(&record, json!({"age": 2}));
        assert_eq!(result.try_take(), Ok(Ok(())));

        let updated = updated.lock();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].key(), record.key());
        assert_eq!(updated[0].value(), &json!({"name": "a", "age": 2}));
        assert_eq!(events.lock()[0].action, ChangeAction::Update);
    }

    #[test]
    fn test_update_and_remove_unknown_record() {
        let source = source(&["a"]);
        let ghost = Record::new(json!({"name": "ghost"}));
        let events = collect_events(&source);

        assert_eq!(
            source.update(&ghost, json!({})).try_take(),
            Ok(Err(SourceError::NotFound(ghost.key())))
        );
        assert_eq!(
            source.remove(&ghost).try_take(),
            Ok(Err(SourceError::NotFound(ghost.key())))
        );
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_remove_publishes_remaining_rows() {
        let source = source(&["a", "b", "c"]);
        let events = collect_events(&source);
        let middle = source.all()[1].clone();

        assert_eq!(source.remove(&middle).try_take(), Ok(Ok(())));
        let events = events.lock();
        assert_eq!(events[0].action, ChangeAction::Remove);
        assert_eq!(names(&events[0].elements), vec!["a", "c"]);
    }

    #[test]
    fn test_fail_next_command() {
        let source = source(&["a"]);
        source.fail_next_command(SourceError::rejected("read only"));

        let result = source.prepend(json!({"name": "x"}));
        assert_eq!(result.try_take(), Ok(Err(SourceError::rejected("read only"))));
        assert_eq!(source.all().len(), 1);

        // Only the next command fails.
        assert_eq!(source.prepend(json!({"name": "x"})).try_take(), Ok(Ok(())));
    }

    #[test]
    fn test_load_add_and_empty() {
        let source = LocalDataSource::new();
        let events = collect_events(&source);

        source.load(vec![json!({"name": "a"})]);
        source.add(json!({"name": "b"}));
        source.empty();

        let events = events.lock();
        let actions: Vec<_> = events.iter().map(|e| e.action.clone()).collect();
        assert_eq!(
            actions,
            vec![ChangeAction::Load, ChangeAction::Add, ChangeAction::Other("empty".into())]
        );
        assert_eq!(names(&events[1].elements), vec!["a", "b"]);
        assert!(events[2].elements.is_empty());
    }

    #[test]
    fn test_compare_values_mixed_types() {
        assert_eq!(compare_values(&json!(null), &json!(1)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!("1"), &json!(1)), Ordering::Greater);
    }
}
