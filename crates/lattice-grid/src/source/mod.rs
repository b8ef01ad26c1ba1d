//! Data sources: where a grid's records come from.
//!
//! A [`DataSource`] owns the records, applies sort/paging/filter state, and
//! reports every change on its [`changed`](DataSource::changed) signal. The
//! grid never reads the source directly; it only reacts to those events.
//!
//! Commands return a [`Deferred`] that settles once the source has accepted or
//! rejected them. A source may settle synchronously (as [`LocalDataSource`]
//! does) or from another thread.

mod change;
mod local;

use std::fmt;

use lattice_grid_core::{Deferred, Signal};
use serde_json::Value;

use crate::error::SourceError;
use crate::model::{CompareFn, Record, SortDirection};

pub use change::{ChangeAction, ChangeEvent};
pub use local::LocalDataSource;

/// Result of a data source command.
pub type SourceResult = Deferred<Result<(), SourceError>>;

/// One sort key.
#[derive(Clone)]
pub struct SortDescriptor {
    /// The record field to sort by.
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
    /// Custom comparison; JSON value ordering when absent.
    pub compare: Option<CompareFn>,
}

impl SortDescriptor {
    /// Creates a descriptor using the default value ordering.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
            compare: None,
        }
    }

    /// Sets a custom comparison.
    pub fn with_compare(mut self, compare: Option<CompareFn>) -> Self {
        self.compare = compare;
        self
    }
}

impl PartialEq for SortDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.direction == other.direction
    }
}

impl fmt::Debug for SortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortDescriptor")
            .field("field", &self.field)
            .field("direction", &self.direction)
            .field("compare", &self.compare.is_some())
            .finish()
    }
}

/// Paging state. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingState {
    /// Current page.
    pub page: usize,
    /// Rows per page.
    pub per_page: usize,
}

impl PagingState {
    /// Index of the first row of the current page. Saturates for pages
    /// far past the end.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    /// The last page that shows any of `count` rows. Page 1 when there are
    /// none.
    pub fn last_page(&self, count: usize) -> usize {
        if self.per_page == 0 {
            return 1;
        }
        count.div_ceil(self.per_page).max(1)
    }
}

/// A provider of records that notifies observers of every change.
///
/// Commands taking a `notify` flag only update state when it is false; they
/// must not emit on [`changed`](Self::changed) in that case.
pub trait DataSource: Send + Sync {
    /// Re-publishes the current elements as a `Refresh` change.
    fn refresh(&self) -> SourceResult;

    /// Replaces the sort order.
    fn set_sort(&self, sort: Vec<SortDescriptor>, notify: bool) -> SourceResult;

    /// Moves to `page` with `per_page` rows per page.
    fn set_paging(&self, page: usize, per_page: usize, notify: bool) -> SourceResult;

    /// Inserts a new record at the start.
    ///
    /// A paging source follows the `Prepend` change with a reload that shows
    /// the new record, such as a `Page` change to the first page.
    fn prepend(&self, value: Value) -> SourceResult;

    /// Inserts a new record at the end, with the same follow-up reload as
    /// [`prepend`](Self::prepend) when paging.
    fn append(&self, value: Value) -> SourceResult;

    /// Replaces the data of an existing record.
    fn update(&self, record: &Record, value: Value) -> SourceResult;

    /// Removes a record.
    fn remove(&self, record: &Record) -> SourceResult;

    /// Emitted after every change.
    fn changed(&self) -> &Signal<ChangeEvent>;

    /// Emitted with the new record after an in-place update.
    fn updated(&self) -> &Signal<Record>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_offset() {
        assert_eq!(PagingState { page: 1, per_page: 10 }.offset(), 0);
        assert_eq!(PagingState { page: 3, per_page: 5 }.offset(), 10);
        assert_eq!(PagingState { page: 0, per_page: 5 }.offset(), 0);
    }

    #[test]
    fn test_paging_offset_saturates() {
        let paging = PagingState { page: usize::MAX, per_page: 2 };
        assert_eq!(paging.offset(), usize::MAX);
    }

    #[test]
    fn test_last_page() {
        let paging = PagingState { page: 1, per_page: 2 };
        assert_eq!(paging.last_page(0), 1);
        assert_eq!(paging.last_page(2), 1);
        assert_eq!(paging.last_page(3), 2);
        assert_eq!(PagingState { page: 1, per_page: 0 }.last_page(9), 1);
    }

    #[test]
    fn test_sort_descriptor_debug_hides_compare() {
        let descriptor = SortDescriptor::new("name", SortDirection::Ascending)
            .with_compare(Some(std::sync::Arc::new(|a: &Value, b: &Value| {
                a.to_string().cmp(&b.to_string())
            })));
        let debug = format!("{descriptor:?}");
        assert!(debug.contains("compare: true"));
    }
}
