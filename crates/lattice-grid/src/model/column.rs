//! Column definitions.
//!
//! Columns are read from the `columns` setting, either as an object keyed by
//! column id (declaration order is display order) or as an array of objects
//! carrying an `id` field:
//!
//! ```json
//! {
//!   "columns": {
//!     "name": { "title": "Name", "sortDirection": "asc" },
//!     "age":  { "title": "Age",  "sort": false }
//!   }
//! }
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use lattice_grid_core::logging::targets;
use serde_json::Value;

use crate::settings::{SettingsMap, SettingsValue};

/// Compares two cell values for sorting.
pub type CompareFn = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

/// Sort direction for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    /// The settings spelling of this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }

    /// Applies this direction to an ascending ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Ascending),
            "desc" => Ok(Self::Descending),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of the grid.
#[derive(Clone)]
pub struct Column {
    id: String,
    title: String,
    sortable: bool,
    editable: bool,
    default_sort_direction: Option<SortDirection>,
    compare: Option<CompareFn>,
}

impl Column {
    /// Creates a sortable, editable column titled after its id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            sortable: true,
            editable: true,
            default_sort_direction: None,
            compare: None,
        }
    }

    /// Sets the header title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets whether the column can be sorted.
    pub fn with_sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    /// Sets whether cells in this column can be edited.
    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    /// Sets the direction the grid sorts by when it first binds a source.
    pub fn with_default_sort(mut self, direction: Option<SortDirection>) -> Self {
        self.default_sort_direction = direction;
        self
    }

    /// Sets a custom comparison for this column's values.
    pub fn with_compare<F>(mut self, compare: F) -> Self
    where
        F: Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    {
        self.compare = Some(Arc::new(compare));
        self
    }

    /// Builds a column from its settings entry.
    ///
    /// `sort` defaults to true; `sortDirection` only counts when it is
    /// `"asc"` or `"desc"`.
    pub fn from_settings(id: impl Into<String>, conf: &SettingsValue) -> Self {
        let mut column = Self::new(id);
        let Some(conf) = conf.as_object() else {
            return column;
        };

        if let Some(title) = conf.get("title").and_then(SettingsValue::as_str) {
            column.title = title.to_string();
        }
        if let Some(sortable) = conf.get("sort").and_then(SettingsValue::as_bool) {
            column.sortable = sortable;
        }
        if let Some(editable) = conf.get("editable").and_then(SettingsValue::as_bool) {
            column.editable = editable;
        }
        column.default_sort_direction = conf
            .get("sortDirection")
            .and_then(SettingsValue::as_str)
            .and_then(|s| s.parse().ok());
        column
    }

    /// The column id, also the record field it displays.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The header title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Whether the column can be sorted.
    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    /// Whether cells in this column can be edited.
    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// The direction to sort by on first bind, if any.
    pub fn default_sort_direction(&self) -> Option<SortDirection> {
        self.default_sort_direction
    }

    /// The custom comparison, if one was supplied.
    pub fn compare_fn(&self) -> Option<CompareFn> {
        self.compare.clone()
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("sortable", &self.sortable)
            .field("editable", &self.editable)
            .field("default_sort_direction", &self.default_sort_direction)
            .field("compare", &self.compare.is_some())
            .finish()
    }
}

/// Parses the `columns` setting into column definitions.
///
/// Comparison functions cannot live in settings, so they are attached
/// afterwards from `compares`, keyed by column id.
pub fn columns_from_settings(
    columns: Option<&SettingsValue>,
    compares: &HashMap<String, CompareFn>,
) -> Vec<Column> {
    let parsed: Vec<Column> = match columns {
        Some(SettingsValue::Object(map)) => columns_from_map(map),
        Some(SettingsValue::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let id = item.as_object()?.get("id")?.as_str()?;
                Some(Column::from_settings(id, item))
            })
            .collect(),
        Some(other) if !other.is_null() => {
            tracing::warn!(target: targets::MODEL, "ignoring `columns` setting that is neither an object nor an array");
            Vec::new()
        }
        _ => Vec::new(),
    };

    parsed
        .into_iter()
        .map(|mut column| {
            if let Some(compare) = compares.get(column.id()) {
                column.compare = Some(compare.clone());
            }
            column
        })
        .collect()
}

fn columns_from_map(map: &SettingsMap) -> Vec<Column> {
    map.iter()
        .map(|(id, conf)| Column::from_settings(id.as_str(), conf))
        .collect()
}
