//! Change notifications published by data sources.

use std::fmt;
use std::str::FromStr;

use crate::model::Record;

use super::{PagingState, SortDescriptor};

/// What a data source did to produce a [`ChangeEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    /// Initial load or wholesale replacement of the data.
    Load,
    /// Filter criteria changed.
    Filter,
    /// Sort order changed.
    Sort,
    /// Current page changed.
    Page,
    /// Explicit refresh.
    Refresh,
    /// A record was added without a position.
    Add,
    /// A record was updated in place.
    Update,
    /// A record was removed.
    Remove,
    /// A record was inserted at the start.
    Prepend,
    /// A record was inserted at the end.
    Append,
    /// An action this crate does not know about.
    Other(String),
}

impl ChangeAction {
    /// The wire spelling of this action.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Load => "load",
            Self::Filter => "filter",
            Self::Sort => "sort",
            Self::Page => "page",
            Self::Refresh => "refresh",
            Self::Add => "add",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::Prepend => "prepend",
            Self::Append => "append",
            Self::Other(name) => name,
        }
    }

    /// Returns true for actions after which `elements` is the complete row
    /// set to show, regardless of paging.
    pub fn is_reload(&self) -> bool {
        matches!(
            self,
            Self::Load | Self::Filter | Self::Sort | Self::Page | Self::Refresh | Self::Remove
        )
    }
}

impl FromStr for ChangeAction {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "load" => Self::Load,
            "filter" => Self::Filter,
            "sort" => Self::Sort,
            "page" => Self::Page,
            "refresh" => Self::Refresh,
            "add" => Self::Add,
            "update" => Self::Update,
            "remove" => Self::Remove,
            "prepend" => Self::Prepend,
            "append" => Self::Append,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<&str> for ChangeAction {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(action) => action,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change published on [`DataSource::changed`](super::DataSource::changed).
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// What happened.
    pub action: ChangeAction,
    /// The rows the source now shows (the current page when paging).
    pub elements: Vec<Record>,
    /// Paging in effect when the event was produced.
    pub paging: Option<PagingState>,
    /// Sort in effect when the event was produced.
    pub sort: Vec<SortDescriptor>,
}

impl ChangeEvent {
    /// Creates an event with no paging or sort details.
    pub fn new(action: impl Into<ChangeAction>, elements: Vec<Record>) -> Self {
        Self {
            action: action.into(),
            elements,
            paging: None,
            sort: Vec::new(),
        }
    }

    /// Attaches the paging in effect.
    pub fn with_paging(mut self, paging: Option<PagingState>) -> Self {
        self.paging = paging;
        self
    }

    /// Attaches the sort in effect.
    pub fn with_sort(mut self, sort: Vec<SortDescriptor>) -> Self {
        self.sort = sort;
        self
    }
}
