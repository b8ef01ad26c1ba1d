//! Selection-aware table view coordination for Lattice Grid.
//!
//! This crate connects a data source to the rows and selection a table
//! shows, featuring:
//!
//! - **Grid**: Reacts to every source change and decides what is shown and
//!   selected
//! - **Model**: Columns, rows, editing state, and deferred selection intents
//! - **Sources**: A `DataSource` trait plus an in-memory implementation with
//!   sorting, filtering, and paging
//! - **Settings**: Dotted-path configuration loaded from JSON or TOML
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lattice_grid::prelude::*;
//! use serde_json::json;
//!
//! let source = Arc::new(LocalDataSource::with_data(vec![
//!     json!({"name": "Ada", "born": 1815}),
//!     json!({"name": "Grace", "born": 1906}),
//!     json!({"name": "Edsger", "born": 1930}),
//! ]));
//! let settings = Settings::from_json_str(r#"{
//!     "columns": {
//!         "name": { "title": "Name" },
//!         "born": { "title": "Born", "sortDirection": "desc" }
//!     }
//! }"#).unwrap();
//!
//! let grid = Grid::new(source, settings);
//! let middle = grid.rows()[1].clone();
//! grid.delete(&middle);
//!
//! // The row before the deleted one is now selected.
//! let selected = grid.data_set().selected_row().unwrap();
//! assert_eq!(selected.cell("name"), Some(&json!("Edsger")));
//! ```

pub mod error;
pub mod grid;
pub mod model;
pub mod settings;
pub mod source;

pub use error::{CommandError, GridCommand, SettingsError, SourceError};
pub use grid::{Grid, GridBuilder};
pub use settings::{FromSettingsValue, PagerSettings, Settings, SettingsValue};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::error::{CommandError, GridCommand, SourceError};
    pub use crate::grid::{Grid, GridBuilder};
    pub use crate::model::{Column, DataSet, Record, RecordKey, Row, SelectionIntent, SortDirection};
    pub use crate::settings::Settings;
    pub use crate::source::{ChangeAction, ChangeEvent, DataSource, LocalDataSource, SortDescriptor};
}
