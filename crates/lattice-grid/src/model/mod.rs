//! The grid's row/column model.
//!
//! Records come from a data source; the [`DataSet`] wraps them in [`Row`]s and
//! tracks which one is selected and which ones are being edited.

mod column;
mod data_set;
mod record;
mod row;

pub use column::{columns_from_settings, Column, CompareFn, SortDirection};
pub use data_set::{DataSet, SelectionIntent};
pub use record::{Record, RecordKey};
pub use row::Row;
