//! Logging facilities for Lattice Grid.
//!
//! Lattice Grid uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("lattice_grid=debug")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "lattice_grid_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "lattice_grid_core::signal";
    /// Deferred result target.
    pub const DEFERRED: &str = "lattice_grid_core::deferred";
    /// View coordinator target.
    pub const GRID: &str = "lattice_grid::grid";
    /// Row/column model target.
    pub const MODEL: &str = "lattice_grid::model";
    /// Data source target.
    pub const SOURCE: &str = "lattice_grid::source";
    /// Settings target.
    pub const SETTINGS: &str = "lattice_grid::settings";
}

/// Span names used throughout Lattice Grid for tracing.
pub mod span_names {
    /// Processing of one data source change event.
    pub const PROCESS_CHANGE: &str = "lattice_grid::process_change";
    /// Binding a data source to a grid.
    pub const BIND_SOURCE: &str = "lattice_grid::bind_source";
}
