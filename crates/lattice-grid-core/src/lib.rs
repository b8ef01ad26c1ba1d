//! Core systems for Lattice Grid.
//!
//! This crate provides the building blocks the grid coordinator is wired
//! from:
//!
//! - **Signal/Slot System**: Type-safe publish/subscribe channels
//! - **Deferred Results**: Single-shot, callback-based command completion
//! - **Property System**: Shared values with change detection
//! - **Logging**: `tracing` targets for every subsystem
//!
//! # Signal/Slot Example
//!
//! ```
//! use lattice_grid_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//!
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```

pub mod deferred;
mod error;
pub mod logging;
pub mod property;
pub mod signal;

pub use deferred::{deferred_pair, Deferred, Resolver};
pub use error::DeferredError;
pub use property::Property;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
