//! Property system for Lattice Grid.
//!
//! A [`Property`] wraps a value behind a lock so it can live inside shared,
//! `Send + Sync` state and be read or replaced without `&mut` access.
//!
//! # Example
//!
//! ```
//! use lattice_grid_core::Property;
//!
//! let prop = Property::new(42);
//! assert_eq!(prop.get(), 42);
//!
//! // Setting same value returns false (no change)
//! assert!(!prop.set(42));
//!
//! // Setting different value returns true (changed)
//! assert!(prop.set(100));
//! assert_eq!(prop.get(), 100);
//! ```

use std::fmt;

use parking_lot::RwLock;

/// A value with interior mutability and change detection.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_set_reports_change() {
        let prop = Property::new(false);
        assert!(prop.set(true));
        assert!(!prop.set(true));
        assert!(prop.get());
    }

    #[test]
    fn test_property_with() {
        let prop = Property::new(vec![1, 2, 3]);
        assert_eq!(prop.with(|v| v.len()), 3);
    }
}
