//! Error types for Lattice Grid core.

use std::fmt;

/// Errors returned when taking a value out of a [`Deferred`](crate::Deferred).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredError {
    /// The resolver has not produced a value yet.
    NotReady,
    /// The value was already handed to a continuation or taken.
    AlreadyTaken,
    /// The resolver was dropped without producing a value.
    Abandoned,
}

impl fmt::Display for DeferredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "Deferred value is not ready yet"),
            Self::AlreadyTaken => write!(f, "Deferred value has already been taken"),
            Self::Abandoned => write!(f, "Deferred was abandoned before it resolved"),
        }
    }
}

impl std::error::Error for DeferredError {}
