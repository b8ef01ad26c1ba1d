//! Error types for the grid.

use std::path::PathBuf;

use crate::model::RecordKey;

/// Result type alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Errors raised while loading grid settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("Failed to read settings '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON settings failed to parse.
    #[error("Invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML settings failed to parse.
    #[error("Invalid TOML settings: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SettingsError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors reported by a data source when it rejects a command.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// No record with the given key exists in the source.
    #[error("No record with key {0} in the data source")]
    NotFound(RecordKey),

    /// The source refused the command.
    #[error("Data source rejected the command: {0}")]
    Rejected(String),

    /// The source cannot be reached.
    #[error("Data source is unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// Create a rejection error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// The user-facing command that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridCommand {
    /// Prepending the new row's data.
    Create,
    /// Writing a row's pending data.
    Save,
    /// Removing a row's data.
    Delete,
}

impl std::fmt::Display for GridCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Save => write!(f, "save"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A failed create/save/delete command, as published on
/// [`Grid::command_failed`](crate::Grid::command_failed).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Grid {command} failed: {source}")]
pub struct CommandError {
    /// Which command failed.
    pub command: GridCommand,
    /// The record the command targeted, if it had one.
    pub key: Option<RecordKey>,
    /// Why the data source rejected it.
    #[source]
    pub source: SourceError,
}
