//! Records: the unit of data exchanged with a data source.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Global counter for record keys. Zero is reserved for unsaved records.
static NEXT_RECORD_KEY: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a record.
///
/// Keys are assigned by the data source when a record enters it and survive
/// every reload, sort, or in-place update. Rows are matched to records by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey(u64);

impl RecordKey {
    /// Key carried by records that no data source has accepted yet.
    pub const UNASSIGNED: Self = Self(0);

    /// Allocate a fresh, process-unique key.
    pub fn next() -> Self {
        Self(NEXT_RECORD_KEY.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw key value.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns true for the unsaved-record key.
    pub fn is_unassigned(self) -> bool {
        self == Self::UNASSIGNED
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A keyed data record, usually a JSON object keyed by column id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    key: RecordKey,
    value: Value,
}

impl Record {
    /// Wrap `value` with a freshly allocated key.
    pub fn new(value: Value) -> Self {
        Self::with_key(RecordKey::next(), value)
    }

    /// Wrap `value` with an explicit key.
    pub fn with_key(key: RecordKey, value: Value) -> Self {
        Self { key, value }
    }

    /// A record no data source has seen yet.
    pub fn unassigned(value: Value) -> Self {
        Self::with_key(RecordKey::UNASSIGNED, value)
    }

    /// The record's identity.
    pub fn key(&self) -> RecordKey {
        self.key
    }

    /// The record's current data.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Looks up one field of an object record.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.value.get(name)
    }

    /// Same identity, new data.
    pub fn with_value(&self, value: Value) -> Self {
        Self::with_key(self.key, value)
    }

    /// Consumes the record, returning its data.
    pub fn into_value(self) -> Value {
        self.value
    }
}
