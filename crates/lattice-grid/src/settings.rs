//! Grid settings.
//!
//! Settings are a hierarchical key-value tree addressed with dotted paths.
//! They are usually loaded once from JSON or TOML and then only read:
//!
//! ```
//! use lattice_grid::Settings;
//!
//! let settings = Settings::from_json_str(r#"{
//!     "pager": { "display": true, "perPage": 5 },
//!     "columns": { "name": { "title": "Name" } }
//! }"#).unwrap();
//!
//! assert!(settings.get_or("pager.display", false));
//! assert_eq!(settings.get_or("pager.perPage", 10), 5);
//! assert_eq!(settings.get_or("pager.x.y", 7), 7);
//! ```
//!
//! Lookups never fail: a missing segment anywhere along the path, or a leaf
//! of the wrong type, yields the caller's default.

use std::path::Path;

use indexmap::IndexMap;
use lattice_grid_core::logging::targets;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SettingsError};

/// Ordered map used for nested settings objects.
///
/// Insertion order matters: columns are declared in display order.
pub type SettingsMap = IndexMap<String, SettingsValue>;

/// A value that can be stored in settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingsValue {
    /// A null/empty value.
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit floating point number.
    Float(f64),
    /// A string value.
    String(String),
    /// An array of values.
    Array(Vec<SettingsValue>),
    /// A nested object/table.
    Object(SettingsMap),
}

impl SettingsValue {
    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, SettingsValue::Null)
    }

    /// Loose truth value: null, `false`, zero, NaN and the empty string are
    /// false, everything else (including empty arrays and objects) is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            SettingsValue::Null => false,
            SettingsValue::Bool(v) => *v,
            SettingsValue::Integer(v) => *v != 0,
            SettingsValue::Float(v) => *v != 0.0 && !v.is_nan(),
            SettingsValue::String(v) => !v.is_empty(),
            SettingsValue::Array(_) | SettingsValue::Object(_) => true,
        }
    }

    /// Returns this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingsValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SettingsValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns this value as a float. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingsValue::Float(v) => Some(*v),
            SettingsValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns this value as a string slice, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingsValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&Vec<SettingsValue>> {
        match self {
            SettingsValue::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Returns this value as an object, if it is one.
    pub fn as_object(&self) -> Option<&SettingsMap> {
        match self {
            SettingsValue::Object(v) => Some(v),
            _ => None,
        }
    }
}

impl Default for SettingsValue {
    fn default() -> Self {
        SettingsValue::Null
    }
}

impl From<bool> for SettingsValue {
    fn from(v: bool) -> Self {
        SettingsValue::Bool(v)
    }
}

impl From<i32> for SettingsValue {
    fn from(v: i32) -> Self {
        SettingsValue::Integer(v as i64)
    }
}

impl From<i64> for SettingsValue {
    fn from(v: i64) -> Self {
        SettingsValue::Integer(v)
    }
}

impl From<f64> for SettingsValue {
    fn from(v: f64) -> Self {
        SettingsValue::Float(v)
    }
}

impl From<String> for SettingsValue {
    fn from(v: String) -> Self {
        SettingsValue::String(v)
    }
}

impl From<&str> for SettingsValue {
    fn from(v: &str) -> Self {
        SettingsValue::String(v.to_string())
    }
}

impl<T: Into<SettingsValue>> From<Vec<T>> for SettingsValue {
    fn from(v: Vec<T>) -> Self {
        SettingsValue::Array(v.into_iter().map(Into::into).collect())
    }
}

/// Hierarchical grid configuration.
///
/// Values are stored behind a lock so a `Settings` can be shared between the
/// grid and whoever built it.
#[derive(Debug, Default)]
pub struct Settings {
    data: RwLock<SettingsMap>,
}

impl Clone for Settings {
    fn clone(&self) -> Self {
        Self::from_data(self.data.read().clone())
    }
}

impl Settings {
    /// Creates a new empty settings store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates settings from a nested map.
    pub fn from_data(data: SettingsMap) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Parses settings from a JSON document whose root is an object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let data: SettingsMap = serde_json::from_str(json)?;
        Ok(Self::from_data(data))
    }

    /// Parses settings from a TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let data: SettingsMap = toml::from_str(toml)?;
        Ok(Self::from_data(data))
    }

    /// Loads settings from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SettingsError::io(path, e))?;
        tracing::debug!(target: targets::SETTINGS, path = %path.display(), "loading JSON settings");
        Self::from_json_str(&text)
    }

    /// Loads settings from a TOML file.
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SettingsError::io(path, e))?;
        tracing::debug!(target: targets::SETTINGS, path = %path.display(), "loading TOML settings");
        Self::from_toml_str(&text)
    }

    /// Sets a value at the specified dotted path.
    ///
    /// Intermediate objects are created automatically if they don't exist.
    pub fn set<V: Into<SettingsValue>>(&self, path: &str, value: V) {
        let parts = Self::parse_path(path);
        if parts.is_empty() {
            return;
        }
        Self::set_nested(&mut self.data.write(), &parts, value.into());
    }

    /// Gets a value at the specified path.
    ///
    /// Returns `None` if the path doesn't exist or the value cannot be
    /// converted to the requested type.
    pub fn get<T: FromSettingsValue>(&self, path: &str) -> Option<T> {
        let data = self.data.read();
        let parts = Self::parse_path(path);
        let value = Self::get_nested(&data, &parts)?;
        T::from_settings_value(value)
    }

    /// Gets a value at the specified path, or returns the default.
    pub fn get_or<T: FromSettingsValue>(&self, path: &str, default: T) -> T {
        self.get(path).unwrap_or(default)
    }

    /// Gets the raw `SettingsValue` at the specified path.
    pub fn get_raw(&self, path: &str) -> Option<SettingsValue> {
        let data = self.data.read();
        let parts = Self::parse_path(path);
        Self::get_nested(&data, &parts).cloned()
    }

    /// Returns true if the value at `path` exists and is truthy, see
    /// [`SettingsValue::is_truthy`].
    pub fn is_truthy(&self, path: &str) -> bool {
        let data = self.data.read();
        let parts = Self::parse_path(path);
        Self::get_nested(&data, &parts).is_some_and(SettingsValue::is_truthy)
    }

    /// Returns true if a value exists at the specified path.
    pub fn contains(&self, path: &str) -> bool {
        let data = self.data.read();
        let parts = Self::parse_path(path);
        Self::get_nested(&data, &parts).is_some()
    }

    /// Returns the keys under a specific path, in declaration order.
    pub fn group_keys(&self, path: &str) -> Vec<String> {
        let data = self.data.read();
        let parts = Self::parse_path(path);

        match Self::get_nested(&data, &parts) {
            Some(SettingsValue::Object(obj)) => obj.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Returns true if there are no settings.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn parse_path(path: &str) -> Vec<&str> {
        path.split('.').filter(|s| !s.is_empty()).collect()
    }

    fn get_nested<'a>(data: &'a SettingsMap, parts: &[&str]) -> Option<&'a SettingsValue> {
        let (first, rest) = parts.split_first()?;
        let value = data.get(*first)?;

        if rest.is_empty() {
            Some(value)
        } else {
            match value {
                SettingsValue::Object(obj) => Self::get_nested(obj, rest),
                _ => None,
            }
        }
    }

    fn set_nested(data: &mut SettingsMap, parts: &[&str], value: SettingsValue) {
        let Some((first, rest)) = parts.split_first() else {
            return;
        };

        if rest.is_empty() {
            data.insert(first.to_string(), value);
            return;
        }

        let entry = data
            .entry(first.to_string())
            .or_insert_with(|| SettingsValue::Object(SettingsMap::new()));

        if let SettingsValue::Object(obj) = entry {
            Self::set_nested(obj, rest, value);
        } else {
            let mut new_obj = SettingsMap::new();
            Self::set_nested(&mut new_obj, rest, value);
            *entry = SettingsValue::Object(new_obj);
        }
    }
}

/// Page size used when `pager.perPage` is missing or invalid.
pub const DEFAULT_PER_PAGE: usize = 10;

/// Typed view of the `pager` settings group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagerSettings {
    /// `pager.display`: whether the grid pages its rows.
    pub display: bool,
    /// `pager.perPage`: rows per page.
    pub per_page: usize,
}

impl PagerSettings {
    /// Reads the pager group. Only a literal `true` enables paging.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            display: settings.get_or("pager.display", false),
            per_page: settings.get_or("pager.perPage", DEFAULT_PER_PAGE),
        }
    }
}

impl Default for PagerSettings {
    fn default() -> Self {
        Self {
            display: false,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Trait for types that can be extracted from a SettingsValue.
pub trait FromSettingsValue: Sized {
    /// Attempts to convert a SettingsValue to this type.
    fn from_settings_value(value: &SettingsValue) -> Option<Self>;
}

impl FromSettingsValue for bool {
    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromSettingsValue for i32 {
    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        value.as_integer().and_then(|v| i32::try_from(v).ok())
    }
}

impl FromSettingsValue for i64 {
    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        value.as_integer()
    }
}

impl FromSettingsValue for usize {
    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        value.as_integer().and_then(|v| usize::try_from(v).ok())
    }
}

impl FromSettingsValue for f64 {
    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        value.as_float()
    }
}

impl FromSettingsValue for String {
    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        value.as_str().map(|s| s.to_string())
    }
}

impl<T: FromSettingsValue> FromSettingsValue for Vec<T> {
    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        value
            .as_array()
            .and_then(|arr| arr.iter().map(T::from_settings_value).collect())
    }
}

impl FromSettingsValue for SettingsValue {
    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        Some(value.clone())
    }
}
