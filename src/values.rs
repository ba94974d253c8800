//! Helpers for reading generic configuration values and building state.
//!
//! Expand adapters read from the host's JSON configuration through these
//! accessors instead of indexing blindly; absent optional fields come back
//! as `None` or empty collections, and only genuinely required fields can
//! fail. Flatten adapters build state through [`StateMap`], which skips
//! `None` values so an API field the service left unset is simply omitted.

use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Fetch a required string attribute.
pub fn req_str<'a>(config: &'a Value, key: &str) -> Result<&'a str, ProviderError> {
    opt_str(config, key)
        .ok_or_else(|| ProviderError::Validation(format!("missing required attribute {:?}", key)))
}

/// Fetch an optional string attribute. Absent and null are both `None`.
pub fn opt_str<'a>(config: &'a Value, key: &str) -> Option<&'a str> {
    config.get(key).and_then(Value::as_str)
}

/// Fetch an optional integer attribute.
pub fn opt_i64(config: &Value, key: &str) -> Option<i64> {
    config.get(key).and_then(Value::as_i64)
}

/// Fetch an optional boolean attribute.
pub fn opt_bool(config: &Value, key: &str) -> Option<bool> {
    config.get(key).and_then(Value::as_bool)
}

/// Fetch a list of strings; absent or null yields an empty list.
pub fn str_list(config: &Value, key: &str) -> Vec<String> {
    config
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Fetch a string-to-string map (e.g. tags); absent yields `None`.
///
/// Non-string values are skipped; schema validation has already rejected
/// them with a proper diagnostic.
pub fn str_map(config: &Value, key: &str) -> Option<Map<String, Value>> {
    let obj = config.get(key)?.as_object()?;
    let filtered: Map<String, Value> = obj
        .iter()
        .filter(|(_, v)| v.is_string())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Some(filtered)
}

/// Fetch the items of a list/set block; absent or null yields empty.
pub fn block_list<'a>(config: &'a Value, key: &str) -> Vec<&'a Value> {
    config
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

/// Fetch a block that must appear exactly once.
///
/// Accepts either a single-nested object or a one-element list, and
/// reports the cardinality in the error otherwise.
pub fn single_block<'a>(config: &'a Value, key: &str) -> Result<&'a Value, ProviderError> {
    match config.get(key) {
        Some(block @ Value::Object(_)) => Ok(block),
        Some(Value::Array(items)) if items.len() == 1 => Ok(&items[0]),
        Some(Value::Array(items)) => Err(ProviderError::Validation(format!(
            "expected exactly one {:?} block, got {}",
            key,
            items.len()
        ))),
        _ => Err(ProviderError::Validation(format!(
            "expected exactly one {:?} block, got 0",
            key
        ))),
    }
}

/// Builder for flattened state objects.
///
/// `set_opt` skips `None`, which is how every nullable API field is
/// handled: unset on the service side means absent in state.
#[derive(Debug, Default)]
pub struct StateMap {
    map: Map<String, Value>,
}

impl StateMap {
    /// Start an empty state object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute unconditionally.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.map.insert(key.into(), value.into());
        self
    }

    /// Set an attribute when the value is present; skip it otherwise.
    pub fn set_opt<T: Into<Value>>(mut self, key: impl Into<String>, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.map.insert(key.into(), value.into());
        }
        self
    }

    /// Set a list attribute when non-empty.
    pub fn set_list(mut self, key: impl Into<String>, values: Vec<Value>) -> Self {
        if !values.is_empty() {
            self.map.insert(key.into(), Value::Array(values));
        }
        self
    }

    /// Merge an already-built JSON value (e.g. tags) when present.
    pub fn set_value(mut self, key: impl Into<String>, value: Option<Value>) -> Self {
        if let Some(value) = value {
            self.map.insert(key.into(), value);
        }
        self
    }

    /// Finish into a JSON object.
    pub fn finish(self) -> Value {
        Value::Object(self.map)
    }
}

/// Convert a list of strings into a JSON array value.
pub fn string_array<I, S>(items: I) -> Vec<Value>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items
        .into_iter()
        .map(|s| Value::String(s.into()))
        .collect()
}
