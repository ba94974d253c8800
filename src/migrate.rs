//! Shared helpers for versioned state upgrades.
//!
//! Each resource owns its migration logic (see `upgrade_state` on the
//! handlers); the transformations here are the reusable pieces. All of
//! them are deterministic and act only on the fields they name, so a
//! state already in the new shape passes through unchanged.

use serde_json::Value;

/// Rename a state attribute, leaving the value untouched. No-op when the
/// old key is absent or the new key already exists.
pub fn rename_attribute(state: &mut Value, old: &str, new: &str) {
    let Some(obj) = state.as_object_mut() else {
        return;
    };
    if obj.contains_key(new) {
        return;
    }
    if let Some(value) = obj.remove(old) {
        obj.insert(new.to_string(), value);
    }
}

/// Convert a comma-joined string attribute into a list of strings.
/// Already-list values are left alone.
pub fn comma_string_to_list(state: &mut Value, key: &str) {
    let Some(obj) = state.as_object_mut() else {
        return;
    };
    let Some(Value::String(joined)) = obj.get(key) else {
        return;
    };
    let items: Vec<Value> = joined
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Value::String(s.to_string()))
        .collect();
    obj.insert(key.to_string(), Value::Array(items));
}

/// Re-case a string attribute with the given fold.
pub fn fold_attribute(state: &mut Value, key: &str, fold: fn(&str) -> String) {
    let Some(obj) = state.as_object_mut() else {
        return;
    };
    if let Some(Value::String(value)) = obj.get(key) {
        let folded = fold(value);
        obj.insert(key.to_string(), Value::String(folded));
    }
}

/// Split a legacy combined storage `account_type` ("Standard_LRS") into
/// `account_tier` and `account_replication_type`. The legacy key is
/// removed; states without it are untouched.
pub fn split_account_type(state: &mut Value) {
    let Some(obj) = state.as_object_mut() else {
        return;
    };
    let Some(Value::String(account_type)) = obj.remove("account_type") else {
        return;
    };
    if let Some((tier, replication)) = account_type.split_once('_') {
        if !obj.contains_key("account_tier") {
            obj.insert("account_tier".to_string(), Value::String(tier.to_string()));
        }
        if !obj.contains_key("account_replication_type") {
            obj.insert(
                "account_replication_type".to_string(),
                Value::String(replication.to_string()),
            );
        }
    }
}

/// Capitalize the first character, lowercasing the rest ("STATIC" ->
/// "Static"). The canonical casing for ARM enum values like allocation
/// methods.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
