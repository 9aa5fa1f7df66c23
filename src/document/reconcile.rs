//! Merge + quarantine
//!
//! Both functions are pure: the same (schema, current) pair always yields the
//! same document.

use super::value::{ConfigValue, Map};

/// Reserved top-level key holding the applied version
pub const VERSION_KEY: &str = "version";

/// Deep-merge `current` over `schema`
///
/// Keys only in `schema` keep their default, keys in `current` keep the
/// operator's value. Two mappings under the same key are merged recursively;
/// any other combination takes `current`'s value.
pub fn merge(schema: &Map, current: &Map) -> Map {
    let mut merged = schema.clone();

    for (key, value) in current {
        let overlay = match (merged.get(key), value) {
            (Some(ConfigValue::Object(defaults)), ConfigValue::Object(live)) => {
                ConfigValue::Object(merge(defaults, live))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), overlay);
    }

    merged
}

/// Mark every key of `merged` that `schema` does not declare
///
/// An undeclared key `k` becomes `{marker}k` and its whole subtree is marked
/// the same way. Keys that already carry the marker are left alone, so
/// repeated migrations never stack markers.
pub fn quarantine(merged: Map, schema: &Map, marker: char) -> Map {
    let mut out = Map::new();

    for (key, value) in merged {
        if let Some(declared) = schema.get(&key) {
            let value = match (value, declared) {
                (ConfigValue::Object(live), ConfigValue::Object(nested)) => {
                    ConfigValue::Object(quarantine(live, nested, marker))
                }
                (value, _) => value,
            };
            out.insert(key, value);
        } else if key.starts_with(marker) {
            // A fresh quarantine of the same key takes precedence
            if out.contains_key(&key) {
                tracing::warn!(key = %key, "quarantined key collides with a newly quarantined value");
            } else {
                out.insert(key, value);
            }
        } else {
            let marked = format!("{}{}", marker, key);
            let value = quarantine_subtree(value, marker);
            if out.insert(marked.clone(), value).is_some() {
                tracing::warn!(key = %marked, "quarantined key collides with a newly quarantined value");
            }
        }
    }

    out
}

fn quarantine_subtree(value: ConfigValue, marker: char) -> ConfigValue {
    match value {
        ConfigValue::Object(map) => ConfigValue::Object(quarantine(map, &Map::new(), marker)),
        other => other,
    }
}

/// Fold a schema patch into the current document
///
/// Returns the reconciled document without its `version` key; the store
/// writes the header itself.
pub fn reconcile(schema: &Map, current: &Map, marker: char) -> Map {
    let mut schema = schema.clone();
    schema.remove(VERSION_KEY);

    let mut merged = merge(&schema, current);
    merged.remove(VERSION_KEY);

    quarantine(merged, &schema, marker)
}
