//! JSON merge patch (RFC 7396)

use serde_json::{Map, Value};

/// Apply `patch` onto `target` in place
///
/// Object keys overwrite recursively, `null` deletes a key, and any
/// non-object patch replaces the target wholesale.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                let entry = target_map.entry(key.clone()).or_insert(Value::Null);
                merge_patch(entry, value);
            }
        }
    }
}

/// Returns true if the object patch mentions any of `fields`
pub fn touches(patch: &Value, fields: &[&str]) -> bool {
    patch
        .as_object()
        .map(|map| fields.iter().any(|field| map.contains_key(*field)))
        .unwrap_or(false)
}
