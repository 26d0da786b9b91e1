//! Layer merge logic
//!
//! Merges the user layer over the defaults layer with:
//! - Objects: deep-merge by key
//! - Arrays: REPLACE (override wins entirely)
//! - Scalars: override (override wins)
//! - Null: no opinion (base value is kept, null is never written)

use serde_json::{Map, Value};

/// Deep merge two JSON values.
///
/// Merge semantics:
/// - Objects: union of keys, recursing where both sides are objects
/// - Arrays: REPLACE (no element-wise merge)
/// - Scalars: override wins
/// - Null override: ignored, base value kept
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        // Both objects: deep merge
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                if overlay_value.is_null() {
                    continue;
                }
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => deep_merge(Value::Null, overlay_value),
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }

        // Null: no opinion
        (base, Value::Null) => base,

        // Object over a non-object: merged into an empty object so nested nulls are dropped
        (_, overlay @ Value::Object(_)) => deep_merge(Value::Object(Map::new()), overlay),

        // Arrays, scalars and mismatched shapes: overlay wins
        (_, overlay) => overlay,
    }
}
