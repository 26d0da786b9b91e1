//! Typed reads from the merged view

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Outcome of a typed lookup.
///
/// Keeps "found and converted" apart from "fell back", which a plain
/// `get` with a fallback cannot show.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Value present and converted to `T`
    Found(T),
    /// Nothing stored at the path
    Missing,
    /// Something stored at the path, but it does not convert to `T`
    Mismatch(Value),
}

impl<T> Lookup<T> {
    /// The converted value, or `fallback`.
    pub fn or(self, fallback: T) -> T {
        match self {
            Lookup::Found(value) => value,
            Lookup::Missing | Lookup::Mismatch(_) => fallback,
        }
    }
}

/// Convert a stored value to `T`.
///
/// Uses serde, with one widening: an integral float such as `42.0` also
/// converts to integer targets.
pub fn coerce<T: DeserializeOwned>(value: &Value) -> Option<T> {
    if let Ok(converted) = serde_json::from_value(value.clone()) {
        return Some(converted);
    }

    let f = value.as_f64().filter(|f| f.fract() == 0.0)?;
    let integral = if f >= 0.0 && f <= u64::MAX as f64 {
        Value::from(f as u64)
    } else if f >= i64::MIN as f64 && f < 0.0 {
        Value::from(f as i64)
    } else {
        return None;
    };
    if integral == *value {
        return None;
    }
    serde_json::from_value(integral).ok()
}

/// Look up and convert the value at `path` in `root`.
pub fn lookup<T: DeserializeOwned>(root: &Value, path: &str) -> Lookup<T> {
    match super::path::get_path(root, path) {
        None => Lookup::Missing,
        Some(value) => match coerce(value) {
            Some(converted) => Lookup::Found(converted),
            None => Lookup::Mismatch(value.clone()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_found() {
        let root = json!({"player": {"hp": 10, "name": "Rin", "alive": true}});
        assert_eq!(lookup::<i64>(&root, "player.hp"), Lookup::Found(10));
        assert_eq!(lookup::<String>(&root, "player.name"), Lookup::Found("Rin".to_string()));
        assert_eq!(lookup::<bool>(&root, "player.alive"), Lookup::Found(true));
    }

    #[test]
    fn test_missing() {
        let root = json!({});
        assert_eq!(lookup::<i32>(&root, "missing.path"), Lookup::Missing);
        assert_eq!(lookup::<i32>(&root, "missing.path").or(7), 7);
    }

    #[test]
    fn test_mismatch_falls_back() {
        let root = json!({"name": "Rin"});
        let result = lookup::<f64>(&root, "name");
        assert_eq!(result, Lookup::Mismatch(json!("Rin")));
        assert_eq!(result.or(1.5), 1.5);
    }

    #[test]
    fn test_integral_float_widens_to_int() {
        let root = json!({"count": 42.0, "ratio": 0.5, "neg": -3.0});
        assert_eq!(lookup::<i32>(&root, "count"), Lookup::Found(42));
        assert_eq!(lookup::<u8>(&root, "count"), Lookup::Found(42));
        assert_eq!(lookup::<i64>(&root, "neg"), Lookup::Found(-3));
        assert!(matches!(lookup::<i32>(&root, "ratio"), Lookup::Mismatch(_)));
    }

    #[test]
    fn test_int_reads_as_float() {
        let root = json!({"speed": 3});
        assert_eq!(lookup::<f64>(&root, "speed"), Lookup::Found(3.0));
    }

    #[test]
    fn test_out_of_range_is_mismatch() {
        let root = json!({"big": 300});
        assert!(matches!(lookup::<u8>(&root, "big"), Lookup::Mismatch(_)));
    }

    #[test]
    fn test_structured_targets() {
        let root = json!({"spawn": [1, 2, 3], "tags": {"a": "x"}});
        assert_eq!(lookup::<Vec<i32>>(&root, "spawn"), Lookup::Found(vec![1, 2, 3]));
        let tags: HashMap<String, String> = lookup(&root, "tags").or(HashMap::new());
        assert_eq!(tags.get("a").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_invalid_path_is_missing() {
        let root = json!({"a": 1});
        assert_eq!(lookup::<i32>(&root, "a..b"), Lookup::Missing);
    }
}
