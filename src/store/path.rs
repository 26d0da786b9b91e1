//! Dot-path addressing into object trees

use serde_json::{Map, Value};

/// Split a dot-path into its segments.
///
/// Returns `None` for an empty path or one with an empty segment
/// (`"a..b"`, `".a"`, `"a."`).
pub fn segments(path: &str) -> Option<Vec<&str>> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(parts)
}

/// Walk nested objects along `path`.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for part in segments(path)? {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Write `value` at `parts`, creating objects along the way.
///
/// Any non-object found on an intermediate segment (including the root) is
/// replaced by an empty object.
pub fn set_path(root: &mut Value, parts: &[&str], value: Value) {
    let Some((last, parents)) = parts.split_last() else {
        return;
    };

    let mut current = ensure_object(root);
    for part in parents {
        let slot = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = ensure_object(slot);
    }
    current.insert(last.to_string(), value);
}

/// Remove the value at `parts`, returning it if it existed.
pub fn remove_path(root: &mut Value, parts: &[&str]) -> Option<Value> {
    let (last, parents) = parts.split_last()?;
    let mut current = root;
    for part in parents {
        current = current.as_object_mut()?.get_mut(*part)?;
    }
    current.as_object_mut()?.remove(*last)
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_segments() {
        assert_eq!(segments("a.b.c"), Some(vec!["a", "b", "c"]));
        assert_eq!(segments("single"), Some(vec!["single"]));
        assert_eq!(segments(""), None);
        assert_eq!(segments("a..b"), None);
        assert_eq!(segments(".a"), None);
        assert_eq!(segments("a."), None);
    }

    #[test]
    fn test_get_path() {
        let root = json!({"a": {"b": {"c": 42}}, "list": [1, 2]});
        assert_eq!(get_path(&root, "a.b.c"), Some(&json!(42)));
        assert_eq!(get_path(&root, "a.b"), Some(&json!({"c": 42})));
        assert_eq!(get_path(&root, "a.x"), None);
        assert_eq!(get_path(&root, "list.0"), None);
        assert_eq!(get_path(&root, "a.b.c.d"), None);
    }

    #[test]
    fn test_set_path_creates_objects() {
        let mut root = json!({});
        set_path(&mut root, &["a", "b", "c"], json!(42));
        assert_eq!(root, json!({"a": {"b": {"c": 42}}}));
    }

    #[test]
    fn test_set_path_replaces_scalar_on_the_way() {
        let mut root = json!({"a": 5, "keep": true});
        set_path(&mut root, &["a", "b"], json!("x"));
        assert_eq!(root, json!({"a": {"b": "x"}, "keep": true}));
    }

    #[test]
    fn test_set_path_preserves_siblings() {
        let mut root = json!({"a": {"x": 1}});
        set_path(&mut root, &["a", "y"], json!(2));
        assert_eq!(root, json!({"a": {"x": 1, "y": 2}}));
    }

    #[test]
    fn test_set_path_on_non_object_root() {
        let mut root = json!([1, 2]);
        set_path(&mut root, &["k"], json!(true));
        assert_eq!(root, json!({"k": true}));
    }

    #[test]
    fn test_remove_path() {
        let mut root = json!({"a": {"b": 1, "c": 2}});
        assert_eq!(remove_path(&mut root, &["a", "b"]), Some(json!(1)));
        assert_eq!(root, json!({"a": {"c": 2}}));
        assert_eq!(remove_path(&mut root, &["a", "missing"]), None);
        assert_eq!(remove_path(&mut root, &["x", "y"]), None);
    }
}
