//! Lenient accessors over loosely-structured persona documents.
//!
//! Character documents are author-edited and frequently incomplete, so every
//! lookup here treats a missing or wrongly-typed node as absent instead of
//! failing.

use serde_json::{Map, Value};

static NULL: Value = Value::Null;

/// Child object at `key`, if `value` is an object and the child is too.
pub(crate) fn obj<'a>(value: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    value.get(key).and_then(Value::as_object)
}

/// Child object at `key` as a `Value`, or `Null`.
pub(crate) fn node<'a>(value: &'a Value, key: &str) -> &'a Value {
    match value.get(key) {
        Some(child @ Value::Object(_)) => child,
        _ => &NULL,
    }
}

/// Child array at `key`, or an empty slice.
pub(crate) fn list<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

/// Scalar rendered as trimmed text; `Null` and missing become empty.
pub(crate) fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

/// Trimmed text at `key`.
pub(crate) fn text_at(value: &Value, key: &str) -> String {
    text(value.get(key))
}

/// Whether a disclosure flag permits use. Only an explicit `false` denies.
pub(crate) fn allowed(policy: &Value, key: &str) -> bool {
    !matches!(policy.get(key), Some(Value::Bool(false)))
}

/// Reveal level of a policy node, `normal` when unset.
pub(crate) fn reveal_level(policy: &Value) -> String {
    let level = text_at(policy, "reveal_level");
    if level.is_empty() { "normal".to_string() } else { level }
}

/// Whether a value is "truthy" the way a persona author would expect:
/// non-empty strings, non-zero numbers, `true`, non-empty containers.
pub(crate) fn present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// Every element of `items` rendered as text.
pub(crate) fn texts(items: &[Value]) -> Vec<String> {
    items.iter().map(|v| text(Some(v))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accessors_tolerate_wrong_shapes() {
        let v = json!({"a": [1, 2], "b": "x", "c": {"d": 1}});
        assert_eq!(list(&v, "a").len(), 2);
        assert!(list(&v, "b").is_empty());
        assert!(obj(&v, "a").is_none());
        assert!(obj(&v, "c").is_some());
        assert!(node(&v, "b").is_null());
        assert!(list(&json!(3), "a").is_empty());
    }

    #[test]
    fn text_renders_scalars() {
        assert_eq!(text(Some(&json!("  hi "))), "hi");
        assert_eq!(text(Some(&json!(19))), "19");
        assert_eq!(text(Some(&json!(null))), "");
        assert_eq!(text(None), "");
    }

    #[test]
    fn only_explicit_false_denies() {
        assert!(allowed(&json!({}), "can_talk"));
        assert!(allowed(&json!({"can_talk": "no"}), "can_talk"));
        assert!(!allowed(&json!({"can_talk": false}), "can_talk"));
        assert!(allowed(&Value::Null, "allow"));
    }

    #[test]
    fn reveal_level_defaults_to_normal() {
        assert_eq!(reveal_level(&json!({})), "normal");
        assert_eq!(reveal_level(&json!({"reveal_level": "low"})), "low");
    }
}
