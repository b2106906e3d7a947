//! Uniform access to JSON object-like and array-like values.

use serde_json::{Map, Value};

/// Looks up a key on an object-like value. Returns `None` for non-objects.
pub fn field<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    value.as_object().and_then(|object| object.get(key))
}

/// The entries of an object-like value. A JSON list never counts as a map,
/// even when its indices look like keys.
pub fn entries(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object()
}

/// The items of an array-like value. A JSON object never counts as a list.
pub fn items(value: &Value) -> Option<&Vec<Value>> {
    value.as_array()
}

/// The boolean coercion used when a plain expression stands where a
/// predicate is expected.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(entries) => !entries.is_empty(),
    }
}

/// Compact JSON rendering for error messages.
pub fn display(value: &Value) -> String {
    value.to_string()
}

/// The plain-text form of a value, used when substituting variables into
/// regex patterns. Strings render without quotes.
pub fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_map_discrimination() {
        assert!(items(&json!([1, 2])).is_some());
        assert!(items(&json!({"0": 1})).is_none());
        assert!(entries(&json!({"a": 1})).is_some());
        assert!(entries(&json!([1])).is_none());
    }

    #[test]
    fn field_lookup() {
        let value = json!({"a": {"b": 2}});
        assert_eq!(field(&value, "a"), Some(&json!({"b": 2})));
        assert_eq!(field(&value, "missing"), None);
        assert_eq!(field(&json!([1]), "0"), None);
    }

    #[test]
    fn truthiness() {
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(0.0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!([])));
        assert!(!truthy(&json!({})));
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!("x")));
        assert!(truthy(&json!([0])));
    }

    #[test]
    fn text_renders_strings_bare() {
        assert_eq!(text(&json!("abc")), "abc");
        assert_eq!(text(&json!(3)), "3");
        assert_eq!(text(&json!(null)), "null");
    }
}
