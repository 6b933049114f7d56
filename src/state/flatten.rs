use serde_json::{Map, Value};

use crate::identity::AttributeSet;

/// Flatten nested state attributes into the scanner's dotted-path form.
///
/// `{"tags": {"Name": "web"}, "ports": [80, 443]}` becomes
/// `tags.Name = web`, `ports.0 = 80`, `ports.1 = 443`. Nulls and empty
/// collections produce no entries.
pub fn flatten_attributes(attributes: &Map<String, Value>) -> AttributeSet {
    let mut output = AttributeSet::new();

    for (key, value) in attributes {
        flatten_value(&mut output, key.clone(), value);
    }

    output
}

fn flatten_value(output: &mut AttributeSet, path: String, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            output.insert(path, b.to_string());
        }
        Value::Number(n) => {
            output.insert(path, n.to_string());
        }
        Value::String(s) => {
            output.insert(path, s.clone());
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_value(output, format!("{}.{}", path, i), item);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten_value(output, format!("{}.{}", path, key), item);
            }
        }
    }
}

/// Whether a flattened key is a collection-size marker (`tags.%`, `ports.#`)
pub fn is_count_key(key: &str) -> bool {
    matches!(key.rsplit('.').next(), Some("#") | Some("%"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_values() {
        let value = json!({
            "id": "i-123",
            "count": 3,
            "enabled": true,
            "removed": null,
            "tags": {"Name": "web", "Env": "prod"},
            "ports": [80, 443],
            "rules": [{"cidr": "10.0.0.0/8"}],
            "empty": []
        });

        let flat = flatten_attributes(value.as_object().unwrap());

        assert_eq!(flat.get("id").map(String::as_str), Some("i-123"));
        assert_eq!(flat.get("count").map(String::as_str), Some("3"));
        assert_eq!(flat.get("enabled").map(String::as_str), Some("true"));
        assert_eq!(flat.get("tags.Name").map(String::as_str), Some("web"));
        assert_eq!(flat.get("ports.1").map(String::as_str), Some("443"));
        assert_eq!(flat.get("rules.0.cidr").map(String::as_str), Some("10.0.0.0/8"));
        assert!(!flat.contains_key("removed"));
        assert!(!flat.keys().any(|k| k.starts_with("empty")));
        assert_eq!(flat.len(), 8);
    }

    #[test]
    fn test_is_count_key() {
        assert!(is_count_key("tags.%"));
        assert!(is_count_key("ingress.#"));
        assert!(is_count_key("#"));
        assert!(!is_count_key("tags.Name"));
        assert!(!is_count_key("name"));
    }
}
