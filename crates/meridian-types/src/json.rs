//! Canonical JSON
//!
//! Signable payloads are JSON objects whose keys are sorted lexicographically
//! at every depth, with no insignificant whitespace. Two values with the same
//! content always encode to the same bytes, whatever order their fields were
//! inserted in.

use serde::Serialize;
use serde_json::{Map, Value};

/// Rebuild a value with every object's keys in sorted order
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Canonical bytes of a JSON value
pub fn sorted_bytes(value: &Value) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&canonicalize(value))
}

/// Canonical bytes of any serializable value
pub fn to_sorted_vec<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    sorted_bytes(&serde_json::to_value(value)?)
}

/// Re-sort already encoded JSON
pub fn sort_json(bytes: &[u8]) -> Result<Vec<u8>, serde_json::Error> {
    let value: Value = serde_json::from_slice(bytes)?;
    sorted_bytes(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_keys_sorted_at_every_depth() {
        let value = json!({
            "z": 1,
            "a": {"y": [ {"c": 1, "b": 2} ], "x": null},
        });
        let bytes = sorted_bytes(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":{"x":null,"y":[{"b":2,"c":1}]},"z":1}"#
        );
    }

    #[test]
    fn test_sort_json_bytes() {
        let sorted = sort_json(br#"{ "b" : "2", "a" : "1" }"#).unwrap();
        assert_eq!(sorted, br#"{"a":"1","b":"2"}"#);
        assert!(sort_json(b"not json").is_err());
    }

    #[test]
    fn test_array_order_preserved() {
        let bytes = sorted_bytes(&json!(["b", "a"])).unwrap();
        assert_eq!(bytes, br#"["b","a"]"#);
    }

    proptest! {
        #[test]
        fn prop_insertion_order_irrelevant(
            entries in proptest::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..16)
        ) {
            let mut forward = Map::new();
            for (k, v) in entries.iter() {
                forward.insert(k.clone(), json!({"v": v, "k": k}));
            }
            let mut backward = Map::new();
            for (k, v) in entries.iter().rev() {
                backward.insert(k.clone(), json!({"k": k, "v": v}));
            }

            let a = sorted_bytes(&Value::Object(forward)).unwrap();
            let b = sorted_bytes(&Value::Object(backward)).unwrap();
            prop_assert_eq!(&a, &b);

            // sorting is idempotent
            prop_assert_eq!(sort_json(&a).unwrap(), a);
        }
    }
}
