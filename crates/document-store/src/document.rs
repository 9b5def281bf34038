//! Document representation and dotted-path helpers.

use std::cmp::Ordering;

use serde_json::Value;
use uuid::Uuid;

use crate::{DocumentStoreError, Result};

/// A stored document: a JSON object carrying an `_id` field.
pub type Document = Value;

/// Name of the primary key field of every document.
pub const ID_FIELD: &str = "_id";

/// Returns the `_id` of a document, if present.
pub fn document_id(document: &Document) -> Option<&Value> {
    document.get(ID_FIELD)
}

/// Ensures the document carries an `_id`, generating a UUID string if absent.
///
/// Returns the document's `_id`.
pub fn assign_id(document: &mut Document) -> Result<Value> {
    let Value::Object(map) = document else {
        return Err(DocumentStoreError::NotAnObject(document.to_string()));
    };
    let id = map
        .entry(ID_FIELD)
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    Ok(id.clone())
}

/// Canonical string form of an `_id`, used as the storage key.
///
/// Uses the compact JSON text so that `1` and `"1"` remain distinct keys.
pub fn id_key(id: &Value) -> String {
    id.to_string()
}

/// Collects every value reachable through a dotted path.
///
/// Arrays are traversed transparently: a segment applied to an array is
/// applied to each object element, unless the segment is a numeric index.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    collect(value, &segments, &mut out);
    out
}

fn collect<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };

    match value {
        Value::Object(map) => {
            if let Some(child) = map.get(*head) {
                collect(child, rest, out);
            }
        }
        Value::Array(items) => {
            if let Ok(index) = head.parse::<usize>() {
                if let Some(child) = items.get(index) {
                    collect(child, rest, out);
                }
            } else {
                for item in items.iter().filter(|item| item.is_object()) {
                    collect(item, segments, out);
                }
            }
        }
        _ => {}
    }
}

/// Looks up a single value without fanning out over arrays.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Equality with numeric normalisation (`2` equals `2.0`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Orders two values of the same kind. Mixed kinds are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_path_traverses_arrays_of_objects() {
        let doc = json!({
            "products": [
                {"_id": "a", "quantity": 1},
                {"_id": "b", "quantity": 2}
            ]
        });
        let ids = resolve_path(&doc, "products._id");
        assert_eq!(ids, vec![&json!("a"), &json!("b")]);
    }

    #[test]
    fn resolve_path_honours_numeric_index() {
        let doc = json!({"products": [{"_id": "a"}, {"_id": "b"}]});
        assert_eq!(resolve_path(&doc, "products.1._id"), vec![&json!("b")]);
        assert_eq!(get_path(&doc, "products.0._id"), Some(&json!("a")));
    }

    #[test]
    fn missing_path_resolves_to_nothing() {
        let doc = json!({"quantity": 3});
        assert!(resolve_path(&doc, "reservations._id").is_empty());
        assert!(get_path(&doc, "quantity.inner").is_none());
    }

    #[test]
    fn numbers_compare_across_representations() {
        assert!(values_equal(&json!(2), &json!(2.0)));
        assert_eq!(compare_values(&json!(3), &json!(2.5)), Some(Ordering::Greater));
        assert_eq!(compare_values(&json!("a"), &json!(1)), None);
    }

    #[test]
    fn assign_id_keeps_existing_and_fills_missing() {
        let mut with_id = json!({"_id": "P1"});
        assert_eq!(assign_id(&mut with_id).unwrap(), json!("P1"));

        let mut without_id = json!({"quantity": 1});
        let generated = assign_id(&mut without_id).unwrap();
        assert!(generated.is_string());
        assert_eq!(without_id["_id"], generated);

        assert!(assign_id(&mut json!([1, 2])).is_err());
    }

    #[test]
    fn id_key_distinguishes_numbers_from_strings() {
        assert_eq!(id_key(&json!("1")), "\"1\"");
        assert_eq!(id_key(&json!(1)), "1");
    }
}
