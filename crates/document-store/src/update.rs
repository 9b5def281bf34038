use serde_json::{Map, Number, Value};

use crate::filter::Filter;
use crate::{DocumentStoreError, Result};

/// Path segment referring to the array element selected by the filter.
pub const POSITIONAL: &str = "$";

/// A single mutation of a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Replaces the value at the path, creating intermediate objects.
    Set { path: String, value: Value },
    /// Adds to the integer at the path (a missing field counts as zero).
    Inc { path: String, by: i64 },
    /// Appends to the array at the path, creating it if missing.
    Push { path: String, value: Value },
    /// Removes every element of the array at the path matching the filter.
    Pull { path: String, filter: Filter },
}

impl Operation {
    fn path(&self) -> &str {
        match self {
            Operation::Set { path, .. }
            | Operation::Inc { path, .. }
            | Operation::Push { path, .. }
            | Operation::Pull { path, .. } => path,
        }
    }
}

/// Builder for document mutations.
///
/// Operations are applied in order to a working copy of the matched
/// document; the stored document is only replaced once every operation has
/// succeeded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    operations: Vec<Operation>,
}

impl Update {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field.
    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operations.push(Operation::Set {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    /// Increments a numeric field.
    pub fn inc(mut self, path: impl Into<String>, by: i64) -> Self {
        self.operations.push(Operation::Inc {
            path: path.into(),
            by,
        });
        self
    }

    /// Pushes an element onto an array field.
    pub fn push(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operations.push(Operation::Push {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    /// Pulls matching elements out of an array field.
    pub fn pull(mut self, path: impl Into<String>, filter: Filter) -> Self {
        self.operations.push(Operation::Pull {
            path: path.into(),
            filter,
        });
        self
    }

    /// Returns the operations in application order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Returns true if the update has no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Applies the update to a document matched by `filter`.
    ///
    /// Positional paths are resolved against the document as matched, before
    /// any operation runs. Returns whether the document changed. On error the
    /// document is left untouched.
    pub fn apply(&self, document: &mut Value, filter: &Filter) -> Result<bool> {
        let resolved: Vec<String> = self
            .operations
            .iter()
            .map(|op| resolve_positional(op.path(), document, filter))
            .collect::<Result<_>>()?;

        let mut working = document.clone();
        for (operation, path) in self.operations.iter().zip(&resolved) {
            apply_operation(&mut working, operation, path)?;
        }

        let changed = working != *document;
        *document = working;
        Ok(changed)
    }
}

fn resolve_positional(path: &str, document: &Value, filter: &Filter) -> Result<String> {
    let mut segments: Vec<String> = path.split('.').map(str::to_string).collect();
    let Some(at) = segments.iter().position(|s| s == POSITIONAL) else {
        return Ok(path.to_string());
    };

    let array_path = segments[..at].join(".");
    let index = filter
        .positional_index(document, &array_path)
        .ok_or_else(|| DocumentStoreError::PositionalMismatch {
            path: path.to_string(),
        })?;
    segments[at] = index.to_string();
    Ok(segments.join("."))
}

fn apply_operation(document: &mut Value, operation: &Operation, path: &str) -> Result<()> {
    match operation {
        Operation::Set { value, .. } => {
            *slot_mut(document, path)? = value.clone();
        }
        Operation::Inc { by, .. } => {
            let slot = slot_mut(document, path)?;
            let next = match &*slot {
                Value::Null => Number::from(*by),
                Value::Number(n) => increment(n, *by).ok_or_else(|| invalid(path, "overflow"))?,
                _ => return Err(invalid(path, "cannot increment a non-numeric field")),
            };
            *slot = Value::Number(next);
        }
        Operation::Push { value, .. } => {
            let slot = slot_mut(document, path)?;
            if slot.is_null() {
                *slot = Value::Array(Vec::new());
            }
            match slot {
                Value::Array(items) => items.push(value.clone()),
                _ => return Err(invalid(path, "cannot push onto a non-array field")),
            }
        }
        Operation::Pull { filter, .. } => match existing_mut(document, path) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => items.retain(|item| !filter.matches(item)),
            Some(_) => return Err(invalid(path, "cannot pull from a non-array field")),
        },
    }
    Ok(())
}

fn increment(current: &Number, by: i64) -> Option<Number> {
    match current.as_i64() {
        Some(value) => value.checked_add(by).map(Number::from),
        None => Number::from_f64(current.as_f64()? + by as f64),
    }
}

fn invalid(path: &str, reason: &str) -> DocumentStoreError {
    DocumentStoreError::InvalidUpdate {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

fn slot_mut<'a>(document: &'a mut Value, path: &str) -> Result<&'a mut Value> {
    let mut current = document;
    for segment in path.split('.') {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
            Value::Array(items) => {
                let index = segment
                    .parse::<usize>()
                    .map_err(|_| invalid(path, "array segment must be an index"))?;
                items
                    .get_mut(index)
                    .ok_or_else(|| invalid(path, "array index out of bounds"))?
            }
            _ => return Err(invalid(path, "cannot traverse a scalar field")),
        };
    }
    Ok(current)
}

fn existing_mut<'a>(document: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.').try_fold(document, |current, segment| match current {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inventory() -> Value {
        json!({
            "_id": "P1",
            "quantity": 5,
            "reservations": [
                {"_id": "user-1", "quantity": 2},
                {"_id": "user-2", "quantity": 1}
            ]
        })
    }

    #[test]
    fn set_inc_and_push() {
        let mut doc = inventory();
        let update = Update::new()
            .inc("quantity", -2)
            .push("reservations", json!({"_id": "user-3", "quantity": 2}))
            .set("modifiedOn", 42);

        let changed = update.apply(&mut doc, &Filter::by_id("P1")).unwrap();

        assert!(changed);
        assert_eq!(doc["quantity"], json!(3));
        assert_eq!(doc["reservations"][2]["_id"], json!("user-3"));
        assert_eq!(doc["modifiedOn"], json!(42));
    }

    #[test]
    fn missing_fields_are_created() {
        let mut doc = json!({"_id": "cart"});
        Update::new()
            .push("products", json!({"_id": "P1"}))
            .inc("counter", 3)
            .set("shipping.name", "Ada")
            .apply(&mut doc, &Filter::new())
            .unwrap();

        assert_eq!(doc["products"], json!([{"_id": "P1"}]));
        assert_eq!(doc["counter"], json!(3));
        assert_eq!(doc["shipping"]["name"], json!("Ada"));
    }

    #[test]
    fn pull_removes_matching_elements() {
        let mut doc = inventory();
        Update::new()
            .pull("reservations", Filter::new().eq("_id", "user-1"))
            .apply(&mut doc, &Filter::new())
            .unwrap();

        assert_eq!(doc["reservations"], json!([{"_id": "user-2", "quantity": 1}]));
    }

    #[test]
    fn positional_set_targets_matched_element() {
        let mut doc = inventory();
        let filter = Filter::by_id("P1").eq("reservations._id", "user-2");
        Update::new()
            .set("reservations.$.quantity", 7)
            .apply(&mut doc, &filter)
            .unwrap();

        assert_eq!(doc["reservations"][1]["quantity"], json!(7));
        assert_eq!(doc["reservations"][0]["quantity"], json!(2));
    }

    #[test]
    fn positional_without_array_clause_is_rejected() {
        let mut doc = inventory();
        let result = Update::new()
            .set("reservations.$.quantity", 7)
            .apply(&mut doc, &Filter::by_id("P1"));

        assert!(matches!(
            result,
            Err(DocumentStoreError::PositionalMismatch { .. })
        ));
    }

    #[test]
    fn failed_update_leaves_document_untouched() {
        let mut doc = inventory();
        let before = doc.clone();
        let result = Update::new()
            .inc("quantity", -1)
            .push("quantity", 1)
            .apply(&mut doc, &Filter::new());

        assert!(matches!(result, Err(DocumentStoreError::InvalidUpdate { .. })));
        assert_eq!(doc, before);
    }

    #[test]
    fn setting_the_same_value_reports_unchanged() {
        let mut doc = inventory();
        let changed = Update::new()
            .set("quantity", 5)
            .apply(&mut doc, &Filter::new())
            .unwrap();
        assert!(!changed);
    }
}
