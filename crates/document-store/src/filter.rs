use serde_json::{Map, Value};

use crate::document::{ID_FIELD, compare_values, get_path, resolve_path, values_equal};

/// A single predicate applied to the values found at a path.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Some value equals the operand (array fields match if any element does).
    Eq(Value),
    /// No value equals the operand.
    Ne(Value),
    /// Some value is greater than or equal to the operand.
    Gte(Value),
    /// Some value is less than or equal to the operand.
    Lte(Value),
    /// The path resolves (or does not resolve) to at least one value.
    Exists(bool),
    /// The path holds an array with an element matching the nested filter.
    ElemMatch(Filter),
}

impl Condition {
    fn evaluate(&self, candidates: &[&Value]) -> bool {
        match self {
            Condition::Eq(operand) => candidates.iter().any(|c| eq_or_contains(c, operand)),
            Condition::Ne(operand) => !candidates.iter().any(|c| eq_or_contains(c, operand)),
            Condition::Gte(operand) => any_scalar(candidates, |c| {
                compare_values(c, operand).is_some_and(|ord| ord.is_ge())
            }),
            Condition::Lte(operand) => any_scalar(candidates, |c| {
                compare_values(c, operand).is_some_and(|ord| ord.is_le())
            }),
            Condition::Exists(expected) => candidates.is_empty() != *expected,
            Condition::ElemMatch(filter) => candidates.iter().any(|c| {
                c.as_array()
                    .is_some_and(|items| items.iter().any(|item| filter.matches(item)))
            }),
        }
    }

    /// Negative conditions never select an array element for `$` updates.
    fn selects_element(&self) -> bool {
        !matches!(self, Condition::Ne(_) | Condition::Exists(false))
    }
}

fn eq_or_contains(candidate: &Value, operand: &Value) -> bool {
    values_equal(candidate, operand)
        || candidate
            .as_array()
            .is_some_and(|items| items.iter().any(|item| values_equal(item, operand)))
}

fn any_scalar(candidates: &[&Value], predicate: impl Fn(&Value) -> bool) -> bool {
    candidates.iter().any(|c| match c {
        Value::Array(items) => items.iter().any(&predicate),
        other => predicate(other),
    })
}

/// Builder for document predicates.
///
/// All clauses must hold for a document to match. Paths are dotted and fan
/// out over arrays, so `products._id` matches when any line item has that id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Condition)>,
}

impl Filter {
    /// Creates an empty filter that matches every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter on the document `_id`.
    pub fn by_id(id: impl Into<Value>) -> Self {
        Self::new().eq(ID_FIELD, id)
    }

    /// Requires the path to equal the value.
    pub fn eq(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clause(path, Condition::Eq(value.into()))
    }

    /// Requires no value at the path to equal the value.
    pub fn ne(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clause(path, Condition::Ne(value.into()))
    }

    /// Requires the path to be greater than or equal to the value.
    pub fn gte(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clause(path, Condition::Gte(value.into()))
    }

    /// Requires the path to be less than or equal to the value.
    pub fn lte(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clause(path, Condition::Lte(value.into()))
    }

    /// Requires the path to exist (or be absent when `exists` is false).
    pub fn exists(self, path: impl Into<String>, exists: bool) -> Self {
        self.clause(path, Condition::Exists(exists))
    }

    /// Requires an element of the array at `path` to match `filter`.
    pub fn elem_match(self, path: impl Into<String>, filter: Filter) -> Self {
        self.clause(path, Condition::ElemMatch(filter))
    }

    fn clause(mut self, path: impl Into<String>, condition: Condition) -> Self {
        self.clauses.push((path.into(), condition));
        self
    }

    /// Returns the clauses in insertion order.
    pub fn clauses(&self) -> &[(String, Condition)] {
        &self.clauses
    }

    /// Returns true if the filter has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluates the filter against a document.
    pub fn matches(&self, document: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(path, condition)| condition.evaluate(&resolve_path(document, path)))
    }

    /// Returns the `_id` operand if the filter pins the document by equality.
    pub fn id_equality(&self) -> Option<&Value> {
        self.clauses.iter().find_map(|(path, condition)| match condition {
            Condition::Eq(value) if path == ID_FIELD => Some(value),
            _ => None,
        })
    }

    /// Finds the first element of the array at `array_path` selected by this
    /// filter, which is what a positional `$` segment refers to.
    pub fn positional_index(&self, document: &Value, array_path: &str) -> Option<usize> {
        let items = get_path(document, array_path)?.as_array()?;
        let prefix = format!("{array_path}.");

        let element_clauses: Vec<(Option<&str>, &Condition)> = self
            .clauses
            .iter()
            .filter(|(_, condition)| condition.selects_element())
            .filter_map(|(path, condition)| {
                if path == array_path && matches!(condition, Condition::ElemMatch(_)) {
                    Some((None, condition))
                } else {
                    path.strip_prefix(&prefix).map(|rest| (Some(rest), condition))
                }
            })
            .collect();

        if element_clauses.is_empty() {
            return None;
        }

        items.iter().position(|item| {
            element_clauses
                .iter()
                .all(|(sub_path, condition)| match (sub_path, condition) {
                    (None, Condition::ElemMatch(filter)) => filter.matches(item),
                    (Some(sub_path), condition) => {
                        condition.evaluate(&resolve_path(item, sub_path))
                    }
                    (None, _) => false,
                })
        })
    }

    /// Builds the starting document for an upsert from top-level equality
    /// clauses.
    pub(crate) fn upsert_seed(&self) -> Value {
        let mut seed = Map::new();
        for (path, condition) in &self.clauses {
            if let Condition::Eq(value) = condition
                && !path.contains('.')
            {
                seed.insert(path.clone(), value.clone());
            }
        }
        Value::Object(seed)
    }
}
