use serde_json::{Number, Value};

use crate::Status;
use crate::similarity::{PARTIAL_MATCH_THRESHOLD, similarity_ratio};

/// Result of resolving a field path in the extracted document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    /// The path resolves, possibly to an explicit `null`.
    Present(&'a Value),
    /// The key, or some ancestor of it, does not exist.
    Absent,
}

impl<'a> Lookup<'a> {
    pub fn value(self) -> Option<&'a Value> {
        match self {
            Lookup::Present(v) => Some(v),
            Lookup::Absent => None,
        }
    }

    /// Resolve `key` in the object this lookup points at.
    pub fn key(self, key: &str) -> Lookup<'a> {
        match self {
            Lookup::Present(Value::Object(map)) => {
                map.get(key).map_or(Lookup::Absent, Lookup::Present)
            }
            _ => Lookup::Absent,
        }
    }

    /// Resolve element `index` of the array this lookup points at.
    pub fn index(self, index: usize) -> Lookup<'a> {
        match self {
            Lookup::Present(Value::Array(items)) => {
                items.get(index).map_or(Lookup::Absent, Lookup::Present)
            }
            _ => Lookup::Absent,
        }
    }
}

/// Type tag of a document-tree value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Object,
    Array,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Object(_) => ValueKind::Object,
            Value::Array(_) => ValueKind::Array,
        }
    }
}

/// Classify one field. Rules apply in order:
///
/// 1. absent actual → `Missing`
/// 2. different kinds → `Mismatch`, before any string similarity
/// 3. null vs null → `ExactMatch`
/// 4. bools and numbers compare by value, no fuzzy credit
/// 5. strings: equal → `ExactMatch`; ratio ≥ 0.8 → `PartialMatch`; else `Mismatch`
/// 6. objects and arrays: deep equality or `Mismatch`
pub fn classify(expected: &Value, actual: Lookup<'_>) -> Status {
    let Some(actual) = actual.value() else {
        return Status::Missing;
    };

    if ValueKind::of(expected) != ValueKind::of(actual) {
        return Status::Mismatch;
    }

    match (expected, actual) {
        (Value::Null, Value::Null) => Status::ExactMatch,
        (Value::Bool(e), Value::Bool(a)) => exact_or_mismatch(e == a),
        (Value::Number(e), Value::Number(a)) => exact_or_mismatch(numbers_equal(e, a)),
        (Value::String(e), Value::String(a)) => {
            if e == a {
                Status::ExactMatch
            } else if similarity_ratio(a, e) >= PARTIAL_MATCH_THRESHOLD {
                Status::PartialMatch
            } else {
                Status::Mismatch
            }
        }
        _ => exact_or_mismatch(deep_equal(expected, actual)),
    }
}

fn exact_or_mismatch(equal: bool) -> Status {
    if equal {
        Status::ExactMatch
    } else {
        Status::Mismatch
    }
}

/// Numeric equality by value: integers exactly, otherwise as `f64`
/// (so `1` equals `1.0`).
pub fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Structural equality. Object key order is irrelevant; array order is not.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| deep_equal(x, y)))
        }
        _ => false,
    }
}
