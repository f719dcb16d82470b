//! Records and identifiers as returned by a query engine
//!
//! A [`Record`] is a read-only mapping of field names to JSON values that
//! always carries a unique, totally ordered [`RecordId`]. The identifier is
//! also the pagination cursor: resuming after a record means resuming after
//! its id.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Name of the identifier field in match criteria and serialized records
pub const ID_FIELD: &str = "id";

/// Store-assigned record identifier
///
/// Identifiers are opaque to the pagination engine apart from their total
/// order, which must agree with the store's. Integer ids order before text ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Numeric id (auto-increment keys)
    Int(i64),
    /// Text id (fixed-width hex object ids, ULIDs)
    Text(String),
}

impl RecordId {
    /// The id as a JSON value, for use in match criteria
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::Text(s) => Value::String(s.clone()),
        }
    }

    /// Read an id back from a JSON value
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        id.to_value()
    }
}

/// A document returned by the query engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier assigned by the store
    pub id: RecordId,

    /// Remaining fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a record with no fields besides its id
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style: set a field
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Look up a field by name; `"id"` yields the identifier
    pub fn get(&self, field: &str) -> Option<Cow<'_, Value>> {
        if field == ID_FIELD {
            return Some(Cow::Owned(self.id.to_value()));
        }
        self.fields.get(field).map(Cow::Borrowed)
    }

    /// Look up a field, treating a missing field as `null`
    pub fn get_or_null(&self, field: &str) -> Cow<'_, Value> {
        self.get(field).unwrap_or(Cow::Owned(Value::Null))
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over values: null < bool < number < string < array < object.
///
/// Arrays compare element-wise, then by length. Objects compare entry by
/// entry in key order, key before value, then by size. Sorting and the
/// `Eq`/`Gt`/`Lt` conditions both use this order, so a boundary built from
/// any sort value admits exactly the records sorted after it.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => compare_arrays(x, y),
        (Value::Object(x), Value::Object(y)) => compare_objects(x, y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
        return x.cmp(&y);
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => x.to_string().cmp(&y.to_string()),
    }
}

fn compare_arrays(x: &[Value], y: &[Value]) -> Ordering {
    x.iter()
        .zip(y)
        .map(|(a, b)| compare_values(a, b))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| x.len().cmp(&y.len()))
}

fn compare_objects(x: &Map<String, Value>, y: &Map<String, Value>) -> Ordering {
    fn sorted(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
        let mut entries: Vec<_> = map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
    let (xs, ys) = (sorted(x), sorted(y));
    xs.iter()
        .zip(&ys)
        .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| compare_values(va, vb)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| xs.len().cmp(&ys.len()))
}
