//! Pipeline stages and match conditions

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{compare_values, Record};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// Apply this direction to an ascending comparison
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// A resolved sort: one field plus direction.
///
/// Engines break ties on the sort field by ascending record id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

/// Match criteria evaluated against a single record
///
/// Missing fields compare as `null`. Values compare under
/// [`compare_values`], the same order the engine sorts by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// `field == value`
    Eq(String, Value),
    /// `field in values`
    In(String, Vec<Value>),
    /// `field > value`
    Gt(String, Value),
    /// `field < value`
    Lt(String, Value),
    /// Any of the nested conditions
    Or(Vec<Condition>),
    /// All of the nested conditions
    And(Vec<Condition>),
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    /// Evaluate the condition against a record
    pub fn matches(&self, record: &Record) -> bool {
        let cmp = |field: &str, value: &Value| compare_values(&record.get_or_null(field), value);
        match self {
            Self::Eq(field, value) => cmp(field, value) == Ordering::Equal,
            Self::In(field, values) => values.iter().any(|v| cmp(field, v) == Ordering::Equal),
            Self::Gt(field, value) => cmp(field, value) == Ordering::Greater,
            Self::Lt(field, value) => cmp(field, value) == Ordering::Less,
            Self::Or(conditions) => conditions.iter().any(|c| c.matches(record)),
            Self::And(conditions) => conditions.iter().all(|c| c.matches(record)),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Condition], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, c) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{c}")?;
    }
    f.write_str(")")
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq(field, value) => write!(f, "{field} == {value}"),
            Self::In(field, values) => write!(f, "{field} in {}", Value::from(values.clone())),
            Self::Gt(field, value) => write!(f, "{field} > {value}"),
            Self::Lt(field, value) => write!(f, "{field} < {value}"),
            Self::Or(parts) => write_joined(f, parts, " OR "),
            Self::And(parts) => write_joined(f, parts, " AND "),
        }
    }
}

/// Text search executed by an engine that supports it natively
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPattern {
    /// Regular expression, or a literal substring if it does not parse
    pub pattern: String,
    pub case_insensitive: bool,
    /// Fields to search; `None` searches all fields except the id
    pub fields: Option<Vec<String>>,
}

impl SearchPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            case_insensitive: true,
            fields: None,
        }
    }
}

/// One declarative step of a query pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Match(Condition),
    Sort(SortKey),
    Search(SearchPattern),
    /// Projection-only stage; irrelevant to counting
    Project(Vec<String>),
    Limit(usize),
    /// Replace the stream with a single record holding its length
    Count,
}

impl Stage {
    pub fn is_projection(&self) -> bool {
        matches!(self, Self::Project(_))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match(condition) => write!(f, "match {condition}"),
            Self::Sort(key) => {
                let dir = match key.order {
                    SortOrder::Ascending => "asc",
                    SortOrder::Descending => "desc",
                };
                write!(f, "sort {} {dir}", key.field)
            }
            Self::Search(search) => write!(f, "search /{}/", search.pattern),
            Self::Project(fields) => write!(f, "project {}", fields.join(",")),
            Self::Limit(n) => write!(f, "limit {n}"),
            Self::Count => f.write_str("count"),
        }
    }
}
