//! Scalar values and comparison lookups used by predicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Filter value types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// String value.
    String(String),
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// List of values (for `in` lookups).
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Convert to string representation.
    pub fn as_string(&self) -> Option<String> {
        match self {
            FilterValue::String(s) => Some(s.clone()),
            FilterValue::Integer(i) => Some(i.to_string()),
            FilterValue::Float(f) => Some(f.to_string()),
            FilterValue::Boolean(b) => Some(b.to_string()),
            FilterValue::DateTime(d) => Some(d.to_rfc3339()),
            FilterValue::List(_) => None,
        }
    }

    /// Convert to integer if possible.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FilterValue::Integer(i) => Some(*i),
            FilterValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Split a comma-joined string into a list; lists pass through.
    ///
    /// Empty segments are dropped, so `"1,,2"` yields two values.
    pub fn split_list(&self) -> FilterValue {
        match self {
            FilterValue::String(s) => FilterValue::List(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| FilterValue::String(part.to_string()))
                    .collect(),
            ),
            FilterValue::List(_) => self.clone(),
            other => FilterValue::List(vec![other.clone()]),
        }
    }

    /// Flatten into the list of scalar members.
    pub fn members(&self) -> Vec<FilterValue> {
        match self {
            FilterValue::List(items) => items.clone(),
            other => vec![other.clone()],
        }
    }

    /// JSON representation, as stored in an entity row.
    pub fn to_json(&self) -> JsonValue {
        match self {
            FilterValue::String(s) => JsonValue::String(s.clone()),
            FilterValue::Integer(i) => JsonValue::from(*i),
            FilterValue::Float(f) => JsonValue::from(*f),
            FilterValue::Boolean(b) => JsonValue::Bool(*b),
            FilterValue::DateTime(d) => JsonValue::String(d.to_rfc3339()),
            FilterValue::List(items) => {
                JsonValue::Array(items.iter().map(FilterValue::to_json).collect())
            }
        }
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Integer(i64::from(value))
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Boolean(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        FilterValue::DateTime(value)
    }
}

/// Comparison applied between a column and a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    /// Exact match.
    Exact,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Value in list.
    In,
    /// Case-insensitive substring match.
    IContains,
    /// Column is NULL when the value is true, NOT NULL otherwise.
    IsNull,
}

impl Lookup {
    fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "exact" => Lookup::Exact,
            "ne" => Lookup::Ne,
            "gt" => Lookup::Gt,
            "gte" => Lookup::Gte,
            "lt" => Lookup::Lt,
            "lte" => Lookup::Lte,
            "in" => Lookup::In,
            "icontains" => Lookup::IContains,
            "isnull" => Lookup::IsNull,
            _ => return None,
        })
    }

    /// Split a `field__sub__op` parameter name into a column and a lookup.
    ///
    /// A trailing `__id` on a relation name collapses to its foreign-key
    /// column, so `host_user__id__in` targets `host_user_id`.
    pub fn parse(name: &str) -> (String, Lookup) {
        let mut parts: Vec<&str> = name.split("__").collect();
        let lookup = match parts.last().and_then(|last| Lookup::from_suffix(last)) {
            Some(lookup) if parts.len() > 1 => {
                parts.pop();
                lookup
            }
            _ => Lookup::Exact,
        };
        (parts.join("_"), lookup)
    }
}
