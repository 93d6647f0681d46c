//! Static parameter schemas and query-string binding.
//!
//! Each filter set declares its parameters once at startup as a table of
//! [`ParamSpec`]s. Binding turns raw query-string values into typed
//! [`FilterValue`]s before any filter logic runs.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::Model;
use crate::query::{FilterValue, Lookup, Predicate};

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Int,
    Float,
    Str,
    Bool,
    DateTime,
    /// Comma-joined list, split before use.
    ListStr,
}

impl ParamKind {
    pub fn expected(self) -> &'static str {
        match self {
            ParamKind::Int => "integer",
            ParamKind::Float => "number",
            ParamKind::Str => "string",
            ParamKind::Bool => "boolean",
            ParamKind::DateTime => "RFC 3339 datetime or YYYY-MM-DD date",
            ParamKind::ListStr => "comma-separated list",
        }
    }

    /// Parse a raw value. Empty values are treated as absent.
    pub fn bind(self, field: &str, raw: &str) -> Result<Option<FilterValue>, BindError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let mismatch = || BindError {
            field: field.to_string(),
            expected: self.expected(),
            value: raw.to_string(),
        };
        let value = match self {
            ParamKind::Int => FilterValue::Integer(raw.parse().map_err(|_| mismatch())?),
            ParamKind::Float => {
                let parsed: f64 = raw.parse().map_err(|_| mismatch())?;
                if !parsed.is_finite() {
                    return Err(mismatch());
                }
                FilterValue::Float(parsed)
            }
            ParamKind::Str => FilterValue::String(raw.to_string()),
            ParamKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => FilterValue::Boolean(true),
                "false" | "0" | "no" => FilterValue::Boolean(false),
                _ => return Err(mismatch()),
            },
            ParamKind::DateTime => FilterValue::DateTime(parse_datetime(raw).ok_or_else(mismatch)?),
            ParamKind::ListStr => FilterValue::String(raw.to_string()).split_list(),
        };
        Ok(Some(value))
    }
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A query-string value that does not match its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value {value:?} for {field}: expected {expected}")]
pub struct BindError {
    pub field: String,
    pub expected: &'static str,
    pub value: String,
}

/// Where a bound parameter applies.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamTarget {
    /// `column <lookup> value`.
    Column { column: String, lookup: Lookup },
    /// `id IN (SELECT select_column FROM model WHERE key_column = value)`.
    Related {
        model: Model,
        select_column: String,
        key_column: String,
    },
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub target: ParamTarget,
}

impl ParamSpec {
    /// Column parameter; the column and lookup come from the name
    /// (`start_date__gte`, `host_user__id__in`).
    pub fn new(name: &str, kind: ParamKind) -> Self {
        let (column, lookup) = Lookup::parse(name);
        Self {
            name: name.to_string(),
            kind,
            target: ParamTarget::Column { column, lookup },
        }
    }

    /// Membership through another collection keyed by the parameter value.
    pub fn related(name: &str, kind: ParamKind, model: Model, select_column: &str, key_column: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            target: ParamTarget::Related {
                model,
                select_column: select_column.to_string(),
                key_column: key_column.to_string(),
            },
        }
    }

    /// Apply to a different column, keeping the parsed lookup.
    pub fn on_column(mut self, column: &str) -> Self {
        if let ParamTarget::Column { column: target, .. } = &mut self.target {
            *target = column.to_string();
        }
        self
    }

    /// Predicate for a bound value.
    pub fn predicate(&self, value: &FilterValue) -> Predicate {
        match &self.target {
            ParamTarget::Column { column, lookup } => {
                if self.kind == ParamKind::ListStr || *lookup == Lookup::In {
                    Predicate::is_in(column.clone(), value.split_list().members())
                } else {
                    Predicate::lookup(column.clone(), *lookup, value.clone())
                }
            }
            ParamTarget::Related {
                model,
                select_column,
                key_column,
            } => {
                let key = if self.kind == ParamKind::ListStr {
                    Predicate::is_in(key_column.clone(), value.members())
                } else {
                    Predicate::eq(key_column.clone(), value.clone())
                };
                Predicate::in_subquery("id", *model, select_column.clone(), key)
            }
        }
    }
}

/// Bound values keyed by declared name. Absent parameters have no entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterParameters {
    values: BTreeMap<String, FilterValue>,
}

impl FilterParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: FilterValue) {
        self.values.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.set(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_rejects_non_numeric_int() {
        let err = ParamKind::Int.bind("creator", "abc").unwrap_err();
        assert_eq!(err.field, "creator");
        assert_eq!(err.expected, "integer");
        assert_eq!(err.value, "abc");
    }

    #[test]
    fn bind_empty_is_absent() {
        assert_eq!(ParamKind::Int.bind("creator", "  ").unwrap(), None);
    }

    #[test]
    fn bind_dates_and_datetimes() {
        let date = ParamKind::DateTime.bind("start_date__gte", "2030-05-01").unwrap();
        let full = ParamKind::DateTime
            .bind("start_date__gte", "2030-05-01T00:00:00Z")
            .unwrap();
        assert_eq!(date, full);
        assert!(ParamKind::DateTime.bind("start_date__gte", "tomorrow").is_err());
    }

    #[test]
    fn bind_rejects_nan() {
        assert!(ParamKind::Float.bind("latitude__gte", "NaN").is_err());
        assert_eq!(
            ParamKind::Float.bind("latitude__gte", "12.5").unwrap(),
            Some(FilterValue::Float(12.5))
        );
    }

    #[test]
    fn list_param_becomes_in() {
        let spec = ParamSpec::new("host_user__id__in", ParamKind::ListStr);
        let value = spec.kind.bind(&spec.name, "1,2").unwrap().unwrap();
        assert_eq!(
            spec.predicate(&value),
            Predicate::is_in("host_user_id", vec!["1".into(), "2".into()])
        );
    }

    #[test]
    fn related_param_builds_subquery() {
        let spec = ParamSpec::related("clubs", ParamKind::Int, Model::Membership, "user_id", "club_id");
        assert_eq!(
            spec.predicate(&FilterValue::Integer(3)),
            Predicate::in_subquery("id", Model::Membership, "user_id", Predicate::eq("club_id", 3))
        );
    }

    #[test]
    fn on_column_keeps_lookup() {
        let spec = ParamSpec::new("category", ParamKind::Int).on_column("category_id");
        assert_eq!(
            spec.target,
            ParamTarget::Column {
                column: "category_id".into(),
                lookup: Lookup::Exact
            }
        );
    }
}
