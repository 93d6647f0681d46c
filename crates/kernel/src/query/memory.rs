//! In-process store over JSON rows.
//!
//! Predicates are evaluated with SQL three-valued logic so that results
//! agree with [`PgStore`](super::PgStore): a comparison against a NULL
//! column is unknown, `Not` keeps rows whose inner predicate is unknown, and
//! subqueries skip NULLs.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use serde_json::{Map, Value as JsonValue};

use crate::models::Model;

use super::predicate::{Aggregate, AggregateFunc, Predicate, Subquery};
use super::queryset::{Entity, Ordering, QuerySet, Slice, SortDirection};
use super::store::Store;
use super::types::{FilterValue, Lookup};

type Row = Map<String, JsonValue>;
type Tables = HashMap<Model, Vec<Row>>;

/// Store keeping every collection in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row, assigning the next id when the row carries none.
    pub fn insert(&self, model: Model, row: JsonValue) -> Result<i64> {
        let JsonValue::Object(mut row) = row else {
            anyhow::bail!("{} row must be a JSON object", model.table());
        };
        let mut tables = self.tables.write();
        let rows = tables.entry(model).or_default();
        let id = match row.get("id").and_then(JsonValue::as_i64) {
            Some(id) => {
                if rows.iter().any(|r| r.get("id").and_then(JsonValue::as_i64) == Some(id)) {
                    anyhow::bail!("duplicate id {id} in {}", model.table());
                }
                id
            }
            None => {
                let next = rows
                    .iter()
                    .filter_map(|r| r.get("id").and_then(JsonValue::as_i64))
                    .max()
                    .unwrap_or(0)
                    + 1;
                row.insert("id".to_string(), JsonValue::from(next));
                next
            }
        };
        rows.push(row);
        Ok(id)
    }

    /// Merge `patch` into an existing row. Returns false when no row matched.
    pub fn update(&self, model: Model, id: i64, patch: JsonValue) -> bool {
        let JsonValue::Object(patch) = patch else {
            return false;
        };
        let mut tables = self.tables.write();
        let Some(row) = tables
            .get_mut(&model)
            .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
        else {
            return false;
        };
        for (key, value) in patch {
            if key != "id" {
                row.insert(key, value);
            }
        }
        true
    }

    /// Delete a row. Returns false when no row matched.
    pub fn remove(&self, model: Model, id: i64) -> bool {
        let mut tables = self.tables.write();
        let Some(rows) = tables.get_mut(&model) else {
            return false;
        };
        let before = rows.len();
        rows.retain(|r| row_id(r) != Some(id));
        rows.len() != before
    }

    /// Snapshot of a collection in insertion order.
    pub fn rows(&self, model: Model) -> Vec<JsonValue> {
        self.tables
            .read()
            .get(&model)
            .map(|rows| rows.iter().cloned().map(JsonValue::Object).collect())
            .unwrap_or_default()
    }

    fn matching(tables: &Tables, queryset: &QuerySet) -> Vec<Row> {
        tables
            .get(&queryset.model())
            .map(|rows| {
                rows.iter()
                    .filter(|row| eval(tables, queryset.predicate(), row) == Some(true))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn count(&self, queryset: &QuerySet) -> Result<u64> {
        let tables = self.tables.read();
        Ok(Self::matching(&tables, queryset).len() as u64)
    }

    async fn fetch(&self, queryset: &QuerySet, slice: Option<Slice>) -> Result<Vec<Entity>> {
        let tables = self.tables.read();
        let mut rows = Self::matching(&tables, queryset);

        match queryset.ordering() {
            Ordering::Random => rows.shuffle(&mut rand::thread_rng()),
            Ordering::Columns(columns) => rows.sort_by(|a, b| compare_rows(a, b, columns)),
        }

        let window: Vec<Row> = match slice {
            Some(slice) => rows
                .into_iter()
                .skip(usize::try_from(slice.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(slice.limit).unwrap_or(usize::MAX))
                .collect(),
            None => rows,
        };

        window
            .into_iter()
            .map(|row| {
                let Some(mut entity) = Entity::from_row(queryset.model(), row.clone()) else {
                    anyhow::bail!("{} row has no integer id", queryset.model().table());
                };
                for annotation in queryset.annotations() {
                    let value = aggregate(&tables, &annotation.aggregate, &row);
                    entity.annotations.insert(annotation.name.clone(), value);
                }
                Ok(entity)
            })
            .collect()
    }

    async fn healthy(&self) -> bool {
        true
    }
}

fn row_id(row: &Row) -> Option<i64> {
    row.get("id").and_then(JsonValue::as_i64)
}

fn field<'r>(row: &'r Row, name: &str) -> Option<&'r JsonValue> {
    row.get(name).filter(|v| !v.is_null())
}

/// Evaluate a predicate: `Some(true)`, `Some(false)` or unknown (`None`).
fn eval(tables: &Tables, predicate: &Predicate, row: &Row) -> Option<bool> {
    match predicate {
        Predicate::True => Some(true),
        Predicate::False => Some(false),
        Predicate::Compare {
            field: name,
            lookup,
            value,
        } => compare(field(row, name), *lookup, value),
        Predicate::InSubquery {
            field: name,
            subquery,
        } => {
            let current = field(row, name)?;
            Some(
                subquery_values(tables, subquery)
                    .iter()
                    .any(|v| json_cmp(current, v) == Some(CmpOrdering::Equal)),
            )
        }
        Predicate::And(items) => {
            let mut unknown = false;
            for item in items {
                match eval(tables, item, row) {
                    Some(false) => return Some(false),
                    None => unknown = true,
                    Some(true) => {}
                }
            }
            if unknown { None } else { Some(true) }
        }
        Predicate::Or(items) => {
            let mut unknown = false;
            for item in items {
                match eval(tables, item, row) {
                    Some(true) => return Some(true),
                    None => unknown = true,
                    Some(false) => {}
                }
            }
            if unknown { None } else { Some(false) }
        }
        Predicate::Not(inner) => Some(eval(tables, inner, row) != Some(true)),
    }
}

fn compare(current: Option<&JsonValue>, lookup: Lookup, value: &FilterValue) -> Option<bool> {
    if lookup == Lookup::IsNull {
        let wants_null = match value {
            FilterValue::Boolean(b) => *b,
            other => other.as_string().is_some_and(|s| s == "true" || s == "1"),
        };
        return Some(current.is_none() == wants_null);
    }

    if lookup == Lookup::In {
        let members = value.members();
        if members.is_empty() {
            return Some(false);
        }
        let current = current?;
        return Some(
            members
                .iter()
                .any(|m| json_cmp(current, &m.to_json()) == Some(CmpOrdering::Equal)),
        );
    }

    let current = current?;
    if lookup == Lookup::IContains {
        let haystack = match current {
            JsonValue::String(s) => s.to_lowercase(),
            other => other.to_string().to_lowercase(),
        };
        let needle = value.as_string().unwrap_or_default().to_lowercase();
        return Some(haystack.contains(&needle));
    }

    let ordering = json_cmp(current, &value.to_json())?;
    Some(match lookup {
        Lookup::Ne => ordering != CmpOrdering::Equal,
        Lookup::Gt => ordering == CmpOrdering::Greater,
        Lookup::Gte => ordering != CmpOrdering::Less,
        Lookup::Lt => ordering == CmpOrdering::Less,
        Lookup::Lte => ordering != CmpOrdering::Greater,
        _ => ordering == CmpOrdering::Equal,
    })
}

fn subquery_values(tables: &Tables, subquery: &Subquery) -> Vec<JsonValue> {
    tables
        .get(&subquery.model)
        .map(|rows| {
            rows.iter()
                .filter(|row| eval(tables, &subquery.predicate, row) == Some(true))
                .filter_map(|row| field(row, &subquery.column).cloned())
                .collect()
        })
        .unwrap_or_default()
}

fn aggregate(tables: &Tables, aggregate: &Aggregate, outer: &Row) -> JsonValue {
    let key = field(outer, &aggregate.outer_column);
    let values: Vec<&JsonValue> = tables
        .get(&aggregate.model)
        .map(|rows| {
            rows.iter()
                .filter(|row| {
                    !aggregate.is_correlated()
                        || matches!(
                            (field(row, &aggregate.inner_column), key),
                            (Some(inner), Some(key)) if json_cmp(inner, key) == Some(CmpOrdering::Equal)
                        )
                })
                .filter(|row| eval(tables, &aggregate.predicate, row) == Some(true))
                .filter_map(|row| field(row, &aggregate.column))
                .collect()
        })
        .unwrap_or_default();

    match aggregate.func {
        AggregateFunc::Count => JsonValue::from(values.len() as i64),
        AggregateFunc::Sum => {
            if values.is_empty() {
                return JsonValue::Null;
            }
            if values.iter().all(|v| v.is_i64()) {
                JsonValue::from(values.iter().filter_map(|v| v.as_i64()).sum::<i64>())
            } else {
                JsonValue::from(values.iter().filter_map(|v| v.as_f64()).sum::<f64>())
            }
        }
        AggregateFunc::Avg => {
            let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
            if numbers.is_empty() {
                return JsonValue::Null;
            }
            JsonValue::from(numbers.iter().sum::<f64>() / numbers.len() as f64)
        }
    }
}

/// Compare two JSON scalars the way the database would compare the
/// corresponding column values. Incomparable pairs yield `None`.
fn json_cmp(a: &JsonValue, b: &JsonValue) -> Option<CmpOrdering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return Some(x.cmp(&y));
            }
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (JsonValue::Number(x), JsonValue::String(s)) => {
            x.as_f64()?.partial_cmp(&s.trim().parse::<f64>().ok()?)
        }
        (JsonValue::String(s), JsonValue::Number(y)) => {
            s.trim().parse::<f64>().ok()?.partial_cmp(&y.as_f64()?)
        }
        (JsonValue::String(x), JsonValue::String(y)) => {
            match (parse_timestamp(x), parse_timestamp(y)) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => Some(x.cmp(y)),
            }
        }
        (JsonValue::Bool(x), JsonValue::Bool(y)) => Some(x.cmp(y)),
        (JsonValue::Bool(x), JsonValue::String(s)) => s.parse::<bool>().ok().map(|y| x.cmp(&y)),
        (JsonValue::String(s), JsonValue::Bool(y)) => s.parse::<bool>().ok().map(|x| x.cmp(y)),
        _ => None,
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Order rows by the declared columns, then by id. NULLs sort last
/// ascending and first descending, as in PostgreSQL.
fn compare_rows(a: &Row, b: &Row, columns: &[(String, SortDirection)]) -> CmpOrdering {
    for (name, direction) in columns {
        let ordering = match (field(a, name), field(b, name)) {
            (None, None) => CmpOrdering::Equal,
            (None, Some(_)) => CmpOrdering::Greater,
            (Some(_), None) => CmpOrdering::Less,
            (Some(x), Some(y)) => json_cmp(x, y).unwrap_or(CmpOrdering::Equal),
        };
        let ordering = match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != CmpOrdering::Equal {
            return ordering;
        }
    }
    row_id(a).cmp(&row_id(b))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with_posts() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(Model::Post, json!({"title": "Rust", "creator_id": 1}))
            .unwrap();
        store
            .insert(Model::Post, json!({"title": "Go", "creator_id": null}))
            .unwrap();
        store
            .insert(Model::Post, json!({"title": "rusty nails", "creator_id": 2}))
            .unwrap();
        store
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = store_with_posts();
        let ids: Vec<i64> = store
            .rows(Model::Post)
            .iter()
            .filter_map(|r| r["id"].as_i64())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(store.insert(Model::Post, json!({"id": 2})).is_err());
    }

    #[tokio::test]
    async fn exclusion_keeps_null_columns() {
        let store = store_with_posts();
        let qs = QuerySet::new(Model::Post).exclude(Predicate::eq("creator_id", 1));
        let titles: Vec<String> = store
            .fetch_all(&qs)
            .await
            .unwrap()
            .iter()
            .filter_map(|e| e.get_str("title").map(str::to_string))
            .collect();
        assert_eq!(titles, vec!["Go".to_string(), "rusty nails".to_string()]);
    }

    #[tokio::test]
    async fn filter_drops_unknown_rows() {
        let store = store_with_posts();
        let qs = QuerySet::new(Model::Post).filter(Predicate::lookup("creator_id", Lookup::Ne, 1));
        assert_eq!(store.count(&qs).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn icontains_is_case_insensitive() {
        let store = store_with_posts();
        let qs = QuerySet::new(Model::Post).filter(Predicate::icontains("title", "RUST"));
        assert_eq!(store.count(&qs).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn in_subquery_skips_nulls() {
        let store = store_with_posts();
        store
            .insert(Model::Blocked, json!({"blocking_user_id": 9, "blocked_user_id": 2}))
            .unwrap();
        store
            .insert(Model::Blocked, json!({"blocking_user_id": 9, "blocked_user_id": null}))
            .unwrap();
        let blocked = Predicate::in_subquery(
            "creator_id",
            Model::Blocked,
            "blocked_user_id",
            Predicate::eq("blocking_user_id", 9),
        );
        let only = QuerySet::new(Model::Post).filter(blocked.clone());
        let rest = QuerySet::new(Model::Post).exclude(blocked);
        assert_eq!(store.count(&only).await.unwrap(), 1);
        assert_eq!(store.count(&rest).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn aggregates_follow_sql() {
        let store = store_with_posts();
        store
            .insert(Model::Rate, json!({"item_type": "Post", "item_id": 1, "rate": 4}))
            .unwrap();
        store
            .insert(Model::Rate, json!({"item_type": "Post", "item_id": 1, "rate": 5}))
            .unwrap();
        let qs = QuerySet::new(Model::Post)
            .annotate(
                "rate",
                Aggregate::avg(Model::Rate, "rate")
                    .correlate("item_id", "id")
                    .filter(Predicate::eq("item_type", "Post")),
            )
            .annotate("rates", Aggregate::count(Model::Rate).correlate("item_id", "id"));
        let rows = store.fetch_all(&qs).await.unwrap();
        assert_eq!(rows[0].annotation("rate"), Some(&json!(4.5)));
        assert_eq!(rows[0].annotation("rates"), Some(&json!(2)));
        assert_eq!(rows[1].annotation("rate"), Some(&JsonValue::Null));
        assert_eq!(rows[1].annotation("rates"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn ordering_and_window() {
        let store = MemoryStore::new();
        for (name, start) in [
            ("late", "2030-01-03T10:00:00Z"),
            ("early", "2030-01-01T10:00:00Z"),
            ("middle", "2030-01-02T10:00:00+02:00"),
        ] {
            store
                .insert(Model::Event, json!({"name": name, "start_date": start}))
                .unwrap();
        }
        let qs = QuerySet::new(Model::Event);
        let page = store
            .fetch(&qs, Some(Slice { offset: 1, limit: 5 }))
            .await
            .unwrap();
        let names: Vec<&str> = page.iter().filter_map(|e| e.get_str("name")).collect();
        assert_eq!(names, vec!["middle", "late"]);
    }

    #[tokio::test]
    async fn update_and_remove() {
        let store = store_with_posts();
        assert!(store.update(Model::Post, 2, json!({"creator_id": 5})));
        assert!(!store.update(Model::Post, 99, json!({"creator_id": 5})));
        let qs = QuerySet::new(Model::Post).filter(Predicate::eq("creator_id", 5));
        assert_eq!(store.count(&qs).await.unwrap(), 1);

        assert!(store.remove(Model::Post, 2));
        assert!(!store.remove(Model::Post, 2));
        assert_eq!(store.count(&qs).await.unwrap(), 0);
    }

    #[test]
    fn string_numbers_compare_with_integers() {
        assert_eq!(json_cmp(&json!(3), &json!("3")), Some(CmpOrdering::Equal));
        assert_eq!(json_cmp(&json!("2"), &json!(10)), Some(CmpOrdering::Less));
    }
}
