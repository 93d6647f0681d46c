//! Pending query descriptor over one collection.

use serde_json::{Map, Value as JsonValue};

use crate::models::Model;

use super::predicate::{Aggregate, Annotation, Predicate};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Row ordering for a queryset.
#[derive(Debug, Clone, PartialEq)]
pub enum Ordering {
    /// Columns in priority order; `id ASC` is always appended.
    Columns(Vec<(String, SortDirection)>),
    /// Shuffled on every execution.
    Random,
}

/// A filtered, annotated, ordered view of one collection.
///
/// Nothing touches the store until the queryset is handed to a
/// [`Store`](super::Store); every builder call returns a new descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySet {
    model: Model,
    predicate: Predicate,
    annotations: Vec<Annotation>,
    ordering: Ordering,
}

impl QuerySet {
    /// All rows of a collection in its declared order.
    pub fn new(model: Model) -> Self {
        let columns = model
            .default_ordering()
            .iter()
            .map(|(field, descending)| {
                let direction = if *descending {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                };
                (field.to_string(), direction)
            })
            .collect();
        Self {
            model,
            predicate: Predicate::True,
            annotations: Vec::new(),
            ordering: Ordering::Columns(columns),
        }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn ordering(&self) -> &Ordering {
        &self.ordering
    }

    /// Keep rows matching `predicate` as well.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = std::mem::replace(&mut self.predicate, Predicate::True).and(predicate);
        self
    }

    /// Drop rows for which `predicate` is true. Rows where it is unknown stay.
    pub fn exclude(self, predicate: Predicate) -> Self {
        self.filter(predicate.not())
    }

    /// Attach an aggregate value under `name`, replacing one of the same name.
    pub fn annotate(mut self, name: impl Into<String>, aggregate: Aggregate) -> Self {
        let name = name.into();
        self.annotations.retain(|a| a.name != name);
        self.annotations.push(Annotation { name, aggregate });
        self
    }

    /// Shuffle rows instead of ordering them.
    pub fn shuffled(mut self) -> Self {
        self.ordering = Ordering::Random;
        self
    }

    /// Names of the attached annotations.
    pub fn annotation_names(&self) -> Vec<String> {
        self.annotations.iter().map(|a| a.name.clone()).collect()
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.name == name)
    }
}

/// Window into an ordered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub offset: u64,
    pub limit: u64,
}

/// One fetched record with any annotation values computed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub model: Model,
    pub id: i64,
    pub fields: Map<String, JsonValue>,
    pub annotations: Map<String, JsonValue>,
}

impl Entity {
    /// Build from a row object; the `id` column is required.
    pub fn from_row(model: Model, fields: Map<String, JsonValue>) -> Option<Self> {
        let id = fields.get("id").and_then(JsonValue::as_i64)?;
        Some(Self {
            model,
            id,
            fields,
            annotations: Map::new(),
        })
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(JsonValue::as_i64)
    }

    pub fn get_bool(&self, field: &str) -> bool {
        self.get(field).and_then(JsonValue::as_bool).unwrap_or(false)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(JsonValue::as_str)
    }

    pub fn annotation(&self, name: &str) -> Option<&JsonValue> {
        self.annotations.get(name)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_queryset_uses_declared_ordering() {
        let qs = QuerySet::new(Model::Event);
        assert_eq!(
            qs.ordering(),
            &Ordering::Columns(vec![("start_date".to_string(), SortDirection::Asc)])
        );
        assert_eq!(qs.predicate(), &Predicate::True);
    }

    #[test]
    fn exclude_wraps_in_not() {
        let qs = QuerySet::new(Model::Post).exclude(Predicate::eq("creator_id", 3));
        assert_eq!(
            qs.predicate(),
            &Predicate::Not(Box::new(Predicate::eq("creator_id", 3)))
        );
    }

    #[test]
    fn annotate_replaces_same_name() {
        let qs = QuerySet::new(Model::User)
            .annotate("rate", Aggregate::sum(Model::Rate, "rate"))
            .annotate("rate", Aggregate::avg(Model::Rate, "rate"));
        assert_eq!(qs.annotation_names(), vec!["rate".to_string()]);
        assert!(qs.has_annotation("rate"));
    }

    #[test]
    fn entity_requires_id() {
        let row = json!({"title": "no id"});
        let JsonValue::Object(map) = row else {
            unreachable!()
        };
        assert!(Entity::from_row(Model::Post, map).is_none());
    }

    #[test]
    fn entity_treats_null_as_missing() {
        let JsonValue::Object(map) = json!({"id": 1, "creator_id": null}) else {
            unreachable!()
        };
        let entity = Entity::from_row(Model::Post, map).unwrap();
        assert!(entity.get("creator_id").is_none());
        assert_eq!(entity.get_i64("id"), Some(1));
    }
}
