//! Caller-shaped projections of stored entities.
//!
//! A document is the entity's intrinsic fields minus a per-type exclusion
//! list, merged with the caller-dependent fields from
//! [`Serializer::add_fields`], merged with any annotation values the filter
//! pipeline computed for the entity.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue, json};

use crate::models::{Caller, ItemKind, Model};
use crate::query::{Aggregate, Entity, Predicate, QuerySet, Store};

pub mod events;
pub mod interactions;
pub mod organisations;
pub mod posts;
pub mod users;

pub use events::EventSerializer;
pub use interactions::{HideSerializer, ReportSerializer};
pub use organisations::{ClubSerializer, PlaceSerializer};
pub use posts::{CommentSerializer, PostSerializer};
pub use users::UserSerializer;

/// Output document.
pub type Document = Map<String, JsonValue>;

/// Per-type mapping from an entity and a caller to a document.
#[async_trait]
pub trait Serializer: Send + Sync {
    /// Collection this serializer projects.
    fn model(&self) -> Model;

    /// Intrinsic fields never exposed.
    fn exclude(&self) -> &'static [&'static str] {
        &[]
    }

    /// Intrinsic fields replaced by a computed equivalent in `add_fields`.
    fn computed(&self) -> &'static [&'static str] {
        &[]
    }

    /// Caller-dependent fields. Anonymous callers get a reduced capability
    /// set, never an error.
    async fn add_fields(
        &self,
        store: &dyn Store,
        entity: &Entity,
        caller: Option<&Caller>,
    ) -> Result<Document>;

    async fn serialize(
        &self,
        store: &dyn Store,
        entity: &Entity,
        caller: Option<&Caller>,
        annotations: &[String],
    ) -> Result<Document> {
        let mut document = base_projection(entity, self.exclude(), self.computed());
        document.extend(self.add_fields(store, entity, caller).await?);
        for name in annotations {
            let value = entity.annotation(name).cloned().unwrap_or(JsonValue::Null);
            document.insert(name.clone(), value);
        }
        Ok(document)
    }
}

/// Intrinsic fields minus exclusions and computed replacements.
pub fn base_projection(entity: &Entity, exclude: &[&str], computed: &[&str]) -> Document {
    let mut document: Document = entity
        .fields
        .iter()
        .filter(|(name, _)| !exclude.contains(&name.as_str()) && !computed.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    document.insert("id".to_string(), JsonValue::from(entity.id));
    document
}

/// Serializer for each attachable item kind.
pub fn serializer_for(kind: ItemKind) -> &'static dyn Serializer {
    match kind {
        ItemKind::User => &UserSerializer,
        ItemKind::Post => &PostSerializer,
        ItemKind::Comment => &CommentSerializer,
        ItemKind::Event => &EventSerializer,
        ItemKind::Club => &ClubSerializer,
        ItemKind::Place => &PlaceSerializer,
    }
}

pub(crate) async fn count(store: &dyn Store, queryset: QuerySet) -> Result<JsonValue> {
    Ok(JsonValue::from(store.count(&queryset).await?))
}

/// Rows of `model` whose `column` equals `id`.
pub(crate) fn related(model: Model, column: &str, id: i64) -> QuerySet {
    QuerySet::new(model).filter(Predicate::eq(column, id))
}

/// Tag names attached to an item.
pub(crate) async fn tag_names(store: &dyn Store, kind: ItemKind, id: i64) -> Result<JsonValue> {
    let qs = QuerySet::new(Model::Tag)
        .filter(Predicate::eq("item_type", kind.as_str()))
        .filter(Predicate::eq("item_id", id));
    let names: Vec<JsonValue> = store
        .fetch_all(&qs)
        .await?
        .iter()
        .filter_map(|tag| tag.get("name").cloned())
        .collect();
    Ok(JsonValue::Array(names))
}

/// Average rate over rated rows of `kind` matching `items`, computed by the
/// store as an annotation on the entity's own row.
pub(crate) async fn average_rate(
    store: &dyn Store,
    entity: &Entity,
    kind: ItemKind,
    items: Predicate,
) -> Result<JsonValue> {
    let rates = Predicate::eq("item_type", kind.as_str()).and(items);
    let qs = QuerySet::new(entity.model)
        .filter(Predicate::eq("id", entity.id))
        .annotate("rate", Aggregate::avg(Model::Rate, "rate").filter(rates));
    Ok(store
        .first(&qs)
        .await?
        .and_then(|row| row.annotation("rate").cloned())
        .unwrap_or(JsonValue::Null))
}

/// Public summary of a user, used where a document embeds its author.
pub(crate) async fn user_summary(store: &dyn Store, user_id: Option<i64>) -> Result<JsonValue> {
    let Some(user_id) = user_id else {
        return Ok(JsonValue::Null);
    };
    Ok(match store.get(Model::User, user_id).await? {
        Some(user) => json!({
            "id": user.id,
            "username": user.get("username"),
            "first_name": user.get("first_name"),
            "last_name": user.get("last_name"),
        }),
        None => JsonValue::Null,
    })
}
