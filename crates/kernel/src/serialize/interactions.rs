//! Hide and report documents, which embed the item they point at.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::models::{Caller, ItemKind, Model};
use crate::query::{Entity, Store};

use super::{Document, Serializer, serializer_for};

/// Resolve `item_type`/`item_id` through the item kind table and serialize
/// the referenced entity. Missing items and unknown kinds yield `null`.
async fn referenced_item(
    store: &dyn Store,
    entity: &Entity,
    caller: Option<&Caller>,
) -> Result<JsonValue> {
    let Some(kind) = entity.get_str("item_type").and_then(ItemKind::parse) else {
        return Ok(JsonValue::Null);
    };
    let Some(item_id) = entity.get_i64("item_id") else {
        return Ok(JsonValue::Null);
    };
    let Some(item) = store.get(kind.model(), item_id).await? else {
        return Ok(JsonValue::Null);
    };
    let document = serializer_for(kind)
        .serialize(store, &item, caller, &[])
        .await?;
    Ok(JsonValue::Object(document))
}

pub struct HideSerializer;

#[async_trait]
impl Serializer for HideSerializer {
    fn model(&self) -> Model {
        Model::Hide
    }

    async fn add_fields(
        &self,
        store: &dyn Store,
        entity: &Entity,
        caller: Option<&Caller>,
    ) -> Result<Document> {
        let mut document = Document::new();
        document.insert("item".into(), referenced_item(store, entity, caller).await?);
        Ok(document)
    }
}

pub struct ReportSerializer;

#[async_trait]
impl Serializer for ReportSerializer {
    fn model(&self) -> Model {
        Model::Report
    }

    async fn add_fields(
        &self,
        store: &dyn Store,
        entity: &Entity,
        caller: Option<&Caller>,
    ) -> Result<Document> {
        let mut document = Document::new();
        document.insert("item".into(), referenced_item(store, entity, caller).await?);
        Ok(document)
    }
}
