//! Post and comment documents.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};

use crate::models::{Caller, ItemKind, Model};
use crate::query::{Entity, Predicate, Store};

use super::{Document, Serializer, average_rate, count, related, tag_names, user_summary};

/// Fields shared by posts and comments: permissions, tags, rate and the
/// author, hidden when the item is anonymous.
async fn authored_fields(
    store: &dyn Store,
    entity: &Entity,
    caller: Option<&Caller>,
    kind: ItemKind,
) -> Result<Document> {
    let is_creator = caller.is_some_and(|c| entity.get_i64("creator_id") == Some(c.id));
    let signed_in = caller.is_some();
    let author = if entity.get_bool("is_anon") {
        JsonValue::Null
    } else {
        user_summary(store, entity.get_i64("creator_id")).await?
    };

    let mut document = Document::new();
    document.insert(
        "request_data".into(),
        json!({
            "allowed_actions": {
                "can_hide": signed_in,
                "can_update": is_creator,
                "can_delete": is_creator,
                "can_report": signed_in,
            }
        }),
    );
    document.insert("tags".into(), tag_names(store, kind, entity.id).await?);
    document.insert(
        "rate".into(),
        average_rate(store, entity, kind, Predicate::eq("item_id", entity.id)).await?,
    );
    document.insert("author".into(), author);
    document.insert("is_creator".into(), JsonValue::Bool(is_creator));
    Ok(document)
}

pub struct PostSerializer;

#[async_trait]
impl Serializer for PostSerializer {
    fn model(&self) -> Model {
        Model::Post
    }

    fn computed(&self) -> &'static [&'static str] {
        &["creator_id"]
    }

    async fn add_fields(
        &self,
        store: &dyn Store,
        entity: &Entity,
        caller: Option<&Caller>,
    ) -> Result<Document> {
        let mut document = authored_fields(store, entity, caller, ItemKind::Post).await?;
        document.insert(
            "comment_count".into(),
            count(store, related(Model::Comment, "post_id", entity.id)).await?,
        );
        Ok(document)
    }
}

pub struct CommentSerializer;

#[async_trait]
impl Serializer for CommentSerializer {
    fn model(&self) -> Model {
        Model::Comment
    }

    fn computed(&self) -> &'static [&'static str] {
        &["creator_id"]
    }

    async fn add_fields(
        &self,
        store: &dyn Store,
        entity: &Entity,
        caller: Option<&Caller>,
    ) -> Result<Document> {
        let mut document = authored_fields(store, entity, caller, ItemKind::Comment).await?;
        document.insert(
            "reply_count".into(),
            count(store, related(Model::Comment, "reply_to_id", entity.id)).await?,
        );
        Ok(document)
    }
}
