//! User documents.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};

use crate::models::user::{ConnectionStatus, connection_status, has_blocked};
use crate::models::{Caller, Model};
use crate::query::{Entity, Store};

use super::{Document, Serializer, count, related};

pub struct UserSerializer;

#[async_trait]
impl Serializer for UserSerializer {
    fn model(&self) -> Model {
        Model::User
    }

    fn exclude(&self) -> &'static [&'static str] {
        &[
            "password_hash",
            "email",
            "is_superuser",
            "is_active",
            "unread_notifications",
            "last_login",
        ]
    }

    async fn add_fields(
        &self,
        store: &dyn Store,
        entity: &Entity,
        caller: Option<&Caller>,
    ) -> Result<Document> {
        let (connection, is_blocked) = match caller {
            Some(caller) => (
                Some(connection_status(store, entity.id, caller).await?),
                has_blocked(store, caller.id, entity.id).await?,
            ),
            None => (None, false),
        };
        let is_self = connection == Some(ConnectionStatus::Me);
        let signed_in = caller.is_some();

        let mut document = Document::new();
        document.insert(
            "connection".into(),
            connection.map_or(JsonValue::Null, |status| json!(status)),
        );
        document.insert("is_blocked".into(), JsonValue::Bool(is_blocked));
        document.insert(
            "post_count".into(),
            count(store, related(Model::Post, "creator_id", entity.id)).await?,
        );
        document.insert(
            "club_count".into(),
            count(store, related(Model::Membership, "user_id", entity.id)).await?,
        );
        document.insert(
            "hosted_event_count".into(),
            count(store, related(Model::Event, "host_user_id", entity.id)).await?,
        );
        document.insert(
            "request_data".into(),
            json!({
                "allowed_actions": {
                    "can_connect": signed_in && !is_self && !is_blocked,
                    "can_block": signed_in && !is_self,
                    "can_hide": signed_in && !is_self,
                    "can_report": signed_in && !is_self,
                    "can_update": is_self,
                }
            }),
        );
        Ok(document)
    }
}
