//! Event documents.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value as JsonValue, json};

use crate::models::event::{attendance, is_host, is_open};
use crate::models::{Caller, ItemKind, Model};
use crate::query::{Entity, Predicate, Store};

use super::{Document, Serializer, average_rate, count, related, tag_names};

pub struct EventSerializer;

#[async_trait]
impl Serializer for EventSerializer {
    fn model(&self) -> Model {
        Model::Event
    }

    fn exclude(&self) -> &'static [&'static str] {
        &["qr_code", "verification_link"]
    }

    async fn add_fields(
        &self,
        store: &dyn Store,
        entity: &Entity,
        caller: Option<&Caller>,
    ) -> Result<Document> {
        let (host, attendee) = match caller {
            Some(caller) => (
                is_host(store, entity, caller).await?,
                attendance(store, entity.id, caller.id).await?,
            ),
            None => (false, None),
        };
        let signed_in = caller.is_some();
        let attending = attendee.is_some();
        let can_attend = signed_in && !host && !attending && is_open(entity, Utc::now());

        let mut document = Document::new();
        document.insert(
            "request_data".into(),
            json!({
                "allowed_actions": {
                    "can_edit": host,
                    "can_delete": host,
                    "can_attend": can_attend,
                    "can_verify": host,
                    "can_hide": signed_in && !host,
                    "can_report": signed_in && !host,
                }
            }),
        );
        document.insert(
            "attendee_count".into(),
            count(store, related(Model::Attendee, "event_id", entity.id)).await?,
        );
        document.insert("is_attending".into(), JsonValue::Bool(attending));
        document.insert(
            "is_verified".into(),
            JsonValue::Bool(attendee.as_ref().is_some_and(|a| a.get_bool("is_verified"))),
        );
        // Only the attendee sees their own form answers.
        document.insert(
            "form_response".into(),
            attendee
                .as_ref()
                .and_then(|a| a.get("form_data").cloned())
                .unwrap_or(JsonValue::Null),
        );
        document.insert("tags".into(), tag_names(store, ItemKind::Event, entity.id).await?);
        document.insert(
            "rate".into(),
            average_rate(store, entity, ItemKind::Event, Predicate::eq("item_id", entity.id))
                .await?,
        );
        Ok(document)
    }
}
