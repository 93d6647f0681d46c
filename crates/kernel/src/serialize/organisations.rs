//! Club and place documents.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};

use crate::models::club::{MembershipStatus, can_post, membership_status};
use crate::models::place::is_owner;
use crate::models::{Caller, ItemKind, Model};
use crate::query::{Entity, Predicate, QuerySet, Store};

use super::{Document, Serializer, average_rate, count, related, tag_names};

pub struct ClubSerializer;

#[async_trait]
impl Serializer for ClubSerializer {
    fn model(&self) -> Model {
        Model::Club
    }

    async fn add_fields(
        &self,
        store: &dyn Store,
        entity: &Entity,
        caller: Option<&Caller>,
    ) -> Result<Document> {
        let (membership, posting) = match caller {
            Some(caller) => (
                Some(membership_status(store, entity.id, caller.id).await?),
                can_post(store, entity, caller).await?,
            ),
            None => (None, false),
        };
        let admin = membership == Some(MembershipStatus::Admin);
        let signed_in = caller.is_some();

        let hosted = Predicate::in_subquery(
            "item_id",
            Model::Event,
            "id",
            Predicate::eq("host_club_id", entity.id),
        );
        let attendees = QuerySet::new(Model::Attendee).filter(Predicate::in_subquery(
            "event_id",
            Model::Event,
            "id",
            Predicate::eq("host_club_id", entity.id),
        ));

        let mut document = Document::new();
        document.insert(
            "request_data".into(),
            json!({
                "allowed_actions": {
                    "can_hide": signed_in,
                    "can_update": admin,
                    "can_delete": false,
                    "can_post": posting,
                    "can_event": admin,
                    "can_moderate": admin,
                    "can_join": signed_in && membership == Some(MembershipStatus::None),
                    "can_report": signed_in,
                }
            }),
        );
        document.insert(
            "membership".into(),
            membership.map_or(JsonValue::Null, |status| json!(status)),
        );
        document.insert("tags".into(), tag_names(store, ItemKind::Club, entity.id).await?);
        // Clubs are rated through the events they host.
        document.insert(
            "rate".into(),
            average_rate(store, entity, ItemKind::Event, hosted).await?,
        );
        document.insert(
            "post_count".into(),
            count(store, related(Model::Post, "author_club_id", entity.id)).await?,
        );
        document.insert(
            "hosted_event_count".into(),
            count(store, related(Model::Event, "host_club_id", entity.id)).await?,
        );
        document.insert(
            "member_count".into(),
            count(store, related(Model::Membership, "club_id", entity.id)).await?,
        );
        document.insert("event_attendee_count".into(), count(store, attendees).await?);
        Ok(document)
    }
}

pub struct PlaceSerializer;

#[async_trait]
impl Serializer for PlaceSerializer {
    fn model(&self) -> Model {
        Model::Place
    }

    async fn add_fields(
        &self,
        store: &dyn Store,
        entity: &Entity,
        caller: Option<&Caller>,
    ) -> Result<Document> {
        let owner = match caller {
            Some(caller) => is_owner(store, entity.id, caller.id).await?,
            None => false,
        };
        let signed_in = caller.is_some();

        let mut document = Document::new();
        document.insert(
            "request_data".into(),
            json!({
                "allowed_actions": {
                    "can_hide": signed_in,
                    "can_update": owner,
                    "can_delete": false,
                    "can_advertise": owner,
                    "can_report": signed_in,
                }
            }),
        );
        document.insert(
            "owner_count".into(),
            count(store, related(Model::Ownership, "place_id", entity.id)).await?,
        );
        document.insert(
            "advertisement_count".into(),
            count(store, related(Model::Advertisement, "place_id", entity.id)).await?,
        );
        document.insert("tags".into(), tag_names(store, ItemKind::Place, entity.id).await?);
        Ok(document)
    }
}
