//! Caller identity and user-to-user relations.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::query::{Entity, Predicate, QuerySet, Store};

use super::Model;

/// The authenticated user a request runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: i64,
    pub username: String,
    pub is_superuser: bool,
}

impl Caller {
    /// Build from a user row. Inactive users are not callers.
    pub fn from_entity(entity: &Entity) -> Option<Self> {
        if entity.model != Model::User {
            return None;
        }
        let active = entity
            .get("is_active")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true);
        if !active {
            return None;
        }
        Some(Self {
            id: entity.id,
            username: entity.get_str("username").unwrap_or_default().to_string(),
            is_superuser: entity.get_bool("is_superuser"),
        })
    }

    /// Load an active user by id.
    pub async fn find_active(store: &dyn Store, id: i64) -> Result<Option<Self>> {
        let user = store.get(Model::User, id).await?;
        Ok(user.as_ref().and_then(Self::from_entity))
    }
}

/// Relationship between the caller and another user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[serde(rename = "self")]
    Me,
    NotConnected,
    RequestSent,
    RequestReceived,
    Connected,
}

/// Resolve how `caller` relates to the user `item_id`.
///
/// Looks for a connection row in either direction; the direction of an
/// unaccepted row decides between sent and received.
pub async fn connection_status(
    store: &dyn Store,
    item_id: i64,
    caller: &Caller,
) -> Result<ConnectionStatus> {
    if item_id == caller.id {
        return Ok(ConnectionStatus::Me);
    }

    let sent = QuerySet::new(Model::Connection)
        .filter(Predicate::eq("from_user_id", caller.id))
        .filter(Predicate::eq("to_user_id", item_id));
    if let Some(row) = store.first(&sent).await? {
        return Ok(if row.get_bool("is_accepted") {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::RequestSent
        });
    }

    let received = QuerySet::new(Model::Connection)
        .filter(Predicate::eq("from_user_id", item_id))
        .filter(Predicate::eq("to_user_id", caller.id));
    if let Some(row) = store.first(&received).await? {
        return Ok(if row.get_bool("is_accepted") {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::RequestReceived
        });
    }

    Ok(ConnectionStatus::NotConnected)
}

/// Whether `blocking` has blocked `blocked`.
pub async fn has_blocked(store: &dyn Store, blocking: i64, blocked: i64) -> Result<bool> {
    let qs = QuerySet::new(Model::Blocked)
        .filter(Predicate::eq("blocking_user_id", blocking))
        .filter(Predicate::eq("blocked_user_id", blocked));
    store.exists(&qs).await
}

/// Users with an accepted connection to `user_id`, in either direction.
pub fn connections_of(user_id: i64) -> Predicate {
    Predicate::in_subquery(
        "id",
        Model::Connection,
        "to_user_id",
        Predicate::eq("from_user_id", user_id).and(Predicate::eq("is_accepted", true)),
    )
    .or(Predicate::in_subquery(
        "id",
        Model::Connection,
        "from_user_id",
        Predicate::eq("to_user_id", user_id).and(Predicate::eq("is_accepted", true)),
    ))
}

/// Users who sent `user_id` a request that is still pending.
pub fn pending_requests_to(user_id: i64) -> Predicate {
    Predicate::in_subquery(
        "id",
        Model::Connection,
        "from_user_id",
        Predicate::eq("to_user_id", user_id).and(Predicate::eq("is_accepted", false)),
    )
}

/// Users `user_id` sent a request to that is still pending.
pub fn pending_requests_from(user_id: i64) -> Predicate {
    Predicate::in_subquery(
        "id",
        Model::Connection,
        "to_user_id",
        Predicate::eq("from_user_id", user_id).and(Predicate::eq("is_accepted", false)),
    )
}

/// Users blocked by `user_id`.
pub fn blocked_by(user_id: i64) -> Predicate {
    Predicate::in_subquery(
        "id",
        Model::Blocked,
        "blocked_user_id",
        Predicate::eq("blocking_user_id", user_id),
    )
}
