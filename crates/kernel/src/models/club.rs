//! Club membership relations.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::query::{Entity, Predicate, QuerySet, Store};

use super::{Caller, Model};

/// A user's standing in a club.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    None,
    Member,
    Admin,
}

pub async fn membership_status(
    store: &dyn Store,
    club_id: i64,
    user_id: i64,
) -> Result<MembershipStatus> {
    let qs = QuerySet::new(Model::Membership)
        .filter(Predicate::eq("club_id", club_id))
        .filter(Predicate::eq("user_id", user_id));
    Ok(match store.first(&qs).await? {
        None => MembershipStatus::None,
        Some(row) if row.get_bool("is_admin") => MembershipStatus::Admin,
        Some(_) => MembershipStatus::Member,
    })
}

/// Members may post unless the club restricts posting to admins.
pub async fn can_post(store: &dyn Store, club: &Entity, caller: &Caller) -> Result<bool> {
    let status = membership_status(store, club.id, caller.id).await?;
    let open = club
        .get("post_policy")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(true);
    Ok(match status {
        MembershipStatus::Admin => true,
        MembershipStatus::Member => open,
        MembershipStatus::None => false,
    })
}

/// Clubs where `user_id` holds a membership with the given admin flag.
pub fn memberships_of(user_id: i64, is_admin: bool) -> Predicate {
    Predicate::in_subquery(
        "id",
        Model::Membership,
        "club_id",
        Predicate::eq("user_id", user_id).and(Predicate::eq("is_admin", is_admin)),
    )
}
