//! Event hosting and attendance relations.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::query::{Entity, Predicate, QuerySet, Store};

use super::club::{MembershipStatus, membership_status};
use super::{Caller, Model};

/// A club-hosted event is run by the club's admins; otherwise by its host user.
pub async fn is_host(store: &dyn Store, event: &Entity, caller: &Caller) -> Result<bool> {
    if let Some(club_id) = event.get_i64("host_club_id") {
        let status = membership_status(store, club_id, caller.id).await?;
        return Ok(status == MembershipStatus::Admin);
    }
    Ok(event.get_i64("host_user_id") == Some(caller.id))
}

/// The caller's attendance row for an event, if any.
pub async fn attendance(store: &dyn Store, event_id: i64, user_id: i64) -> Result<Option<Entity>> {
    let qs = QuerySet::new(Model::Attendee)
        .filter(Predicate::eq("event_id", event_id))
        .filter(Predicate::eq("user_id", user_id));
    store.first(&qs).await
}

/// Whether the event still accepts attendees at `now`.
///
/// Events without a parseable end date are treated as closed.
pub fn is_open(event: &Entity, now: DateTime<Utc>) -> bool {
    event
        .get_str("end_date")
        .and_then(|end| DateTime::parse_from_rfc3339(end).ok())
        .is_some_and(|end| end.with_timezone(&Utc) > now)
}
