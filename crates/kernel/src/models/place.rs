//! Place ownership relations.

use anyhow::Result;

use crate::query::{Predicate, QuerySet, Store};

use super::Model;

pub async fn is_owner(store: &dyn Store, place_id: i64, user_id: i64) -> Result<bool> {
    let qs = QuerySet::new(Model::Ownership)
        .filter(Predicate::eq("place_id", place_id))
        .filter(Predicate::eq("user_id", user_id));
    store.exists(&qs).await
}
