//! Event listing and detail.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppResult;
use crate::middleware::OptionalCaller;
use crate::models::ItemKind;
use crate::pagination::PageResponse;
use crate::serialize::{Document, EventSerializer};
use crate::state::AppState;

use super::helpers;

async fn list_events(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<PageResponse>> {
    helpers::list(&state, &state.filters().events, &EventSerializer, &raw, caller.as_ref()).await
}

async fn read_event(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    Path(id): Path<i64>,
) -> AppResult<Json<Document>> {
    helpers::detail(&state, ItemKind::Event, id, caller.as_ref()).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events))
        .route("/api/events/{id}", get(read_event))
}
