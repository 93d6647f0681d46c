//! Club and place listing and detail.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppResult;
use crate::middleware::OptionalCaller;
use crate::models::ItemKind;
use crate::pagination::PageResponse;
use crate::serialize::{Document, ClubSerializer, PlaceSerializer};
use crate::state::AppState;

use super::helpers;

async fn list_clubs(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<PageResponse>> {
    helpers::list(&state, &state.filters().clubs, &ClubSerializer, &raw, caller.as_ref()).await
}

async fn read_club(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    Path(id): Path<i64>,
) -> AppResult<Json<Document>> {
    helpers::detail(&state, ItemKind::Club, id, caller.as_ref()).await
}

async fn list_places(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<PageResponse>> {
    helpers::list(&state, &state.filters().places, &PlaceSerializer, &raw, caller.as_ref()).await
}

async fn read_place(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    Path(id): Path<i64>,
) -> AppResult<Json<Document>> {
    helpers::detail(&state, ItemKind::Place, id, caller.as_ref()).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/clubs", get(list_clubs))
        .route("/api/clubs/{id}", get(read_club))
        .route("/api/places", get(list_places))
        .route("/api/places/{id}", get(read_place))
}
