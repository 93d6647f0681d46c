//! User listing, detail and caller-scoped user collections.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppResult;
use crate::middleware::{OptionalCaller, RequiredCaller};
use crate::models::user::{blocked_by, pending_requests_from, pending_requests_to};
use crate::models::{ItemKind, Model};
use crate::pagination::PageResponse;
use crate::query::QuerySet;
use crate::serialize::{Document, HideSerializer, ReportSerializer, UserSerializer};
use crate::state::AppState;

use super::helpers;

async fn list_users(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<PageResponse>> {
    helpers::list(&state, &state.filters().users, &UserSerializer, &raw, caller.as_ref()).await
}

async fn read_user(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    Path(id): Path<i64>,
) -> AppResult<Json<Document>> {
    helpers::detail(&state, ItemKind::User, id, caller.as_ref()).await
}

async fn my_hides(
    State(state): State<AppState>,
    RequiredCaller(caller): RequiredCaller,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<PageResponse>> {
    helpers::list(&state, &state.filters().hides, &HideSerializer, &raw, Some(&caller)).await
}

async fn my_reports(
    State(state): State<AppState>,
    RequiredCaller(caller): RequiredCaller,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<PageResponse>> {
    helpers::list(&state, &state.filters().reports, &ReportSerializer, &raw, Some(&caller)).await
}

async fn my_blocked(
    State(state): State<AppState>,
    RequiredCaller(caller): RequiredCaller,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<PageResponse>> {
    let queryset = QuerySet::new(Model::User).filter(blocked_by(caller.id));
    helpers::list_queryset(&state, queryset, &UserSerializer, &raw, Some(&caller)).await
}

async fn my_received_requests(
    State(state): State<AppState>,
    RequiredCaller(caller): RequiredCaller,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<PageResponse>> {
    let queryset = QuerySet::new(Model::User).filter(pending_requests_to(caller.id));
    helpers::list_queryset(&state, queryset, &UserSerializer, &raw, Some(&caller)).await
}

async fn my_sent_requests(
    State(state): State<AppState>,
    RequiredCaller(caller): RequiredCaller,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<PageResponse>> {
    let queryset = QuerySet::new(Model::User).filter(pending_requests_from(caller.id));
    helpers::list_queryset(&state, queryset, &UserSerializer, &raw, Some(&caller)).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/{id}", get(read_user))
        .route("/api/users/me/hides", get(my_hides))
        .route("/api/users/me/reports", get(my_reports))
        .route("/api/users/me/blocked", get(my_blocked))
        .route("/api/users/me/connections/received", get(my_received_requests))
        .route("/api/users/me/connections/sent", get(my_sent_requests))
}
