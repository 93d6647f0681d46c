//! Post and comment listing and detail.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppResult;
use crate::middleware::OptionalCaller;
use crate::models::ItemKind;
use crate::pagination::PageResponse;
use crate::serialize::{Document, CommentSerializer, PostSerializer};
use crate::state::AppState;

use super::helpers;

async fn list_posts(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<PageResponse>> {
    helpers::list(&state, &state.filters().posts, &PostSerializer, &raw, caller.as_ref()).await
}

async fn read_post(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    Path(id): Path<i64>,
) -> AppResult<Json<Document>> {
    helpers::detail(&state, ItemKind::Post, id, caller.as_ref()).await
}

async fn list_comments(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<PageResponse>> {
    helpers::list(&state, &state.filters().comments, &CommentSerializer, &raw, caller.as_ref())
        .await
}

async fn read_comment(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    Path(id): Path<i64>,
) -> AppResult<Json<Document>> {
    helpers::detail(&state, ItemKind::Comment, id, caller.as_ref()).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts))
        .route("/api/posts/{id}", get(read_post))
        .route("/api/comments", get(list_comments))
        .route("/api/comments/{id}", get(read_comment))
}
