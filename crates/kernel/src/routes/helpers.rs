//! Shared handler plumbing: page parsing, list and detail responses.

use std::collections::HashMap;

use axum::Json;

use crate::error::{AppError, AppResult};
use crate::filter::{FilterSet, ParamKind};
use crate::models::{Caller, ItemKind, Model};
use crate::pagination::{PageMode, PageRequest, PageResponse, Paginator};
use crate::query::{Entity, QuerySet, Store};
use crate::serialize::{Document, Serializer, serializer_for};
use crate::state::AppState;

const PAGE_KEY: &str = "page";
const PAGE_SIZE_KEY: &str = "page_size";
const PAGE_MODE_KEY: &str = "page_mode";

/// Fetch one row or fail with 404.
pub async fn get_object_or_404(store: &dyn Store, model: Model, id: i64) -> AppResult<Entity> {
    store.get(model, id).await?.ok_or(AppError::NotFound)
}

/// Fail with 403 unless the capability check passed.
pub fn has_permission(allowed: bool) -> AppResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Read `page`, `page_size` and `page_mode` from the query string.
///
/// Absent keys take their defaults; malformed ones are rejected. Range
/// checks are left to [`PageRequest::validate`].
pub fn page_request(raw: &HashMap<String, String>) -> AppResult<PageRequest> {
    let mut request = PageRequest::default();

    if let Some(value) = raw.get(PAGE_KEY)
        && let Some(page) = ParamKind::Int.bind(PAGE_KEY, value)?.and_then(|v| v.as_i64())
    {
        request.page = page;
    }
    if let Some(value) = raw.get(PAGE_SIZE_KEY)
        && let Some(size) = ParamKind::Int.bind(PAGE_SIZE_KEY, value)?.and_then(|v| v.as_i64())
    {
        request.page_size = size;
    }
    if let Some(value) = raw.get(PAGE_MODE_KEY) {
        request.page_mode = match value.trim() {
            "" | "normal" => PageMode::Normal,
            "random" => PageMode::Random,
            other => {
                return Err(AppError::Validation {
                    field: PAGE_MODE_KEY.to_string(),
                    detail: format!("expected normal or random, got {other:?}"),
                });
            }
        };
    }

    request.validate()?;
    Ok(request)
}

/// Bind, resolve and paginate one filter set.
pub async fn list(
    state: &AppState,
    set: &FilterSet,
    serializer: &dyn Serializer,
    raw: &HashMap<String, String>,
    caller: Option<&Caller>,
) -> AppResult<Json<PageResponse>> {
    let page = page_request(raw)?;
    let request = set.bind(raw)?;
    let prepared = set.resolve(&request, caller)?;

    let response = Paginator::new(state.store())
        .paginate(&page, prepared, serializer, caller)
        .await?;
    Ok(Json(response))
}

/// Paginate a fixed queryset that has no filter set of its own.
pub async fn list_queryset(
    state: &AppState,
    queryset: QuerySet,
    serializer: &dyn Serializer,
    raw: &HashMap<String, String>,
    caller: Option<&Caller>,
) -> AppResult<Json<PageResponse>> {
    let page = page_request(raw)?;
    let response = Paginator::new(state.store())
        .paginate(&page, (queryset, Vec::new()), serializer, caller)
        .await?;
    Ok(Json(response))
}

/// Serialize one item for the caller.
pub async fn detail(
    state: &AppState,
    kind: ItemKind,
    id: i64,
    caller: Option<&Caller>,
) -> AppResult<Json<Document>> {
    let entity = get_object_or_404(state.store(), kind.model(), id).await?;
    let document = serializer_for(kind)
        .serialize(state.store(), &entity, caller, &[])
        .await?;
    Ok(Json(document))
}
