#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]
//! Common test utilities for integration tests.
//!
//! Tests run the real pipeline against a seeded [`MemoryStore`]; HTTP
//! tests drive the real router through [`TestApp`].

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value as JsonValue;
use tower::ServiceExt;

use commons_kernel::filter::{FilterRegistry, FilterSet};
use commons_kernel::middleware::issue_token;
use commons_kernel::models::{Caller, Model};
use commons_kernel::pagination::{PageRequest, PageResponse, Paginator};
use commons_kernel::query::{MemoryStore, Store};
use commons_kernel::routes;
use commons_kernel::serialize::Serializer;
use commons_kernel::state::AppState;
use commons_test_utils::test_user;

pub const JWT_SECRET: &str = "integration-test-secret";

pub fn insert(store: &MemoryStore, model: Model, row: JsonValue) -> i64 {
    store.insert(model, row).expect("failed to insert fixture")
}

/// Insert a user and return it as a caller.
pub fn add_user(store: &MemoryStore, username: &str) -> Caller {
    let id = insert(store, Model::User, test_user(username).to_row());
    Caller {
        id,
        username: username.to_string(),
        is_superuser: false,
    }
}

pub fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Bind, resolve and paginate through one filter set.
pub async fn list(
    store: &dyn Store,
    set: &FilterSet,
    serializer: &dyn Serializer,
    query: &[(&str, &str)],
    page: PageRequest,
    caller: Option<&Caller>,
) -> PageResponse {
    let request = set.bind(&raw(query)).unwrap();
    let prepared = set.resolve(&request, caller).unwrap();
    Paginator::new(store)
        .paginate(&page, prepared, serializer, caller)
        .await
        .unwrap()
}

/// Every matching id, in page order, read as one large page.
pub async fn ids(
    store: &dyn Store,
    set: &FilterSet,
    serializer: &dyn Serializer,
    query: &[(&str, &str)],
    caller: Option<&Caller>,
) -> Vec<i64> {
    list(store, set, serializer, query, PageRequest::new(1, 100), caller)
        .await
        .results
        .iter()
        .map(|doc| doc["id"].as_i64().unwrap())
        .collect()
}

pub fn registry() -> FilterRegistry {
    FilterRegistry::build().expect("filter sets must be consistent")
}

/// The router over a seeded store.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    router: Router,
}

impl TestApp {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        let state = AppState::with_store(store.clone(), registry(), JWT_SECRET);
        let router = routes::router().with_state(state);
        Self { store, router }
    }

    /// GET `uri`, optionally authenticated as `user_id`.
    pub async fn get(&self, uri: &str, user_id: Option<i64>) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder().uri(uri);
        if let Some(id) = user_id {
            let token = issue_token(JWT_SECRET, id, 3600).unwrap();
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, JsonValue) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
        };
        (status, body)
    }
}
