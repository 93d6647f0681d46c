#![allow(clippy::unwrap_used, clippy::expect_used)]
//! HTTP surface driven through the real router.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Duration;

use commons_kernel::models::Model;
use commons_kernel::query::MemoryStore;
use commons_test_utils::{block, connection, hide, report, test_event, test_post, test_user};

use common::{TestApp, add_user, insert};

fn app_with_posts(n: usize) -> (TestApp, i64) {
    let store = Arc::new(MemoryStore::new());
    let ada = add_user(&store, "ada");
    for i in 0..n {
        insert(&store, Model::Post, test_post(ada.id, &format!("post {i}")).to_row());
    }
    (TestApp::new(store), ada.id)
}

#[tokio::test]
async fn health_reports_the_store() {
    let (app, _) = app_with_posts(0);
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn list_returns_the_page_envelope() {
    let (app, _) = app_with_posts(25);

    let (status, body) = app.get("/api/posts?page=1&page_size=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 25);
    assert_eq!(body["has_next"], true);
    assert_eq!(body["results"].as_array().unwrap().len(), 10);

    let (_, body) = app.get("/api/posts?page=3&page_size=10", None).await;
    assert_eq!(body["has_next"], false);
    assert_eq!(body["results"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn invalid_page_is_a_client_error() {
    let (app, _) = app_with_posts(3);

    let (status, body) = app.get("/api/posts?page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);

    let (status, _) = app.get("/api/posts?page_size=1000", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_parameter_names_the_field() {
    let (app, _) = app_with_posts(3);

    let (status, body) = app.get("/api/posts?creator=someone", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["detail"]["field"], "creator");
}

#[tokio::test]
async fn unknown_parameters_are_ignored() {
    let (app, _) = app_with_posts(3);
    let (status, body) = app.get("/api/posts?flavour=mint", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn detail_and_missing_detail() {
    let (app, ada) = app_with_posts(1);

    let (status, body) = app.get(&format!("/api/users/{ada}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ada");
    assert!(body.get("password_hash").is_none());

    let (status, body) = app.get("/api/posts/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Object not found!");
}

#[tokio::test]
async fn caller_shapes_list_documents() {
    let store = Arc::new(MemoryStore::new());
    let ada = add_user(&store, "ada");
    let bob = add_user(&store, "bob");
    let event = insert(
        &store,
        Model::Event,
        test_event(ada.id, "meetup", Duration::days(1)).to_row(),
    );
    let app = TestApp::new(store);

    let (_, anonymous) = app.get("/api/events", None).await;
    let (_, signed_in) = app.get("/api/events", Some(bob.id)).await;

    assert_eq!(anonymous["results"][0]["id"], event);
    assert_eq!(
        anonymous["results"][0]["request_data"]["allowed_actions"]["can_attend"],
        false
    );
    assert_eq!(
        signed_in["results"][0]["request_data"]["allowed_actions"]["can_attend"],
        true
    );
}

#[tokio::test]
async fn hidden_mode_over_http() {
    let store = Arc::new(MemoryStore::new());
    let ada = add_user(&store, "ada");
    let x = insert(&store, Model::Post, test_post(ada.id, "x").to_row());
    insert(&store, Model::Post, test_post(ada.id, "y").to_row());
    insert(&store, Model::Hide, hide(ada.id, "Post", x));
    let app = TestApp::new(store);

    let (_, regular) = app.get("/api/posts", Some(ada.id)).await;
    assert_eq!(regular["count"], 1);

    let (_, hidden) = app.get("/api/posts?mode=hidden", Some(ada.id)).await;
    assert_eq!(hidden["count"], 1);
    assert_eq!(hidden["results"][0]["id"], x);

    let (_, all) = app.get("/api/posts?mode=all", Some(ada.id)).await;
    assert_eq!(all["count"], 2);
}

#[tokio::test]
async fn bad_tokens_are_rejected() {
    let (app, _) = app_with_posts(1);

    let request = Request::builder()
        .uri("/api/posts")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/posts")
        .header(header::AUTHORIZATION, "Basic YWRhOnB3")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn inactive_users_cannot_authenticate() {
    let store = Arc::new(MemoryStore::new());
    let ghost = insert(&store, Model::User, test_user("ghost").inactive().to_row());
    let app = TestApp::new(store);

    let (status, _) = app.get("/api/posts", Some(ghost)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn caller_scoped_lists_require_a_caller() {
    let (app, _) = app_with_posts(0);
    for path in [
        "/api/users/me/hides",
        "/api/users/me/reports",
        "/api/users/me/blocked",
        "/api/users/me/connections/received",
        "/api/users/me/connections/sent",
    ] {
        let (status, _) = app.get(path, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
async fn caller_scoped_lists() {
    let store = Arc::new(MemoryStore::new());
    let ada = add_user(&store, "ada");
    let bob = add_user(&store, "bob");
    let cyd = add_user(&store, "cyd");
    let dee = add_user(&store, "dee");
    let post = insert(&store, Model::Post, test_post(bob.id, "x").to_row());
    insert(&store, Model::Hide, hide(ada.id, "Post", post));
    insert(&store, Model::Report, report(ada.id, "Post", post, "spam"));
    insert(&store, Model::Report, report(bob.id, "Post", post, "spam"));
    insert(&store, Model::Blocked, block(ada.id, dee.id));
    insert(&store, Model::Connection, connection(bob.id, ada.id, false));
    insert(&store, Model::Connection, connection(ada.id, cyd.id, false));
    let app = TestApp::new(store);

    let (_, hides) = app.get("/api/users/me/hides", Some(ada.id)).await;
    assert_eq!(hides["count"], 1);
    assert_eq!(hides["results"][0]["item"]["id"], post);

    let (_, reports) = app.get("/api/users/me/reports", Some(ada.id)).await;
    assert_eq!(reports["count"], 1);

    let (_, blocked) = app.get("/api/users/me/blocked", Some(ada.id)).await;
    assert_eq!(blocked["results"][0]["username"], "dee");
    assert_eq!(blocked["results"][0]["is_blocked"], true);

    let (_, received) = app.get("/api/users/me/connections/received", Some(ada.id)).await;
    assert_eq!(received["results"][0]["username"], "bob");
    assert_eq!(received["results"][0]["connection"], "request_received");

    let (_, sent) = app.get("/api/users/me/connections/sent", Some(ada.id)).await;
    assert_eq!(sent["results"][0]["username"], "cyd");
    assert_eq!(sent["results"][0]["connection"], "request_sent");
}
