//! HTTP route handlers.

pub mod events;
pub mod health;
pub mod helpers;
pub mod organisations;
pub mod posts;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Every route, without middleware layers.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(users::router())
        .merge(posts::router())
        .merge(events::router())
        .merge(organisations::router())
}
