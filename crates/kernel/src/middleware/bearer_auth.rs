//! Bearer token caller resolution.
//!
//! Reads `Authorization: Bearer <token>`, verifies the HS256 JWT and loads
//! the active user named by its `sub` claim. A request without the header
//! is anonymous; a header that fails verification is rejected with 401.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::models::Caller;
use crate::state::AppState;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id.
    pub sub: String,
    /// Expiry (seconds since the epoch).
    pub exp: i64,
}

/// Mint an access token for `user_id`, valid for `ttl_secs`.
pub fn issue_token(secret: &str, user_id: i64, ttl_secs: i64) -> anyhow::Result<String> {
    let claims = TokenClaims {
        sub: user_id.to_string(),
        exp: Utc::now().timestamp() + ttl_secs,
    };
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

fn verify_token(token: &str, key: &DecodingKey) -> Option<i64> {
    let validation = Validation::new(Algorithm::HS256);
    let data = match jsonwebtoken::decode::<TokenClaims>(token, key, &validation) {
        Ok(data) => data,
        Err(e) => {
            debug!(error = %e, "invalid bearer token");
            return None;
        }
    };
    let Ok(user_id) = data.claims.sub.parse::<i64>() else {
        debug!(sub = %data.claims.sub, "invalid user ID in token");
        return None;
    };
    Some(user_id)
}

async fn resolve_caller(parts: &Parts, state: &AppState) -> Result<Option<Caller>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let user_id = verify_token(token, state.jwt_key()).ok_or(AppError::Unauthorized)?;

    match Caller::find_active(state.store(), user_id).await? {
        Some(caller) => Ok(Some(caller)),
        None => {
            debug!(user_id, "token names a missing or inactive user");
            Err(AppError::Unauthorized)
        }
    }
}

/// The caller, or `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct OptionalCaller(pub Option<Caller>);

impl FromRequestParts<AppState> for OptionalCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        resolve_caller(parts, state).await.map(OptionalCaller)
    }
}

/// An authenticated caller; anonymous requests are rejected with 401.
#[derive(Debug, Clone)]
pub struct RequiredCaller(pub Caller);

impl FromRequestParts<AppState> for RequiredCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        resolve_caller(parts, state)
            .await?
            .map(RequiredCaller)
            .ok_or(AppError::Unauthorized)
    }
}
