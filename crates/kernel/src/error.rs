//! Application error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::filter::{BindError, ConfigError, FilterError};
use crate::pagination::{PageError, PaginateError};

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("Object not found!")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("Insufficient privilege")]
    Forbidden,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid value for {field}")]
    Validation { field: String, detail: String },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let detail = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                None
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                None
            }
            AppError::Validation { field, detail } => Some(json!({
                "field": field,
                "detail": detail,
            })),
            _ => None,
        };

        let body = json!({
            "error": {
                "code": status.as_u16(),
                "message": self.to_string(),
                "detail": detail,
            }
        });

        (status, Json(body)).into_response()
    }
}

impl From<BindError> for AppError {
    fn from(e: BindError) -> Self {
        AppError::Validation {
            field: e.field.clone(),
            detail: e.to_string(),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Internal(e.into())
    }
}

impl From<FilterError> for AppError {
    fn from(e: FilterError) -> Self {
        match e {
            FilterError::Bind(bind) => bind.into(),
            FilterError::CallerRequired { .. } => AppError::Unauthorized,
            other @ FilterError::MissingAnnotation { .. } => AppError::Internal(other.into()),
        }
    }
}

impl From<PageError> for AppError {
    fn from(e: PageError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<PaginateError> for AppError {
    fn from(e: PaginateError) -> Self {
        match e {
            PaginateError::Page(page) => page.into(),
            PaginateError::Store(store) => AppError::Internal(store),
        }
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_errors_map_to_statuses() {
        let bind = BindError {
            field: "page".into(),
            expected: "an integer",
            value: "x".into(),
        };
        assert_eq!(AppError::from(bind).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            AppError::from(PageError::InvalidPage(0)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(FilterError::CallerRequired {
                function: "me".into()
            })
            .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(PaginateError::Store(anyhow::anyhow!("gone"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_are_not_reported() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused on 5432"));
        assert_eq!(err.to_string(), "internal server error");
    }
}
