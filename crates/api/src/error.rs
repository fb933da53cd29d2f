//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use goodshelf_domain::DomainError;
use goodshelf_storage::StoreError;

/// Errors leaving a handler, rendered as `{"error": "..."}` JSON.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// No valid session cookie on a route that needs one.
    #[error("authentication required")]
    Unauthenticated,

    /// The request body or parameters could not be interpreted.
    #[error("{0}")]
    BadRequest(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain(err) => match err {
                DomainError::BadCredentials => StatusCode::UNAUTHORIZED,
                DomainError::AccountDisabled { .. } => StatusCode::FORBIDDEN,
                DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
                DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DomainError::Storage(err) if err.is_not_found() => StatusCode::NOT_FOUND,
                DomainError::Storage(err) if err.is_conflict() => StatusCode::CONFLICT,
                DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = ?self, "request failed");
            // Do not leak backend details to the client.
            return (status, Json(json!({ "error": "internal error" }))).into_response();
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
