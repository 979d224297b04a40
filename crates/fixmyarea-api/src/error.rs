//! Error to HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fixmyarea_core::error::FixMyAreaError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] FixMyAreaError),

    /// Malformed request body, query or path.
    #[error("{0}")]
    BadRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// `"dog record"` -> `"Dog record"`.
fn capitalize(entity: &str) -> String {
    let mut chars = entity.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        let err = match self {
            ApiError::BadRequest(message) => return (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Domain(err) => err,
        };
        match err {
            FixMyAreaError::Validation { .. }
            | FixMyAreaError::AlreadyExists { .. }
            | FixMyAreaError::OtpRejected(_) => (StatusCode::BAD_REQUEST, err.to_string()),
            FixMyAreaError::AuthenticationFailed { .. } => {
                (StatusCode::UNAUTHORIZED, err.to_string())
            }
            FixMyAreaError::AuthorizationDenied { .. } => (StatusCode::FORBIDDEN, err.to_string()),
            FixMyAreaError::NotFound { entity, .. } => (
                StatusCode::NOT_FOUND,
                format!("{} not found", capitalize(entity)),
            ),
            FixMyAreaError::NotRegistered { .. } => (StatusCode::NOT_FOUND, err.to_string()),
            FixMyAreaError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, err.to_string()),
            FixMyAreaError::Conflict { .. } => (StatusCode::CONFLICT, err.to_string()),
            FixMyAreaError::Database(_)
            | FixMyAreaError::Crypto(_)
            | FixMyAreaError::Internal(_) => {
                error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let body = Json(json!({
            "success": false,
            "message": message,
        }));
        (status, body).into_response()
    }
}
