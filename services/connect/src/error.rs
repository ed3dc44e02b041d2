//! Error type returned by the HTTP handlers

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{providers::UnknownProvider, session::SessionError};

#[derive(Error, Debug)]
pub enum ApiError {
    /// No valid session
    #[error("Unauthorized")]
    Unauthenticated,

    /// Session present but acting for another user
    #[error("Forbidden")]
    Forbidden,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A provider or the webhook failed
    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    InternalServerError,
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Unauthenticated => ApiError::Unauthenticated,
            SessionError::Forbidden { .. } => ApiError::Forbidden,
        }
    }
}

impl From<UnknownProvider> for ApiError {
    fn from(error: UnknownProvider) -> Self {
        ApiError::NotFound(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Session does not match the requested user".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
