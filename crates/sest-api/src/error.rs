use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use sest_codec::DecodeError;
use sest_core::{FieldReadError, IngestError};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or wrong write key, or an unknown channel. One status for all
    /// of them, and one message, so callers cannot probe channel ids.
    #[error("invalid or missing write key")]
    AuthFailed,

    #[error("{0}")]
    NotAcceptable(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidStoredValue(String),

    #[error("Schema inconsistency: {0}")]
    SchemaInconsistency(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Auth(_) => Self::AuthFailed,
            IngestError::Validation(e) => Self::NotAcceptable(e.to_string()),
            e @ IngestError::Parse { .. } => Self::NotAcceptable(e.to_string()),
            e @ IngestError::Store { .. } => Self::internal(e),
        }
    }
}

impl From<DecodeError> for ApiError {
    fn from(err: DecodeError) -> Self {
        if err.is_schema_error() {
            Self::SchemaInconsistency(err.to_string())
        } else {
            Self::InvalidStoredValue(err.to_string())
        }
    }
}

impl From<FieldReadError> for ApiError {
    fn from(err: FieldReadError) -> Self {
        match err {
            FieldReadError::Decode(e) => e.into(),
            e @ FieldReadError::Store(_) => Self::internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::AuthFailed => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotAcceptable(_) => (StatusCode::NOT_ACCEPTABLE, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::InvalidStoredValue(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            ApiError::SchemaInconsistency(_) => {
                error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ApiError::Internal(_) => {
                error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
