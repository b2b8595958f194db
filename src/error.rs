//! Error types for the entity services
//!
//! Provides unified error handling using thiserror. Every variant maps to a
//! distinct HTTP status so callers can tell the failure kinds apart.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::store::StoreError;

// == Service Error Enum ==
/// Typed outcome of a failed service operation.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Entity (or a referenced entity) does not exist
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness or ownership constraint violated
    #[error("{0}")]
    Conflict(String),

    /// Malformed input, rejected before touching the store or cache
    #[error("{0}")]
    Validation(String),

    /// Unexpected store failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(msg) | StoreError::ForeignKeyViolation(msg) => {
                ServiceError::Conflict(msg)
            }
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

// == Extractor Rejections ==
impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ServiceError {
    fn from(rejection: PathRejection) -> Self {
        ServiceError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        ServiceError::Validation(rejection.body_text())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the entity services.
pub type Result<T> = std::result::Result<T, ServiceError>;
