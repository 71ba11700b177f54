//! Error Types for the Relay API
//!
//! Management-endpoint failures are serialized as JSON with an error
//! code and a matching HTTP status. The public endpoint does not use
//! these: it renders the engine's typed proxy payloads directly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use relay_core::error::RelayError;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for management API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request contains invalid input data
    InvalidInput,

    /// Form validation failed
    ValidationFailed,

    /// Requested query does not exist
    QueryNotFound,

    /// A concurrent write won; re-read and retry
    Conflict,

    /// Unexpected internal failure
    InternalError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput | ErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorCode::QueryNotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// API ERROR
// ============================================================================

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn query_not_found(id: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::QueryNotFound, format!("No query with id {id}"))
    }

    pub fn conflict() -> Self {
        Self::new(
            ErrorCode::Conflict,
            "The query was modified concurrently; reload and retry",
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Validation(e) => ApiError::validation(e.to_string()),
            RelayError::Config(e) => ApiError::internal_error(e.to_string()),
            other => ApiError::internal_error(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        (status, Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Tests
// ============================================================================
