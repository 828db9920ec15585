// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::db::{FieldPathError, StoreError};
use crate::models::DateKeyError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

/// Application error type that converts to HTTP responses.
///
/// Absent documents are not errors: reads return `Ok(None)`. `NotFound` is
/// only raised when a write targets a user that does not exist.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Update failed: {0}")]
    UpdateFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Shared so that a failed live query can hand the same error to every
    /// observer.
    #[error("Internal server error: {0:#}")]
    Internal(Arc<anyhow::Error>),
}

impl AppError {
    /// Map a store failure on a read path.
    pub fn from_read(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            other @ (StoreError::AlreadyExists(_) | StoreError::Serialization(_)) => {
                anyhow::Error::new(other)
                    .context("Unexpected store response on read")
                    .into()
            }
        }
    }

    /// Map a store failure on a write path.
    pub fn from_write(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::UpdateFailed(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(Arc::new(err))
    }
}

impl From<DateKeyError> for AppError {
    fn from(err: DateKeyError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<FieldPathError> for AppError {
    fn from(err: FieldPathError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::StoreUnavailable(msg) => {
                tracing::warn!(error = %msg, "Store unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", None)
            }
            AppError::UpdateFailed(msg) => {
                tracing::error!(error = %msg, "Update failed");
                (StatusCode::BAD_GATEWAY, "update_failed", None)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Internal(err) => {
                let chain = format!("{:#}", err);
                tracing::error!(error = %chain, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
