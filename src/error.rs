// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::borrow::Cow;

/// Failures in the authentication path.
///
/// These never reach the caller verbatim. `From<AuthError> for AppError`
/// collapses them into a small set of generic responses so a client cannot
/// tell an expired token from a forged one, or a deleted account from a
/// malformed header.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("provider code exchange failed: {0}")]
    ProviderExchange(String),

    #[error("provider profile fetch failed: {0}")]
    ProviderProfile(String),

    #[error("token expired")]
    TokenExpired,

    #[error("token invalid")]
    TokenInvalid,

    #[error("missing or malformed bearer credential")]
    MissingCredential,

    #[error("principal no longer exists")]
    PrincipalNotFound,

    #[error("auth configuration error: {0}")]
    Configuration(String),
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub const GOAL_NOT_FOUND: &'static str = "Goal not found";
    pub const MILESTONE_NOT_FOUND: &'static str = "Milestone not found";

    /// Ownership-filtered miss on a goal.
    pub fn goal_not_found() -> Self {
        AppError::NotFound(Self::GOAL_NOT_FOUND.to_string())
    }

    /// Miss on a milestone inside a goal the caller owns.
    pub fn milestone_not_found() -> Self {
        AppError::NotFound(Self::MILESTONE_NOT_FOUND.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::ProviderExchange(ref reason) | AuthError::ProviderProfile(ref reason) => {
                tracing::warn!(error = %err, reason = %reason, "Identity provider failure");
                AppError::AuthenticationFailed
            }
            AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::MissingCredential
            | AuthError::PrincipalNotFound => {
                tracing::debug!(reason = %err, "Rejected unauthenticated request");
                AppError::Unauthorized
            }
            AuthError::Configuration(msg) => AppError::Configuration(msg),
        }
    }
}

/// Request bodies that fail to deserialize get the same JSON envelope as
/// every other error. Well-formed JSON of the wrong shape (missing field, bad
/// enum value, wrong type) counts as a validation failure.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                let mut errors = validator::ValidationErrors::new();
                errors.add(
                    "body",
                    validator::ValidationError::new("invalid_body")
                        .with_message(Cow::Owned(err.body_text())),
                );
                AppError::Validation(errors)
            }
            other => AppError::BadRequest(other.body_text()),
        }
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
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::AuthenticationFailed => {
                (StatusCode::UNAUTHORIZED, "authentication_failed", None)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_failed",
                Some(errors.to_string()),
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Configuration(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
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
