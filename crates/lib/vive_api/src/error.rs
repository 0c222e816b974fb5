//! Application error types and their wire format.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};
use vive_core::auth::AuthError;
use vive_core::store::StoreError;

use crate::models::{ErrorResponse, MessageResponse};

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// No credentials where some were required.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Token expired: {0}")]
    TokenExpired(String),

    /// Malformed, revoked, mis-typed or mismatched token.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Login failure; serialised as `{"message":"Invalid credentials"}`.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Fatal startup configuration problem.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::InvalidCredentials => {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(MessageResponse::new("Invalid credentials")),
                )
                    .into_response();
            }
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "NOT_FOUND", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "CONFLICT", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", m.as_str()),
            AppError::TokenExpired(m) => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED", m.as_str()),
            AppError::InvalidToken(m) => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "FORBIDDEN", m.as_str()),
            AppError::Config(detail) | AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => AppError::NotFound(e.to_string()),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Db(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::TokenExpired => AppError::TokenExpired("Access token expired".into()),
            AuthError::MalformedToken(detail) => {
                debug!(%detail, "malformed token");
                AppError::InvalidToken("Invalid token".into())
            }
            AuthError::TokenRevoked => AppError::InvalidToken("Token has been revoked".into()),
            AuthError::SubjectMismatch | AuthError::WrongTokenType { .. } => {
                AppError::InvalidToken(e.to_string())
            }
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::Unauthenticated => {
                AppError::Unauthorized("Full authentication is required".into())
            }
            AuthError::AccessDenied(msg) | AuthError::InsufficientRole(msg) => {
                AppError::Forbidden(msg)
            }
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::Config(msg) => AppError::Config(msg),
            AuthError::Store(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
