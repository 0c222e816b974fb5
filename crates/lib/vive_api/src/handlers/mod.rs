//! Request handlers.

pub mod auth;
pub mod categories;
pub mod comments;
pub mod health;
pub mod posts;
pub mod saved_posts;
pub mod users;

use crate::error::AppError;

/// Fallback for unrouted paths. Reached only after the gate has let the
/// request through.
pub async fn not_found() -> AppError {
    AppError::NotFound("No handler for this path".into())
}
