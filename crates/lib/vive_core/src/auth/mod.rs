//! Authentication and authorization core.
//!
//! Token codec, revocation registry, credential verification, token
//! validation, the declarative route policy and the ownership guard. The HTTP
//! gate that drives these lives in `vive_api::middleware::auth`.

pub mod credentials;
pub mod jwt;
pub mod ownership;
pub mod password;
pub mod policy;
pub mod revocation;
pub mod validator;

use thiserror::Error;

use crate::store::StoreError;

pub use credentials::CredentialVerifier;
pub use jwt::TokenCodec;
pub use ownership::assert_can_modify;
pub use password::PasswordHasher;
pub use policy::{AccessPolicy, Requirement};
pub use revocation::RevocationRegistry;
pub use validator::TokenValidator;

/// Authentication and authorization errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Access token expired")]
    TokenExpired,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Token subject does not match the authenticated user")]
    SubjectMismatch,

    #[error("Expected a {expected} token")]
    WrongTokenType { expected: crate::models::auth::TokenType },

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A route requires a principal and none was presented.
    #[error("Authentication required")]
    Unauthenticated,

    /// Ownership check failed; carries the user-facing message.
    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    InsufficientRole(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}
