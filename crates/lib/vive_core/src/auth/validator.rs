//! Token validation: revocation, signature, expiry and subject checks.

use std::sync::Arc;

use chrono::Utc;

use super::{AuthError, RevocationRegistry, TokenCodec};
use crate::models::auth::{Principal, TokenClaims, TokenType};

/// Answers "can this token authenticate a request right now, and as whom".
#[derive(Debug, Clone)]
pub struct TokenValidator {
    codec: Arc<TokenCodec>,
    registry: Arc<RevocationRegistry>,
}

impl TokenValidator {
    pub fn new(codec: Arc<TokenCodec>, registry: Arc<RevocationRegistry>) -> Self {
        Self { codec, registry }
    }

    pub fn validate(
        &self,
        token: &str,
        expected_subject: Option<&str>,
    ) -> Result<Principal, AuthError> {
        self.validate_at(token, expected_subject, Utc::now().timestamp())
            .map(|claims| Principal::from(&claims))
    }

    /// Checks run in a fixed order: revocation first, so a revoked token is
    /// rejected before any of its contents are decoded.
    pub fn validate_at(
        &self,
        token: &str,
        expected_subject: Option<&str>,
        now: i64,
    ) -> Result<TokenClaims, AuthError> {
        if self.registry.is_revoked(token) {
            return Err(AuthError::TokenRevoked);
        }
        let claims = self.codec.decode_at(token, now)?;
        if let Some(expected) = expected_subject
            && claims.sub != expected
        {
            return Err(AuthError::SubjectMismatch);
        }
        Ok(claims)
    }

    /// Validate a bearer access token.
    pub fn validate_access(&self, token: &str) -> Result<Principal, AuthError> {
        self.validate_typed(token, TokenType::Access, None)
    }

    /// Validate a refresh token, optionally bound to an already-authenticated
    /// subject.
    pub fn validate_refresh(
        &self,
        token: &str,
        expected_subject: Option<&str>,
    ) -> Result<Principal, AuthError> {
        self.validate_typed(token, TokenType::Refresh, expected_subject)
    }

    fn validate_typed(
        &self,
        token: &str,
        expected: TokenType,
        expected_subject: Option<&str>,
    ) -> Result<Principal, AuthError> {
        let claims = self.validate_at(token, expected_subject, Utc::now().timestamp())?;
        if claims.typ != expected {
            return Err(AuthError::WrongTokenType { expected });
        }
        Ok(Principal::from(&claims))
    }

    pub fn registry(&self) -> &RevocationRegistry {
        &self.registry
    }
}
