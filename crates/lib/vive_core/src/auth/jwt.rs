//! JWT token generation and verification.

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::{Rng, rng};
use tracing::info;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{Principal, TokenClaims, TokenType};

/// Access token lifetime: 30 minutes.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 30 * 60;

/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Tolerated clock drift between issuer and validator.
pub const CLOCK_SKEW_SECS: i64 = 60;

/// Minimum HMAC key length in bytes.
pub const MIN_KEY_BYTES: usize = 32;

/// HS256 signer/verifier over a single process-wide key.
///
/// Expiry is checked here rather than by `jsonwebtoken` so the reference time
/// can be injected and expired tokens are reported separately from malformed
/// ones.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec from raw key bytes. Keys shorter than 32 bytes are
    /// rejected with [`AuthError::Config`].
    pub fn new(key: &[u8]) -> Result<Self, AuthError> {
        if key.len() < MIN_KEY_BYTES {
            return Err(AuthError::Config(format!(
                "Invalid JWT secret key. Must be at least {MIN_KEY_BYTES} bytes long (got {}).",
                key.len()
            )));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);
        Ok(Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
        })
    }

    /// Build a codec from a base64-encoded key.
    pub fn from_base64(secret: &str) -> Result<Self, AuthError> {
        let key = STANDARD
            .decode(secret.trim())
            .map_err(|e| AuthError::Config(format!("JWT secret is not valid base64: {e}")))?;
        Self::new(&key)
    }

    /// Sign a token for `principal` valid for `ttl_secs` from now.
    pub fn encode(
        &self,
        principal: &Principal,
        typ: TokenType,
        ttl_secs: i64,
    ) -> Result<String, AuthError> {
        self.encode_at(principal, typ, ttl_secs, Utc::now().timestamp())
    }

    /// Sign a token as if issued at unix time `now`.
    pub fn encode_at(
        &self,
        principal: &Principal,
        typ: TokenType,
        ttl_secs: i64,
        now: i64,
    ) -> Result<String, AuthError> {
        let claims = TokenClaims {
            sub: principal.subject.clone(),
            iat: now,
            exp: now + ttl_secs,
            user_id: principal.user_id,
            roles: principal.roles.iter().copied().collect(),
            typ,
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    pub fn access_token(&self, principal: &Principal) -> Result<String, AuthError> {
        self.encode(principal, TokenType::Access, ACCESS_TOKEN_TTL_SECS)
    }

    pub fn refresh_token(&self, principal: &Principal) -> Result<String, AuthError> {
        self.encode(principal, TokenType::Refresh, REFRESH_TOKEN_TTL_SECS)
    }

    /// Verify signature, shape and expiry against the wall clock.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.decode_at(token, Utc::now().timestamp())
    }

    /// Verify signature, shape and expiry against unix time `now`.
    ///
    /// Expired iff `now > exp + 60`; a token issued more than 60 seconds in
    /// the future is malformed.
    pub fn decode_at(&self, token: &str, now: i64) -> Result<TokenClaims, AuthError> {
        let claims = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::MalformedToken(e.to_string()),
            })?
            .claims;

        if claims.iat > now + CLOCK_SKEW_SECS {
            return Err(AuthError::MalformedToken(
                "token issued in the future".into(),
            ));
        }
        if now > claims.exp + CLOCK_SKEW_SECS {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }
}

/// Resolve the JWT secret: env var `JWT_SECRET` → persisted file → generated.
///
/// Generated secrets are 32 random bytes, base64-encoded.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let mut key = [0u8; MIN_KEY_BYTES];
    rng().fill(&mut key);
    let secret = STANDARD.encode(key);
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vivemedellin")
        .join("jwt-secret")
}
