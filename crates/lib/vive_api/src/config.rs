//! API server configuration.

use vive_core::auth::jwt::resolve_jwt_secret;
use vive_core::auth::password::BCRYPT_COST;

use crate::error::AppError;

/// Origins allowed by CORS when `CORS_ALLOWED_ORIGINS` is unset.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:8080",
    "https://vivemedellin-backend.onrender.com",
    "https://frontend-vivamedellin.vercel.app",
];

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Base64-encoded HMAC signing key.
    pub jwt_secret: String,
    /// bcrypt cost factor for new password hashes.
    pub bcrypt_cost: u32,
    pub cors_allowed_origins: Vec<String>,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable               | Default                        |
    /// |------------------------|--------------------------------|
    /// | `BIND_ADDR`            | `127.0.0.1:8080`               |
    /// | `DATABASE_URL`         | unset (in-memory store)        |
    /// | `JWT_SECRET`           | generated & persisted to file  |
    /// | `BCRYPT_COST`          | `12`                           |
    /// | `CORS_ALLOWED_ORIGINS` | [`DEFAULT_CORS_ORIGINS`]       |
    pub fn from_env() -> Result<Self, AppError> {
        let bcrypt_cost = match std::env::var("BCRYPT_COST") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("BCRYPT_COST is not a number: {raw}")))?,
            Err(_) => BCRYPT_COST,
        };
        let cors_allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Err(_) => DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };
        let config = Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into()),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            jwt_secret: resolve_jwt_secret(),
            bcrypt_cost,
            cors_allowed_origins,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would weaken password storage.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.bcrypt_cost < BCRYPT_COST {
            return Err(AppError::Config(format!(
                "BCRYPT_COST must be at least {BCRYPT_COST} (got {})",
                self.bcrypt_cost
            )));
        }
        Ok(())
    }
}
