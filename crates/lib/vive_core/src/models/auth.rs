//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! shapes in `vive_api::models`.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Platform role.
///
/// Serialised as `"USER"` / `"ADMIN"`. The legacy `ROLE_`-prefixed spelling is
/// accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "USER", alias = "ROLE_USER")]
    User,
    #[serde(rename = "ADMIN", alias = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches("ROLE_") {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Kind of bearer token, carried in the `typ` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Access => f.write_str("access"),
            TokenType::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT claims embedded in access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user email.
    pub sub: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Numeric user id.
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub roles: Vec<Role>,
    pub typ: TokenType,
    /// Unique token id.
    pub jti: String,
}

/// The authenticated identity attached to a request.
///
/// Rebuilt from token claims on every request; never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject: String,
    pub user_id: i64,
    pub roles: BTreeSet<Role>,
}

impl Principal {
    pub fn new(subject: impl Into<String>, user_id: i64, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            subject: subject.into(),
            user_id,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.has_role(*r))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

impl From<&TokenClaims> for Principal {
    fn from(claims: &TokenClaims) -> Self {
        Principal::new(claims.sub.clone(), claims.user_id, claims.roles.iter().copied())
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Principal::new(user.email.clone(), user.id, user.roles.iter().copied())
    }
}

/// Stored user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub about: Option<String>,
    pub roles: BTreeSet<Role>,
}

/// User fields supplied on creation; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub about: Option<String>,
    pub roles: BTreeSet<Role>,
}
