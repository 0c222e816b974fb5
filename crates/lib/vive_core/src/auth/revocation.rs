//! Revoked-token registry.
//!
//! Process-local and unbounded: entries are never removed and are lost on
//! restart. Exposure after a restart is bounded by the access token lifetime.

use dashmap::DashSet;

/// Concurrent set of revoked token strings.
///
/// Inserts are visible to every subsequent lookup, so a logout is observed by
/// the very next request carrying the same token.
#[derive(Debug, Default)]
pub struct RevocationRegistry {
    revoked: DashSet<String>,
}

impl RevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `token` as unusable. Idempotent.
    pub fn revoke(&self, token: &str) {
        self.revoked.insert(token.to_string());
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.revoked.contains(token)
    }

    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }
}
