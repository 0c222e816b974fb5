//! Password hashing via bcrypt.

use super::AuthError;

/// Production bcrypt cost factor.
pub const BCRYPT_COST: u32 = 12;

/// Bounds accepted by bcrypt itself.
const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// bcrypt hasher with a fixed cost.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: BCRYPT_COST }
    }
}

impl PasswordHasher {
    /// Costs below bcrypt's own minimum are raised to it. Deployments go
    /// through `ApiConfig`, which refuses anything under [`BCRYPT_COST`].
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_COST, MAX_COST),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
    }

    /// Verify a password against a bcrypt hash. bcrypt compares digests in
    /// constant time.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        bcrypt::verify(password, hash)
            .map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
    }
}
