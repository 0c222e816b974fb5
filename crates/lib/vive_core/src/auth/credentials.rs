//! Email + password verification.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use super::{AuthError, PasswordHasher};
use crate::models::auth::Principal;
use crate::store::UserStore;

/// Checks a presented email/password pair against the stored bcrypt hash.
///
/// Unknown emails and wrong passwords fail identically with
/// [`AuthError::InvalidCredentials`]. For unknown emails a hash comparison is
/// still performed against a throwaway hash so both paths cost the same.
pub struct CredentialVerifier {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    decoy_hash: OnceLock<String>,
}

impl CredentialVerifier {
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self {
            users,
            hasher,
            decoy_hash: OnceLock::new(),
        }
    }

    pub async fn verify(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            debug!("login attempt for unknown email");
            self.burn_decoy(password);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            debug!(user_id = user.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Principal::from(&user))
    }

    fn burn_decoy(&self, password: &str) {
        let decoy = self
            .decoy_hash
            .get_or_init(|| self.hasher.hash("decoy-password").unwrap_or_default());
        if !decoy.is_empty() {
            let _ = self.hasher.verify(password, decoy);
        }
    }
}
