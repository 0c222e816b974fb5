//! Ownership guard for data-dependent authorization.

use super::AuthError;
use crate::models::auth::Principal;

/// Succeeds iff `principal` owns the resource or is an admin. `denied` is the
/// message reported to the client on failure.
pub fn assert_can_modify(
    principal: &Principal,
    owner_user_id: i64,
    denied: &str,
) -> Result<(), AuthError> {
    if principal.user_id == owner_user_id || principal.is_admin() {
        Ok(())
    } else {
        Err(AuthError::AccessDenied(denied.to_string()))
    }
}
