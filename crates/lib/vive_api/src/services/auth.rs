//! Authentication service: login, register, refresh and logout flows over
//! `vive_core::auth`.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use vive_core::auth::{
    CredentialVerifier, PasswordHasher, RevocationRegistry, TokenCodec, TokenValidator,
};
use vive_core::models::auth::{NewUser, Principal, Role};
use vive_core::store::UserStore;

use crate::error::{AppError, AppResult};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest};

/// Emails in this domain are registered as administrators.
const ADMIN_EMAIL_DOMAIN: &str = "@admin.com";

/// Roles granted at registration, decided by email domain.
pub fn roles_for_email(email: &str) -> BTreeSet<Role> {
    if email.to_ascii_lowercase().ends_with(ADMIN_EMAIL_DOMAIN) {
        BTreeSet::from([Role::Admin])
    } else {
        BTreeSet::from([Role::User])
    }
}

/// Owns the codec, revocation registry and credential verifier for the
/// process.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    codec: Arc<TokenCodec>,
    validator: TokenValidator,
    verifier: CredentialVerifier,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, codec: TokenCodec, hasher: PasswordHasher) -> Self {
        let codec = Arc::new(codec);
        let validator = TokenValidator::new(codec.clone(), Arc::new(RevocationRegistry::new()));
        let verifier = CredentialVerifier::new(users.clone(), hasher);
        Self {
            users,
            codec,
            validator,
            verifier,
            hasher,
        }
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Authenticate with email + password and issue a token pair.
    pub async fn login(&self, req: &LoginRequest) -> AppResult<AuthResponse> {
        let principal = self.verifier.verify(&req.email, &req.password).await?;
        info!(user_id = principal.user_id, "user logged in");
        self.issue_pair("Login successful", &principal)
    }

    /// Create an account and authenticate it immediately.
    pub async fn register(&self, req: RegisterRequest) -> AppResult<AuthResponse> {
        req.validate()?;

        let roles = roles_for_email(&req.email);
        let password_hash = self.hasher.hash(&req.password)?;
        let user = self
            .users
            .create(NewUser {
                name: req.name.trim().to_string(),
                email: req.email,
                password_hash,
                about: req.about,
                roles,
            })
            .await?;

        info!(user_id = user.id, admin = user.roles.contains(&Role::Admin), "user registered");
        self.issue_pair("User created", &Principal::from(&user))
    }

    /// Exchange a refresh token for a new access token. When the caller is
    /// also authenticated, both tokens must name the same subject.
    ///
    /// The new token carries the user's current roles. A refresh token whose
    /// user has since been deleted or replaced is rejected.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        current: Option<&Principal>,
    ) -> AppResult<AuthResponse> {
        let expected = current.map(|p| p.subject.as_str());
        let claimed = self.validator.validate_refresh(refresh_token, expected)?;
        let user = match self.users.find_by_email(&claimed.subject).await? {
            Some(user) if user.id == claimed.user_id => user,
            _ => {
                warn!(user_id = claimed.user_id, "refresh for unknown user");
                return Err(AppError::InvalidToken("Invalid token".into()));
            }
        };
        let token = self.codec.access_token(&Principal::from(&user))?;
        Ok(AuthResponse {
            message: "Token refreshed".into(),
            token: Some(token),
            refresh_token: None,
        })
    }

    /// Revoke the caller's access token and, if given, a refresh token. A
    /// refresh token that does not belong to the caller is left alone.
    pub fn logout(&self, caller: &Principal, access_token: &str, refresh_token: Option<&str>) {
        let registry = self.validator.registry();
        registry.revoke(access_token);
        if let Some(refresh) = refresh_token.filter(|t| !t.is_empty()) {
            match self.validator.validate_refresh(refresh, Some(&caller.subject)) {
                Ok(_) => registry.revoke(refresh),
                Err(e) => debug!(error = %e, "not revoking refresh token"),
            }
        }
        info!(revoked = registry.len(), "user logged out");
    }

    fn issue_pair(&self, message: &str, principal: &Principal) -> AppResult<AuthResponse> {
        Ok(AuthResponse {
            message: message.into(),
            token: Some(self.codec.access_token(principal)?),
            refresh_token: Some(self.codec.refresh_token(principal)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use vive_core::auth::AuthError;
    use vive_core::models::auth::TokenType;
    use vive_core::store::MemoryStore;

    use super::*;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryStore::new()),
            TokenCodec::new(&[5u8; 32]).unwrap(),
            PasswordHasher::new(4),
        )
    }

    fn alice() -> RegisterRequest {
        RegisterRequest {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password: "Secret1!".into(),
            about: None,
        }
    }

    #[test]
    fn admin_domain_assignment() {
        assert_eq!(roles_for_email("boss@admin.com"), BTreeSet::from([Role::Admin]));
        assert_eq!(roles_for_email("Boss@Admin.com"), BTreeSet::from([Role::Admin]));
        assert_eq!(roles_for_email("alice@example.com"), BTreeSet::from([Role::User]));
        assert_eq!(roles_for_email("eve@notadmin.com.co"), BTreeSet::from([Role::User]));
    }

    #[tokio::test]
    async fn register_then_login() {
        let svc = service();
        let created = svc.register(alice()).await.unwrap();
        assert_eq!(created.message, "User created");
        let claims = svc.codec().decode(created.token.as_deref().unwrap()).unwrap();
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.typ, TokenType::Access);

        let logged_in = svc
            .login(&LoginRequest {
                email: "alice@example.com".into(),
                password: "Secret1!".into(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.message, "Login successful");
        assert!(logged_in.refresh_token.is_some());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let svc = service();
        svc.register(alice()).await.unwrap();
        match svc.register(alice()).await {
            Err(AppError::Conflict(msg)) => {
                assert_eq!(msg, "User with email 'alice@example.com' already exists.")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_requires_refresh_token_of_same_subject() {
        let svc = service();
        let pair = svc.register(alice()).await.unwrap();
        let refresh = pair.refresh_token.unwrap();
        let access = pair.token.unwrap();

        let renewed = svc.refresh(&refresh, None).await.unwrap();
        assert!(renewed.token.is_some());
        assert!(renewed.refresh_token.is_none());

        assert!(matches!(
            svc.refresh(&access, None).await,
            Err(AppError::InvalidToken(_))
        ));

        let eve = Principal::new("eve@example.com", 99, [Role::User]);
        assert!(matches!(
            svc.refresh(&refresh, Some(&eve)).await,
            Err(AppError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn logout_revokes_both_tokens() {
        let svc = service();
        let pair = svc.register(alice()).await.unwrap();
        let access = pair.token.unwrap();
        let refresh = pair.refresh_token.unwrap();

        let alice = svc.validator().validate_access(&access).unwrap();
        svc.logout(&alice, &access, Some(&refresh));
        assert!(matches!(
            svc.validator().validate_access(&access),
            Err(AuthError::TokenRevoked)
        ));
        assert!(matches!(
            svc.refresh(&refresh, None).await,
            Err(AppError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn logout_ignores_someone_elses_refresh_token() {
        let svc = service();
        let alice = svc.register(alice()).await.unwrap();
        let bob = svc
            .register(RegisterRequest {
                name: "Bob".into(),
                email: "bob@example.com".into(),
                password: "Secret1!".into(),
                about: None,
            })
            .await
            .unwrap();
        let bob_access = bob.token.unwrap();
        let bob_principal = svc.validator().validate_access(&bob_access).unwrap();

        let alice_refresh = alice.refresh_token.unwrap();
        svc.logout(&bob_principal, &bob_access, Some(&alice_refresh));
        assert!(svc.refresh(&alice_refresh, None).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_reads_current_roles_from_the_store() {
        let users = Arc::new(MemoryStore::new());
        let svc = AuthService::new(
            users.clone(),
            TokenCodec::new(&[5u8; 32]).unwrap(),
            PasswordHasher::new(4),
        );
        let pair = svc.register(alice()).await.unwrap();
        let refresh = pair.refresh_token.unwrap();

        let mut stored = users.find_by_email("alice@example.com").await.unwrap().unwrap();
        stored.roles = BTreeSet::from([Role::User, Role::Admin]);
        UserStore::update(users.as_ref(), &stored).await.unwrap();
        let renewed = svc.refresh(&refresh, None).await.unwrap();
        let claims = svc.codec().decode(&renewed.token.unwrap()).unwrap();
        assert!(claims.roles.contains(&Role::Admin));

        UserStore::delete(users.as_ref(), stored.id).await.unwrap();
        assert!(matches!(
            svc.refresh(&refresh, None).await,
            Err(AppError::InvalidToken(_))
        ));
    }
}
