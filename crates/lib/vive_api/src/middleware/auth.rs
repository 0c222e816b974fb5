//! Authentication gate: bearer extraction, token validation and the route
//! policy, run once per request before routing.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;
use vive_core::models::auth::Principal;

use crate::AppState;
use crate::error::AppError;

/// Identity attached to a request that presented a valid access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub principal: Principal,
    /// The raw bearer token, needed to revoke it on logout.
    pub token: String,
}

/// Token text of an `Authorization: Bearer <token>` header. Any other
/// header shape is treated as absent.
fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Axum middleware wrapping every route.
///
/// Without a bearer token the request continues anonymously. A token that
/// fails validation ends the request with 401 before any identity is
/// attached. The route policy then decides whether the (possibly anonymous)
/// caller may proceed.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = match bearer_token(&request) {
        None => None,
        Some(token) => match state.auth.validator().validate_access(token) {
            Ok(principal) => Some(AuthenticatedUser {
                principal,
                token: token.to_string(),
            }),
            Err(e) => {
                debug!(error = %e, path = %request.uri().path(), "bearer token rejected");
                return AppError::from(e).into_response();
            }
        },
    };

    if let Err(e) = state.policy.check(
        request.method(),
        request.uri().path(),
        identity.as_ref().map(|id| &id.principal),
    ) {
        debug!(
            error = %e,
            method = %request.method(),
            path = %request.uri().path(),
            "request denied by route policy"
        );
        return AppError::from(e).into_response();
    }

    if let Some(identity) = identity {
        request.extensions_mut().insert(identity);
    }
    next.run(request).await
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Full authentication is required".into()))
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for AuthenticatedUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthenticatedUser>().cloned())
    }
}
