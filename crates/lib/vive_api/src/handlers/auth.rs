//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{AuthResponse, LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest};

/// `POST /api/users/register`: create an account and return a token pair.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let resp = state.auth.register(body).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// `POST /api/users/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let resp = state.auth.login(&body).await?;
    Ok(Json(resp))
}

/// `POST /api/users/refresh-token`: exchange a refresh token for a new
/// access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    caller: Option<AuthenticatedUser>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let resp = state
        .auth
        .refresh(&body.refresh_token, caller.as_ref().map(|c| &c.principal))
        .await?;
    Ok(Json(resp))
}

/// `POST /api/users/logout`: revoke the caller's access token and an
/// optional refresh token from the body.
pub async fn logout_handler(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    body: Option<Json<LogoutRequest>>,
) -> &'static str {
    let refresh = body.as_ref().and_then(|Json(b)| b.refresh_token.as_deref());
    state.auth.logout(&caller.principal, &caller.token, refresh);
    "Logged out successfully"
}
