//! User administration and profile handlers.

use axum::Json;
use axum::extract::{Path, State};
use tracing::info;
use vive_core::auth::assert_can_modify;
use vive_core::store::StoreError;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ApiResponse, UpdateUserRequest, UserResponse};

const UPDATE_DENIED: &str = "No tienes permisos para actualizar este usuario";
const DELETE_DENIED: &str = "No tienes permisos para eliminar este usuario";

/// `GET /api/users`: every user. ADMIN only (route policy).
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// `GET /api/users/{id}`
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| StoreError::not_found("User", id))?;
    Ok(Json(user.into()))
}

/// `PUT /api/users/{id}`: owner or admin. Only an admin may change roles.
pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let mut user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| StoreError::not_found("User", id))?;
    assert_can_modify(&caller.principal, user.id, UPDATE_DENIED)?;
    body.validate()?;

    if let Some(roles) = body.roles {
        if !caller.principal.is_admin() {
            return Err(AppError::Forbidden(
                "Only administrators can change roles".into(),
            ));
        }
        user.roles = roles.into_iter().collect();
    }
    if let Some(name) = body.name {
        user.name = name.trim().to_string();
    }
    if let Some(email) = body.email {
        user.email = email;
    }
    if let Some(about) = body.about {
        user.about = Some(about);
    }
    if let Some(password) = body.password {
        user.password_hash = state.auth.hasher().hash(&password)?;
    }

    let updated = state.users.update(&user).await?;
    info!(user_id = updated.id, by = caller.principal.user_id, "user updated");
    Ok(Json(updated.into()))
}

/// `DELETE /api/users/{id}`: ADMIN only (route policy).
pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse>> {
    assert_can_modify(&caller.principal, id, DELETE_DENIED)?;
    if !state.users.delete(id).await? {
        return Err(StoreError::not_found("User", id).into());
    }
    info!(user_id = id, by = caller.principal.user_id, "user deleted");
    Ok(Json(ApiResponse::ok("User deleted successfully")))
}
