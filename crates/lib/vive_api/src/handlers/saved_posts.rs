//! Saved-post handlers. Saves always belong to the caller.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::info;
use vive_core::auth::assert_can_modify;
use vive_core::models::auth::User;
use vive_core::store::StoreError;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ApiResponse, PostResponse};

const VIEW_DENIED: &str = "No tienes permisos para ver los posts guardados de este usuario";

/// The caller's stored account. A token can outlive its user.
async fn account(state: &AppState, caller: &AuthenticatedUser) -> AppResult<User> {
    let id = caller.principal.user_id;
    state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| StoreError::not_found("User", id).into())
}

async fn ensure_post(state: &AppState, post_id: i64) -> AppResult<()> {
    match state.posts.find(post_id).await? {
        Some(_) => Ok(()),
        None => Err(StoreError::not_found("Post", post_id).into()),
    }
}

async fn saved_posts(state: &AppState, user_id: i64) -> AppResult<Json<Vec<PostResponse>>> {
    let posts = state.saved_posts.saved_by_user(user_id).await?;
    Ok(Json(posts.into_iter().map(Into::into).collect()))
}

/// `POST /api/saved-posts/{postId}`
pub async fn save_post(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(post_id): Path<i64>,
) -> AppResult<(StatusCode, Json<ApiResponse>)> {
    ensure_post(&state, post_id).await?;
    let user = account(&state, &caller).await?;
    state.saved_posts.save(user.id, post_id).await?;
    info!(user_id = user.id, post_id, "post saved");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Post saved successfully")),
    ))
}

/// `DELETE /api/saved-posts/{postId}`
pub async fn unsave_post(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(post_id): Path<i64>,
) -> AppResult<Json<ApiResponse>> {
    ensure_post(&state, post_id).await?;
    let user = account(&state, &caller).await?;
    if !state.saved_posts.unsave(user.id, post_id).await? {
        return Err(StoreError::not_found("SavedPost", post_id).into());
    }
    Ok(Json(ApiResponse::ok("Post unsaved successfully")))
}

/// `GET /api/saved-posts`
pub async fn my_saved_posts(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
) -> AppResult<Json<Vec<PostResponse>>> {
    let user = account(&state, &caller).await?;
    saved_posts(&state, user.id).await
}

/// `GET /api/saved-posts/user/{userId}`: owner or admin.
pub async fn saved_posts_by_user(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<PostResponse>>> {
    assert_can_modify(&caller.principal, user_id, VIEW_DENIED)?;
    if state.users.find_by_id(user_id).await?.is_none() {
        return Err(StoreError::not_found("User", user_id).into());
    }
    saved_posts(&state, user_id).await
}

/// `GET /api/saved-posts/user/email/{email}`: owner or admin.
pub async fn saved_posts_by_email(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(email): Path<String>,
) -> AppResult<Json<Vec<PostResponse>>> {
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| StoreError::not_found("User", &email))?;
    assert_can_modify(&caller.principal, user.id, VIEW_DENIED)?;
    saved_posts(&state, user.id).await
}

/// `GET /api/saved-posts/{postId}/check`
pub async fn is_post_saved(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(post_id): Path<i64>,
) -> AppResult<Json<bool>> {
    ensure_post(&state, post_id).await?;
    let user = account(&state, &caller).await?;
    Ok(Json(state.saved_posts.is_saved(user.id, post_id).await?))
}
