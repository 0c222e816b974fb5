//! Post handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tracing::info;
use vive_core::auth::assert_can_modify;
use vive_core::models::social::{NewPost, Post};
use vive_core::store::StoreError;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ApiResponse, PostRequest, PostResponse, SearchQuery};

fn responses(posts: Vec<Post>) -> Json<Vec<PostResponse>> {
    Json(posts.into_iter().map(Into::into).collect())
}

async fn load(state: &AppState, id: i64) -> AppResult<Post> {
    state
        .posts
        .find(id)
        .await?
        .ok_or_else(|| StoreError::not_found("Post", id).into())
}

/// `POST /api/user/{userId}/category/{categoryId}/posts`: the path user
/// must be the caller.
pub async fn create_post(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path((user_id, category_id)): Path<(i64, i64)>,
    Json(body): Json<PostRequest>,
) -> AppResult<(StatusCode, Json<PostResponse>)> {
    if caller.principal.user_id != user_id {
        return Err(AppError::Forbidden(
            "Posts can only be created for your own account".into(),
        ));
    }
    body.validate()?;
    if state.categories.find(category_id).await?.is_none() {
        return Err(StoreError::not_found("Category", category_id).into());
    }

    let post = state
        .posts
        .create(NewPost {
            title: body.post_title.trim().to_string(),
            content: body.content,
            category_id,
            user_id,
        })
        .await?;
    info!(post_id = post.id, user_id, "post created");
    Ok((StatusCode::CREATED, Json(post.into())))
}

pub async fn list_posts(State(state): State<AppState>) -> AppResult<Json<Vec<PostResponse>>> {
    Ok(responses(state.posts.list().await?))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PostResponse>> {
    Ok(Json(load(&state, id).await?.into()))
}

/// `GET /api/posts/search?keyword=`
pub async fn search_posts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<PostResponse>>> {
    Ok(responses(state.posts.search(query.keyword.trim()).await?))
}

pub async fn posts_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> AppResult<Json<Vec<PostResponse>>> {
    Ok(responses(state.posts.list_by_category(category_id).await?))
}

pub async fn posts_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<PostResponse>>> {
    Ok(responses(state.posts.list_by_user(user_id).await?))
}

/// `PUT /api/posts/{id}`: owner or admin.
pub async fn update_post(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<PostRequest>,
) -> AppResult<Json<PostResponse>> {
    let post = load(&state, id).await?;
    assert_can_modify(
        &caller.principal,
        post.user_id,
        "No tienes permisos para editar este post",
    )?;
    body.validate()?;
    let updated = state
        .posts
        .update(id, body.post_title.trim(), &body.content)
        .await?;
    Ok(Json(updated.into()))
}

/// `DELETE /api/posts/{id}`: owner or admin.
pub async fn delete_post(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse>> {
    let post = load(&state, id).await?;
    assert_can_modify(
        &caller.principal,
        post.user_id,
        "No tienes permisos para eliminar este post",
    )?;
    state.posts.delete(id).await?;
    info!(post_id = id, by = caller.principal.user_id, "post deleted");
    Ok(Json(ApiResponse::ok("Post is Deleted Successfully!")))
}
