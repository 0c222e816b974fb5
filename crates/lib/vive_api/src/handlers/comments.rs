//! Comment and reply handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::info;
use vive_core::auth::assert_can_modify;
use vive_core::models::social::{Comment, NewComment};
use vive_core::store::StoreError;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ApiResponse, CommentRequest, CommentResponse};

const EDIT_DENIED: &str = "No tienes permisos para editar este comentario";
const DELETE_DENIED: &str = "No tienes permisos para eliminar este comentario";

async fn load(state: &AppState, id: i64) -> AppResult<Comment> {
    state
        .comments
        .find(id)
        .await?
        .ok_or_else(|| StoreError::not_found("Comment", id).into())
}

/// Comment `id` with its full reply tree.
async fn with_replies(state: &AppState, comment: Comment) -> AppResult<CommentResponse> {
    let thread = state.comments.list_by_post(comment.post_id).await?;
    let id = comment.id;
    let mut node = CommentResponse::from(comment);
    node.replies = CommentResponse::thread(&thread, Some(id));
    Ok(node)
}

/// `POST /api/posts/{postId}/comments`
pub async fn add_comment(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(post_id): Path<i64>,
    Json(body): Json<CommentRequest>,
) -> AppResult<(StatusCode, Json<CommentResponse>)> {
    body.validate()?;
    if state.posts.find(post_id).await?.is_none() {
        return Err(StoreError::not_found("Post", post_id).into());
    }
    let comment = state
        .comments
        .create(NewComment {
            content: body.content,
            post_id,
            user_id: caller.principal.user_id,
            parent_id: None,
        })
        .await?;
    info!(comment_id = comment.id, post_id, "comment added");
    Ok((StatusCode::CREATED, Json(comment.into())))
}

/// `POST /api/comments/{commentId}/replies`
pub async fn add_reply(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(parent_id): Path<i64>,
    Json(body): Json<CommentRequest>,
) -> AppResult<(StatusCode, Json<CommentResponse>)> {
    body.validate()?;
    let parent = load(&state, parent_id).await?;
    let reply = state
        .comments
        .create(NewComment {
            content: body.content,
            post_id: parent.post_id,
            user_id: caller.principal.user_id,
            parent_id: Some(parent.id),
        })
        .await?;
    info!(comment_id = reply.id, parent_id, "reply added");
    Ok((StatusCode::CREATED, Json(reply.into())))
}

/// `GET /api/posts/{postId}/comments`: top-level comments with nested
/// replies.
pub async fn comments_by_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Json<Vec<CommentResponse>>> {
    if state.posts.find(post_id).await?.is_none() {
        return Err(StoreError::not_found("Post", post_id).into());
    }
    let all = state.comments.list_by_post(post_id).await?;
    Ok(Json(CommentResponse::thread(&all, None)))
}

/// `GET /api/comments/{commentId}`
pub async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<CommentResponse>> {
    let comment = load(&state, id).await?;
    Ok(Json(with_replies(&state, comment).await?))
}

/// `PUT /api/comments/{commentId}`: author or admin.
pub async fn update_comment(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<CommentRequest>,
) -> AppResult<Json<CommentResponse>> {
    let comment = load(&state, id).await?;
    assert_can_modify(&caller.principal, comment.user_id, EDIT_DENIED)?;
    body.validate()?;
    let updated = state.comments.update_content(id, body.content.trim()).await?;
    Ok(Json(with_replies(&state, updated).await?))
}

/// `DELETE /api/comments/{commentId}`: author or admin. Replies go with it.
pub async fn delete_comment(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse>> {
    let comment = load(&state, id).await?;
    assert_can_modify(&caller.principal, comment.user_id, DELETE_DENIED)?;
    if !state.comments.delete(id).await? {
        return Err(AppError::NotFound(format!("Comment not found: {id}")));
    }
    info!(comment_id = id, by = caller.principal.user_id, "comment deleted");
    Ok(Json(ApiResponse::ok("Comment deleted Successfully")))
}
