//! Category handlers. Reads are public; writes are ADMIN only.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use vive_core::models::social::NewCategory;
use vive_core::store::StoreError;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{ApiResponse, CategoryRequest, CategoryResponse};

impl From<CategoryRequest> for NewCategory {
    fn from(req: CategoryRequest) -> Self {
        NewCategory {
            title: req.category_title.trim().to_string(),
            description: req.category_description.trim().to_string(),
        }
    }
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CategoryResponse>>> {
    let categories = state.categories.list().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<CategoryResponse>> {
    let category = state
        .categories
        .find(id)
        .await?
        .ok_or_else(|| StoreError::not_found("Category", id))?;
    Ok(Json(category.into()))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CategoryRequest>,
) -> AppResult<(StatusCode, Json<CategoryResponse>)> {
    body.validate()?;
    let category = state.categories.create(body.into()).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CategoryRequest>,
) -> AppResult<Json<CategoryResponse>> {
    body.validate()?;
    let category = state.categories.update(id, body.into()).await?;
    Ok(Json(category.into()))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse>> {
    if !state.categories.delete(id).await? {
        return Err(StoreError::not_found("Category", id).into());
    }
    Ok(Json(ApiResponse::ok("Category Deleted Successfully!")))
}
