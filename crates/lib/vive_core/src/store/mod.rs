//! Persistence collaborators.
//!
//! The auth core only needs [`UserStore::find_by_email`]; the remaining
//! operations back the thin CRUD handlers in `vive_api`. Two implementations
//! are provided: [`memory::MemoryStore`] and [`postgres::PgStore`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::auth::{NewUser, User};
use crate::models::social::{Category, Comment, NewCategory, NewComment, NewPost, Post};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn create(&self, user: NewUser) -> StoreResult<User>;
    /// Replaces every mutable field of the stored user with `user`'s.
    async fn update(&self, user: &User) -> StoreResult<User>;
    /// Returns `false` when no such user existed.
    async fn delete(&self, id: i64) -> StoreResult<bool>;
    async fn list(&self) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn find(&self, id: i64) -> StoreResult<Option<Category>>;
    async fn create(&self, category: NewCategory) -> StoreResult<Category>;
    async fn update(&self, id: i64, category: NewCategory) -> StoreResult<Category>;
    async fn delete(&self, id: i64) -> StoreResult<bool>;
    async fn list(&self) -> StoreResult<Vec<Category>>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn find(&self, id: i64) -> StoreResult<Option<Post>>;
    async fn create(&self, post: NewPost) -> StoreResult<Post>;
    async fn update(&self, id: i64, title: &str, content: &str) -> StoreResult<Post>;
    async fn delete(&self, id: i64) -> StoreResult<bool>;
    async fn list(&self) -> StoreResult<Vec<Post>>;
    async fn list_by_category(&self, category_id: i64) -> StoreResult<Vec<Post>>;
    async fn list_by_user(&self, user_id: i64) -> StoreResult<Vec<Post>>;
    /// Case-insensitive match on title.
    async fn search(&self, keyword: &str) -> StoreResult<Vec<Post>>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn find(&self, id: i64) -> StoreResult<Option<Comment>>;
    async fn create(&self, comment: NewComment) -> StoreResult<Comment>;
    async fn update_content(&self, id: i64, content: &str) -> StoreResult<Comment>;
    /// Deletes the comment and, transitively, its replies.
    async fn delete(&self, id: i64) -> StoreResult<bool>;
    /// Every comment of a post, replies included, oldest first.
    async fn list_by_post(&self, post_id: i64) -> StoreResult<Vec<Comment>>;
}

/// Posts a user has bookmarked.
#[async_trait]
pub trait SavedPostStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the post is already saved.
    async fn save(&self, user_id: i64, post_id: i64) -> StoreResult<()>;
    /// Returns `false` when the post was not saved.
    async fn unsave(&self, user_id: i64, post_id: i64) -> StoreResult<bool>;
    async fn is_saved(&self, user_id: i64, post_id: i64) -> StoreResult<bool>;
    /// Saved posts, in the order they were saved.
    async fn saved_by_user(&self, user_id: i64) -> StoreResult<Vec<Post>>;
}
