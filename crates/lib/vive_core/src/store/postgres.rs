//! PostgreSQL-backed store.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;

use super::{
    CategoryStore, CommentStore, PostStore, SavedPostStore, StoreError, StoreResult, UserStore,
};
use crate::models::auth::{NewUser, Role, User};
use crate::models::social::{Category, Comment, NewCategory, NewComment, NewPost, Post};

type UserRow = (i64, String, String, String, Option<String>, Vec<String>);
type PostRow = (i64, String, String, i64, i64, DateTime<Utc>);
type CommentRow = (
    i64,
    String,
    i64,
    i64,
    Option<i64>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

const USER_COLUMNS: &str = "id, user_name, email, password_hash, about, roles";
const POST_COLUMNS: &str = "id, title, content, category_id, user_id, created_at";
const COMMENT_COLUMNS: &str =
    "id, content, post_id, user_id, parent_comment_id, created_at, edited_at";

/// Store over a PostgreSQL pool. Run [`crate::migrate::migrate`] first.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_roles(raw: Vec<String>) -> BTreeSet<Role> {
    raw.into_iter()
        .filter_map(|r| match r.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                warn!(error = %e, "ignoring stored role");
                None
            }
        })
        .collect()
}

fn role_names(roles: &BTreeSet<Role>) -> Vec<String> {
    roles.iter().map(|r| r.as_str().to_string()).collect()
}

fn user_from_row((id, name, email, password_hash, about, roles): UserRow) -> User {
    User {
        id,
        name,
        email,
        password_hash,
        about,
        roles: parse_roles(roles),
    }
}

fn post_from_row((id, title, content, category_id, user_id, created_at): PostRow) -> Post {
    Post {
        id,
        title,
        content,
        category_id,
        user_id,
        created_at,
    }
}

fn comment_from_row(
    (id, content, post_id, user_id, parent_id, created_at, edited_at): CommentRow,
) -> Comment {
    Comment {
        id,
        content,
        post_id,
        user_id,
        parent_id,
        created_at,
        edited_at,
    }
}

/// Map unique violations on `users.email` to a conflict.
fn email_conflict(e: sqlx::Error, email: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("User with email '{email}' already exists."))
        }
        _ => StoreError::Db(e),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(user_from_row))
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(user_from_row))
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (user_name, email, password_hash, about, roles) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.about)
        .bind(role_names(&user.roles))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| email_conflict(e, &user.email))?;
        Ok(user_from_row(row))
    }

    async fn update(&self, user: &User) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET user_name = $2, email = $3, password_hash = $4, about = $5, roles = $6 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.about)
        .bind(role_names(&user.roles))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| email_conflict(e, &user.email))?;
        row.map(user_from_row)
            .ok_or_else(|| StoreError::not_found("User", user.id))
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(user_from_row).collect())
    }
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn find(&self, id: i64) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT id, title, description FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, title, description)| Category {
            id,
            title,
            description,
        }))
    }

    async fn create(&self, category: NewCategory) -> StoreResult<Category> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO categories (title, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(&category.title)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(Category {
            id,
            title: category.title,
            description: category.description,
        })
    }

    async fn update(&self, id: i64, category: NewCategory) -> StoreResult<Category> {
        let result =
            sqlx::query("UPDATE categories SET title = $2, description = $3 WHERE id = $1")
                .bind(id)
                .bind(&category.title)
                .bind(&category.description)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Category", id));
        }
        Ok(Category {
            id,
            title: category.title,
            description: category.description,
        })
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT id, title, description FROM categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, title, description)| Category {
                id,
                title,
                description,
            })
            .collect())
    }
}

impl PgStore {
    async fn posts_by_id_column(&self, column: &str, value: i64) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE {column} = $1 ORDER BY id"
        ))
        .bind(value)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(post_from_row).collect())
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn find(&self, id: i64) -> StoreResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(post_from_row))
    }

    async fn create(&self, post: NewPost) -> StoreResult<Post> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts (title, content, category_id, user_id) \
             VALUES ($1, $2, $3, $4) RETURNING {POST_COLUMNS}"
        ))
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.category_id)
        .bind(post.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(post_from_row(row))
    }

    async fn update(&self, id: i64, title: &str, content: &str) -> StoreResult<Post> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "UPDATE posts SET title = $2, content = $3 WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;
        row.map(post_from_row)
            .ok_or_else(|| StoreError::not_found("Post", id))
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(post_from_row).collect())
    }

    async fn list_by_category(&self, category_id: i64) -> StoreResult<Vec<Post>> {
        self.posts_by_id_column("category_id", category_id).await
    }

    async fn list_by_user(&self, user_id: i64) -> StoreResult<Vec<Post>> {
        self.posts_by_id_column("user_id", user_id).await
    }

    async fn search(&self, keyword: &str) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE title ILIKE $1 ORDER BY id"
        ))
        .bind(format!("%{keyword}%"))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(post_from_row).collect())
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn find(&self, id: i64) -> StoreResult<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(comment_from_row))
    }

    async fn create(&self, comment: NewComment) -> StoreResult<Comment> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "INSERT INTO comments (content, post_id, user_id, parent_comment_id) \
             VALUES ($1, $2, $3, $4) RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(&comment.content)
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(comment.parent_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment_from_row(row))
    }

    async fn update_content(&self, id: i64, content: &str) -> StoreResult<Comment> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "UPDATE comments SET content = $2, edited_at = now() WHERE id = $1 \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;
        row.map(comment_from_row)
            .ok_or_else(|| StoreError::not_found("Comment", id))
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_post(&self, post_id: i64) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 ORDER BY id"
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(comment_from_row).collect())
    }
}

#[async_trait]
impl SavedPostStore for PgStore {
    async fn save(&self, user_id: i64, post_id: i64) -> StoreResult<()> {
        sqlx::query("INSERT INTO saved_posts (user_id, post_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StoreError::Conflict("Post already saved".into())
                }
                _ => StoreError::Db(e),
            })?;
        Ok(())
    }

    async fn unsave(&self, user_id: i64, post_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM saved_posts WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_saved(&self, user_id: i64, post_id: i64) -> StoreResult<bool> {
        let saved = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM saved_posts WHERE user_id = $1 AND post_id = $2)",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn saved_by_user(&self, user_id: i64) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            "SELECT p.id, p.title, p.content, p.category_id, p.user_id, p.created_at \
             FROM saved_posts s JOIN posts p ON p.id = s.post_id \
             WHERE s.user_id = $1 ORDER BY s.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(post_from_row).collect())
    }
}
