//! Posts, categories and comments.

use chrono::{DateTime, Utc};

/// Event category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub description: String,
}

/// Category fields supplied on creation or update.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub title: String,
    pub description: String,
}

/// Event post. `user_id` is the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category_id: i64,
    pub user_id: i64,
}

/// Comment on a post. Replies point at their parent via `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
}
