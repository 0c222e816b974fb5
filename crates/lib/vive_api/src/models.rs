//! Request and response shapes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use vive_core::models::auth::{Role, User};
use vive_core::models::social::{Category, Comment, Post};

use crate::error::AppError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,6}$").expect("static regex")
});

static PASSWORD_CHARSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9@$!%*?&]{8,20}$").expect("static regex"));

const PASSWORD_SPECIALS: &str = "@$!%*?&";

/// Column widths from the schema, in characters.
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_POST_CONTENT_LEN: usize = 10_000;
pub const MAX_COMMENT_LEN: usize = 1_000;

fn fits(value: &str, max: usize) -> bool {
    value.chars().count() <= max
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// 8–20 characters from `[A-Za-z0-9@$!%*?&]` with at least one lowercase,
/// uppercase, digit and special character.
pub(crate) fn is_strong_password(password: &str) -> bool {
    PASSWORD_CHARSET_RE.is_match(password)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

/// Collects field errors and turns them into one `VALIDATION_ERROR`.
#[derive(Default)]
struct FieldErrors(Vec<String>);

impl FieldErrors {
    fn check(&mut self, ok: bool, message: &str) {
        if !ok {
            self.0.push(message.to_string());
        }
    }

    fn finish(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.0.join("; ")))
        }
    }
}

// ---------------------------------------------------------------------------
// Generic bodies
// ---------------------------------------------------------------------------

/// Structured error body: `{"error": CODE, "message": text}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Acknowledgement for deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub message: String,
    pub success: bool,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Older clients send `username`.
    #[serde(alias = "username")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub about: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.check(!self.name.trim().is_empty(), "UserName cannot be blank");
        check_name_len(&mut errors, &self.name);
        if self.email.trim().is_empty() {
            errors.check(false, "Email cannot be blank");
        } else {
            errors.check(
                is_valid_email(&self.email),
                "Email must be a valid format like example@gmail.com",
            );
        }
        if self.password.is_empty() {
            errors.check(false, "Password cannot be blank");
        } else {
            errors.check(
                is_strong_password(&self.password),
                "Password must contain at least one uppercase letter, one lowercase letter, one digit, and one special character",
            );
        }
        check_about(&mut errors, self.about.as_deref());
        errors.finish()
    }
}

fn check_name_len(errors: &mut FieldErrors, name: &str) {
    errors.check(
        fits(name, MAX_NAME_LEN),
        &format!("UserName must be at most {MAX_NAME_LEN} characters"),
    );
}

fn check_about(errors: &mut FieldErrors, about: Option<&str>) {
    if let Some(about) = about {
        errors.check(
            about.chars().count() >= 10,
            "About section must be at least 10 characters long",
        );
    }
}

/// Login, register and refresh result. Absent tokens are omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub about: Option<String>,
    pub roles: Vec<Role>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            about: u.about,
            roles: u.roles.into_iter().collect(),
        }
    }
}

/// Profile update. Omitted fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub about: Option<String>,
    pub roles: Option<Vec<Role>>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        if let Some(name) = &self.name {
            errors.check(!name.trim().is_empty(), "UserName cannot be blank");
            check_name_len(&mut errors, name);
        }
        if let Some(email) = &self.email {
            errors.check(
                is_valid_email(email),
                "Email must be a valid format like example@gmail.com",
            );
        }
        if let Some(password) = &self.password {
            errors.check(
                is_strong_password(password),
                "Password must contain at least one uppercase letter, one lowercase letter, one digit, and one special character",
            );
        }
        check_about(&mut errors, self.about.as_deref());
        errors.finish()
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryRequest {
    pub category_title: String,
    pub category_description: String,
}

impl CategoryRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.check(
            self.category_title.trim().chars().count() >= 4,
            "min 4 characters needed",
        );
        errors.check(
            fits(&self.category_title, MAX_TITLE_LEN),
            &format!("max {MAX_TITLE_LEN} characters allowed"),
        );
        errors.check(
            self.category_description.trim().chars().count() >= 10,
            "Min 10 Characters needed",
        );
        errors.finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub category_id: i64,
    pub category_title: String,
    pub category_description: String,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        Self {
            category_id: c.id,
            category_title: c.title,
            category_description: c.description,
        }
    }
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostRequest {
    pub post_title: String,
    pub content: String,
}

impl PostRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.check(!self.post_title.trim().is_empty(), "Post title cannot be blank");
        errors.check(!self.content.trim().is_empty(), "Content cannot be blank");
        errors.check(
            fits(&self.post_title, MAX_TITLE_LEN),
            &format!("Post title must be at most {MAX_TITLE_LEN} characters"),
        );
        errors.check(
            fits(&self.content, MAX_POST_CONTENT_LEN),
            &format!("Content must be at most {MAX_POST_CONTENT_LEN} characters"),
        );
        errors.finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub post_id: i64,
    pub post_title: String,
    pub content: String,
    pub creation_date: DateTime<Utc>,
    pub user_id: i64,
    pub category_id: i64,
}

impl From<Post> for PostResponse {
    fn from(p: Post) -> Self {
        Self {
            post_id: p.id,
            post_title: p.title,
            content: p.content,
            creation_date: p.created_at,
            user_id: p.user_id,
            category_id: p.category_id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub keyword: String,
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentRequest {
    pub content: String,
}

impl CommentRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        errors.check(!self.content.trim().is_empty(), "Comment content cannot be blank");
        errors.check(
            fits(&self.content, MAX_COMMENT_LEN),
            &format!("Comment must be at most {MAX_COMMENT_LEN} characters"),
        );
        errors.finish()
    }
}

/// A comment with its reply thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub content: String,
    pub created_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_date: Option<DateTime<Utc>>,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_comment_id: Option<i64>,
    pub replies: Vec<CommentResponse>,
}

impl From<Comment> for CommentResponse {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            content: c.content,
            created_date: c.created_at,
            edited_date: c.edited_at,
            post_id: c.post_id,
            user_id: c.user_id,
            parent_comment_id: c.parent_id,
            replies: Vec::new(),
        }
    }
}

/// Deepest reply level rendered nested. Replies below it are listed
/// beside their parent, keeping `parentCommentId` intact.
pub const MAX_THREAD_DEPTH: usize = 32;

impl CommentResponse {
    /// Build the reply tree rooted at each comment whose parent is `root`.
    /// `all` must contain every comment of the thread.
    pub fn thread(all: &[Comment], root: Option<i64>) -> Vec<CommentResponse> {
        let mut children: HashMap<Option<i64>, Vec<&Comment>> = HashMap::new();
        for c in all {
            children.entry(c.parent_id).or_default().push(c);
        }

        // Breadth-first, so a node is always visited after the node whose
        // `replies` will hold it.
        let mut order: Vec<(&Comment, Option<i64>)> = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<(&Comment, Option<i64>, usize)> = children
            .get(&root)
            .into_iter()
            .flatten()
            .map(|c| (*c, None, 1))
            .collect();
        while let Some((c, holder, depth)) = queue.pop_front() {
            if !seen.insert(c.id) {
                continue;
            }
            order.push((c, holder));
            for reply in children.get(&Some(c.id)).into_iter().flatten() {
                if depth < MAX_THREAD_DEPTH {
                    queue.push_back((*reply, Some(c.id), depth + 1));
                } else {
                    queue.push_back((*reply, holder, depth));
                }
            }
        }

        let mut held: HashMap<Option<i64>, Vec<i64>> = HashMap::new();
        for (c, holder) in &order {
            held.entry(*holder).or_default().push(c.id);
        }
        let mut built: HashMap<i64, CommentResponse> = HashMap::with_capacity(order.len());
        for (c, _) in order.iter().rev() {
            let mut node = CommentResponse::from((*c).clone());
            node.replies = take_sorted(&mut built, held.remove(&Some(c.id)));
            built.insert(c.id, node);
        }
        take_sorted(&mut built, held.remove(&None))
    }
}

fn take_sorted(
    built: &mut HashMap<i64, CommentResponse>,
    ids: Option<Vec<i64>>,
) -> Vec<CommentResponse> {
    let mut ids = ids.unwrap_or_default();
    ids.sort_unstable();
    ids.iter().filter_map(|id| built.remove(id)).collect()
}
