//! # vive_api
//!
//! HTTP API library for ViveMedellin.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tracing::warn;
use vive_core::auth::{AccessPolicy, PasswordHasher, TokenCodec};
use vive_core::store::{CategoryStore, CommentStore, PostStore, SavedPostStore, UserStore};

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::handlers::{auth, categories, comments, health, posts, saved_posts, users};
use crate::services::auth::AuthService;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    pub users: Arc<dyn UserStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub posts: Arc<dyn PostStore>,
    pub comments: Arc<dyn CommentStore>,
    pub saved_posts: Arc<dyn SavedPostStore>,
    /// Token issuance, validation and revocation.
    pub auth: Arc<AuthService>,
    /// Route authorization rules consulted by the gate.
    pub policy: Arc<AccessPolicy>,
}

impl AppState {
    /// Wire every collaborator to `store`. Fails when the signing key is
    /// unusable.
    pub fn new<S>(config: ApiConfig, store: Arc<S>) -> Result<Self, AppError>
    where
        S: UserStore + CategoryStore + PostStore + CommentStore + SavedPostStore + 'static,
    {
        let codec = TokenCodec::from_base64(&config.jwt_secret)?;
        let hasher = PasswordHasher::new(config.bcrypt_cost);
        let users: Arc<dyn UserStore> = store.clone();
        let auth = AuthService::new(users.clone(), codec, hasher);
        Ok(Self {
            users,
            categories: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            saved_posts: store,
            auth: Arc::new(auth),
            policy: Arc::new(AccessPolicy::default_rules()),
            config,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `vive_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    vive_core::migrate::migrate(pool).await
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static("x-requested-with"),
            CACHE_CONTROL,
        ])
        .expose_headers([AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Builds the Axum router with all routes and shared state.
///
/// The authentication gate wraps every route and the fallback, so unknown
/// paths need authentication before they produce a 404.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/health", get(health::health))
        // Auth
        .route("/api/users/register", post(auth::register_handler))
        .route("/api/users/login", post(auth::login_handler))
        .route("/api/users/refresh-token", post(auth::refresh_handler))
        .route("/api/users/logout", post(auth::logout_handler))
        // Users
        .route("/api/users", get(users::list_users))
        .route("/api/users/", get(users::list_users))
        .route(
            "/api/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Categories
        .route(
            "/api/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/api/categories/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/api/categories/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        // Posts
        .route(
            "/api/user/{user_id}/category/{category_id}/posts",
            post(posts::create_post),
        )
        .route("/api/user/{user_id}/posts", get(posts::posts_by_user))
        .route("/api/category/{category_id}/posts", get(posts::posts_by_category))
        .route("/api/posts", get(posts::list_posts))
        .route("/api/posts/search", get(posts::search_posts))
        .route(
            "/api/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        // Comments
        .route(
            "/api/posts/{id}/comments",
            get(comments::comments_by_post).post(comments::add_comment),
        )
        .route("/api/comments/{id}/replies", post(comments::add_reply))
        .route(
            "/api/comments/{id}",
            get(comments::get_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
        // Saved posts
        .route("/api/saved-posts", get(saved_posts::my_saved_posts))
        .route(
            "/api/saved-posts/{id}",
            post(saved_posts::save_post).delete(saved_posts::unsave_post),
        )
        .route("/api/saved-posts/{id}/check", get(saved_posts::is_post_saved))
        .route(
            "/api/saved-posts/user/{user_id}",
            get(saved_posts::saved_posts_by_user),
        )
        .route(
            "/api/saved-posts/user/email/{email}",
            get(saved_posts::saved_posts_by_email),
        )
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ))
        .layer(cors)
        .with_state(state)
}
