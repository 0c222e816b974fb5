//! Shared harness: the full router over the in-memory store.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use vive_api::AppState;
use vive_api::config::ApiConfig;
use vive_core::store::MemoryStore;

/// base64 of 32 bytes.
pub const TEST_SECRET: &str = "VO6PUZTSAQxedzHLvhYE9C1MGN/tgYmYrfVsNNbufjs=";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

pub struct Registered {
    pub token: String,
    pub refresh_token: String,
    pub user_id: i64,
}

impl TestApp {
    pub fn new() -> Self {
        let config = ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            database_url: None,
            jwt_secret: TEST_SECRET.into(),
            // Minimum bcrypt cost keeps the suite fast.
            bcrypt_cost: 4,
            cors_allowed_origins: vec!["http://localhost:3000".into()],
        };
        let state = AppState::new(config, Arc::new(MemoryStore::new())).expect("app state");
        let router = vive_api::router(state.clone());
        Self { state, router }
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.expect("request");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");
        self.send(req).await
    }

    pub async fn register(&self, name: &str, email: &str) -> Registered {
        let (status, body) = self
            .call(
                "POST",
                "/api/users/register",
                None,
                Some(json!({"name": name, "email": email, "password": "Secret1!"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {email}: {body}");
        let token = body["token"].as_str().expect("token").to_string();
        let refresh_token = body["refreshToken"].as_str().expect("refresh").to_string();
        let user_id = self.state.auth.codec().decode(&token).expect("decode").user_id;
        Registered {
            token,
            refresh_token,
            user_id,
        }
    }
}
