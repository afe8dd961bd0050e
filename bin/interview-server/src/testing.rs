//! Helpers shared by the router tests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use interview_core::auth::{AuthError, Identity, SessionVerifier};
use interview_core::entities::{User, UserStore};
use interview_core::SqliteStore;
use serde_json::Value;
use tower::ServiceExt;

use crate::config::Config;
use crate::routes;
use crate::state::AppState;

/// Accepts `token-<clerk id>` and nothing else.
pub struct StubVerifier;

#[async_trait]
impl SessionVerifier for StubVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        token
            .strip_prefix("token-")
            .map(|user_id| Identity {
                user_id: user_id.to_owned(),
                session_id: None,
                org_id: None,
                expires_at: Utc::now().timestamp() + 60,
            })
            .ok_or_else(|| AuthError::UnknownKey(token.to_owned()))
    }
}

pub fn config(pairs: &[(&str, &str)]) -> Config {
    let pairs: Vec<(String, String)> =
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    Config::from_lookup(move |key| {
        pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    })
}

pub async fn state_with(config: Config) -> Arc<AppState> {
    let store = SqliteStore::connect("sqlite::memory:").await.expect("in-memory store");
    Arc::new(AppState::new(config, Arc::new(store), Some(Arc::new(StubVerifier))))
}

pub async fn app_with(config: Config) -> (Router, Arc<AppState>) {
    let state = state_with(config).await;
    (routes::build(Arc::clone(&state)), state)
}

pub async fn app() -> (Router, Arc<AppState>) {
    app_with(config(&[])).await
}

pub async fn add_user(state: &AppState, clerk_id: &str) -> User {
    let now = Utc::now();
    state
        .store
        .upsert_user(User {
            id: uuid::Uuid::new_v4().to_string(),
            clerk_id: clerk_id.to_owned(),
            email: format!("{clerk_id}@example.com"),
            name: format!("User {clerk_id}"),
            profile_image: String::new(),
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("insert user")
}

pub fn request(method: &str, path: &str, clerk_id: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(id) = clerk_id {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer token-{id}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(req).await.expect("infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.expect("body").to_bytes();
    TestResponse { status, headers, body }
}
