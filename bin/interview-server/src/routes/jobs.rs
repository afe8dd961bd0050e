//! Serve endpoint of the background-job framework.
//!
//! `GET` reports what the server has registered, `PUT` returns the function
//! manifest the framework syncs against, and `POST` executes one function
//! for a delivered event.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use chrono::Utc;
use interview_core::jobs::{JobCall, JobError, SIGNATURE_HEADER};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use utoipa::OpenApi;

use crate::schemas::jobs::{JobCallQuery, JobsIntrospection};
use crate::state::AppState;

/// Tells the framework whether a failed call is worth retrying.
const NO_RETRY: HeaderName = HeaderName::from_static("x-inngest-no-retry");

const SERVE_PATH: &str = "/api/inngest";

#[derive(OpenApi)]
#[openapi(
    paths(introspect, sync_functions, run_function),
    components(schemas(JobsIntrospection))
)]
pub struct JobsApi;

/// Register the serve endpoint (nested under `/api`).
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/inngest",
        get(introspect).put(sync_functions).post(run_function),
    )
}

#[utoipa::path(
    get,
    path = "/api/inngest",
    tag = "jobs",
    responses(
        (status = 200, description = "Registered functions summary", body = JobsIntrospection)
    )
)]
pub async fn introspect(State(state): State<Arc<AppState>>) -> Json<JobsIntrospection> {
    let mode = if state.config.environment.is_production() { "cloud" } else { "dev" };
    Json(JobsIntrospection {
        app_id: state.jobs.app_id().to_owned(),
        function_count: state.jobs.len(),
        has_signing_key: state.signing_key.is_some(),
        mode: mode.to_owned(),
    })
}

/// Public URL of this endpoint as seen by the caller.
fn serve_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{proto}://{host}{SERVE_PATH}")
}

#[utoipa::path(
    put,
    path = "/api/inngest",
    tag = "jobs",
    responses(
        (status = 200, description = "Function manifest", body = Value)
    )
)]
pub async fn sync_functions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<Value> {
    let url = serve_url(&headers);
    info!(%url, functions = state.jobs.len(), "job functions synced");
    Json(json!({
        "app_id": state.jobs.app_id(),
        "framework": "axum",
        "url": url,
        "functions": state.jobs.manifest(&url),
    }))
}

fn failure(status: StatusCode, retriable: bool, message: String) -> Response {
    let no_retry = if retriable { "false" } else { "true" };
    (status, [(NO_RETRY, no_retry)], Json(json!({ "error": message }))).into_response()
}

#[utoipa::path(
    post,
    path = "/api/inngest",
    tag = "jobs",
    params(("fnId" = String, Query, description = "Function to run")),
    request_body(content = Vec<u8>, description = "Raw signed callback body"),
    responses(
        (status = 200, description = "Function output", body = Value),
        (status = 400, description = "Malformed call or event payload"),
        (status = 401, description = "Signature missing or invalid"),
        (status = 404, description = "Unknown function"),
        (status = 500, description = "Function failed; may be retried"),
    )
)]
pub async fn run_function(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobCallQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match &state.signing_key {
        Some(key) => {
            let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
            if let Err(e) = key.verify(signature, &body, Utc::now().timestamp()) {
                warn!(error = %e, "rejected job callback");
                return failure(StatusCode::UNAUTHORIZED, false, e.to_string());
            }
        }
        // Unsigned callbacks are a development convenience only.
        None if state.config.environment.is_production() => {
            warn!("rejected job callback: no signing key configured in production");
            return failure(
                StatusCode::UNAUTHORIZED,
                false,
                "job callbacks require a signing key".into(),
            );
        }
        None => {}
    }

    let JobCallQuery { fn_id, step_id } = query;
    let Some(fn_id) = fn_id.filter(|id| !id.is_empty()) else {
        return failure(StatusCode::BAD_REQUEST, false, "missing fnId".into());
    };
    let call: JobCall = match serde_json::from_slice(&body) {
        Ok(call) => call,
        Err(e) => {
            return failure(StatusCode::BAD_REQUEST, false, format!("invalid call body: {e}"));
        }
    };

    debug!(fn_id = %fn_id, step_id = ?step_id, event = %call.event.name, "job callback received");
    match state.jobs.dispatch(&fn_id, &call).await {
        Ok(output) => (StatusCode::OK, Json(output)).into_response(),
        Err(e) => {
            let status = match &e {
                JobError::UnknownFunction(_) => StatusCode::NOT_FOUND,
                JobError::UnexpectedEvent { .. } | JobError::InvalidEvent(_) => {
                    StatusCode::BAD_REQUEST
                }
                JobError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            failure(status, e.is_retriable(), e.to_string())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{app, app_with, config, send};
    use axum::body::Body;
    use axum::http::Request;
    use interview_core::entities::UserStore;
    use interview_core::jobs::SigningKey;

    fn created_event(clerk_id: &str) -> Value {
        json!({
            "event": {
                "name": "clerk/user.created",
                "data": {
                    "id": clerk_id,
                    "email_addresses": [{ "id": "e1", "email_address": "ada@example.com" }],
                    "primary_email_address_id": "e1",
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "image_url": "https://img.example.com/ada.png"
                }
            },
            "ctx": { "run_id": "run_1", "attempt": 0 }
        })
    }

    fn call(fn_id: &str, body: &Value, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/api/inngest?fnId={fn_id}&stepId=step"))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(sig) = signature {
            builder = builder.header(SIGNATURE_HEADER, sig);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[test]
    fn serve_url_honours_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "api.example.com".parse().unwrap());
        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        assert_eq!(serve_url(&headers), "https://api.example.com/api/inngest");
        assert_eq!(serve_url(&HeaderMap::new()), "http://localhost/api/inngest");
    }

    #[tokio::test]
    async fn introspection_and_manifest() {
        let (app, _) = app().await;
        let res = send(&app, Request::get("/api/inngest").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status, StatusCode::OK);
        let body = res.json();
        assert_eq!(body["app_id"], "interview");
        assert_eq!(body["function_count"], 2);
        assert_eq!(body["has_signing_key"], false);
        assert_eq!(body["mode"], "dev");

        let req = Request::put("/api/inngest")
            .header(header::HOST, "localhost:3000")
            .body(Body::empty())
            .unwrap();
        let res = send(&app, req).await;
        assert_eq!(res.status, StatusCode::OK);
        let body = res.json();
        assert_eq!(body["url"], "http://localhost:3000/api/inngest");
        let ids: Vec<&str> = body["functions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["interview-sync-user", "interview-delete-user-from-db"]);
    }

    #[tokio::test]
    async fn user_lifecycle_events_update_the_store() {
        let (app, state) = app().await;

        let res = send(&app, call("interview-sync-user", &created_event("user_ada"), None)).await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.text());
        let user = state.store.get_user_by_clerk_id("user_ada").await.unwrap().unwrap();
        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.email, "ada@example.com");

        let deleted = json!({ "event": { "name": "clerk/user.deleted", "data": { "id": "user_ada" } } });
        let res = send(&app, call("delete-user-from-db", &deleted, None)).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.json()["deleted"], true);
        assert!(state.store.get_user_by_clerk_id("user_ada").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bad_calls_are_not_retried() {
        let (app, _) = app().await;

        let res = send(&app, call("nope", &created_event("u"), None)).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.headers["x-inngest-no-retry"], "true");

        let wrong_event = json!({ "event": { "name": "clerk/user.deleted", "data": { "id": "u" } } });
        let res = send(&app, call("sync-user", &wrong_event, None)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);

        let no_id = json!({ "event": { "name": "clerk/user.created", "data": {} } });
        let res = send(&app, call("sync-user", &no_id, None)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.headers["x-inngest-no-retry"], "true");

        let req = Request::post("/api/inngest?fnId=sync-user")
            .body(Body::from("not json"))
            .unwrap();
        let res = send(&app, req).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn production_refuses_callbacks_without_a_signing_key() {
        let (app, state) = app_with(config(&[("NODE_ENV", "production")])).await;
        let created = send(&app, call("sync-user", &created_event("user_kept"), None)).await;
        assert_eq!(created.status, StatusCode::UNAUTHORIZED);
        assert_eq!(created.headers["x-inngest-no-retry"], "true");

        crate::testing::add_user(&state, "user_kept").await;
        let deleted = json!({ "event": { "name": "clerk/user.deleted", "data": { "id": "user_kept" } } });
        let res = send(&app, call("delete-user-from-db", &deleted, None)).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert!(state.store.get_user_by_clerk_id("user_kept").await.unwrap().is_some());

        // Introspection stays public.
        let res = send(&app, Request::get("/api/inngest").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.json()["mode"], "cloud");
    }

    #[tokio::test]
    async fn signed_callbacks_are_enforced_when_a_key_is_set() {
        let raw_key = "signkey-test-0123456789abcdef";
        let (app, state) = app_with(config(&[("INNGEST_SIGNING_KEY", raw_key)])).await;
        let body = created_event("user_signed");

        let res = send(&app, call("sync-user", &body, None)).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);

        let key = SigningKey::new(raw_key);
        let stale = key.sign(body.to_string().as_bytes(), Utc::now().timestamp() - 3600).unwrap();
        let res = send(&app, call("sync-user", &body, Some(stale))).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);

        let forged = SigningKey::new("other").sign(body.to_string().as_bytes(), Utc::now().timestamp()).unwrap();
        let res = send(&app, call("sync-user", &body, Some(forged))).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);

        let signature = key.sign(body.to_string().as_bytes(), Utc::now().timestamp()).unwrap();
        let res = send(&app, call("sync-user", &body, Some(signature))).await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.text());
        assert!(state.store.get_user_by_clerk_id("user_signed").await.unwrap().is_some());
    }
}
