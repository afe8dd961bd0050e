//! Video-call stub.  The call itself runs through the video provider; the
//! server only confirms that the caller is signed in.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use utoipa::OpenApi;

use crate::middleware::auth;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(video_calls))]
pub struct VideoCallsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/video-calls", get(video_calls))
        .route_layer(middleware::from_fn(auth::require_auth))
}

#[utoipa::path(
    get,
    path = "/video-calls",
    tag = "video",
    responses(
        (status = 200, description = "Caller is signed in", body = String, content_type = "text/plain"),
        (status = 401, description = "Not signed in"),
    )
)]
pub async fn video_calls() -> &'static str {
    "You are authorized to access video calls"
}

#[cfg(test)]
mod test {
    use crate::testing::{app, request, send};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn rejects_signed_out_callers() {
        let (app, _) = app().await;
        let res = send(&app, request("GET", "/video-calls", None, None)).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.json()["error"], "Unauthorized - you must be signed in");
    }

    #[tokio::test]
    async fn rejects_invalid_tokens() {
        let (app, _) = app().await;
        let mut req = request("GET", "/video-calls", None, None);
        req.headers_mut()
            .insert("authorization", "Bearer forged".parse().unwrap());
        let res = send(&app, req).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admits_signed_in_callers() {
        // Only the identity matters here; no local user row is needed.
        let (app, _) = app().await;
        let res = send(&app, request("GET", "/video-calls", Some("user_1"), None)).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.text(), "You are authorized to access video calls");
    }
}
