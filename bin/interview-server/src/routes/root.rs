use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(hello))]
pub struct RootApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(hello))
}

/// Plain-text greeting.
#[utoipa::path(
    get,
    path = "/",
    tag = "root",
    responses(
        (status = 200, description = "Greeting", body = String, content_type = "text/plain")
    )
)]
pub async fn hello() -> &'static str {
    "Hello World"
}

#[cfg(test)]
mod test {
    use crate::testing::{app, request, send};
    use axum::http::{StatusCode, header};

    #[tokio::test]
    async fn root_says_hello() {
        let (app, _) = app().await;
        let res = send(&app, request("GET", "/", None, None)).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.text(), "Hello World");
        assert!(
            res.headers[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        assert!(res.headers.contains_key("x-trace-id"));
    }
}
