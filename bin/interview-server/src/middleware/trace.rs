use std::time::Instant;

use axum::body::{Body, Bytes, HttpBody};
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http_body_util::BodyExt;
use tracing::{Instrument, Level, debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::ServerError;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Bodies at or above this size are never logged.
const MAX_LOGGED_BODY: u64 = 1024;

pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    // Reuse the caller's trace id when it is a valid UUID.
    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        let trace_header = HeaderValue::from_str(&trace_id.to_string()).ok();

        let (parts, body) = req.into_parts();
        let mut response = match log_json_body("request", &parts.headers, body).await {
            Ok(body) => {
                let mut req = Request::from_parts(parts, body);
                if let Some(value) = &trace_header {
                    req.headers_mut().insert(X_TRACE_ID, value.clone());
                }
                let response = next.run(req).await;

                let (parts, body) = response.into_parts();
                match log_json_body("response", &parts.headers, body).await {
                    Ok(body) => Response::from_parts(parts, body),
                    Err(e) => ServerError::Internal(format!("failed to read response body: {e}"))
                        .into_response(),
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to read request body");
                ServerError::BadRequest("Failed to read request body".into()).into_response()
            }
        };
        if let Some(value) = trace_header {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );
        response
    }
    .instrument(span)
    .await
}

/// Logs small JSON bodies at debug level.  Only bodies whose size is known
/// up front are buffered; anything else (streams, static assets, large
/// payloads) passes through untouched.
async fn log_json_body(
    direction: &str,
    headers: &HeaderMap,
    body: Body,
) -> Result<Body, axum::Error> {
    if !tracing::enabled!(Level::DEBUG) {
        return Ok(body);
    }
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .or_else(|| body.size_hint().exact());

    if !is_json || !declared.is_some_and(|len| len < MAX_LOGGED_BODY) {
        return Ok(body);
    }

    // A lying Content-Length still cannot make us buffer more than the limit.
    let limited = http_body_util::Limited::new(body, MAX_LOGGED_BODY as usize);
    let bytes: Bytes = limited.collect().await.map_err(axum::Error::new)?.to_bytes();
    if let Ok(text) = std::str::from_utf8(&bytes) {
        debug!("{} body: {}", direction, text);
    }
    Ok(Body::from(bytes))
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::http::HeaderValue;
    use tracing::subscriber::DefaultGuard;

    fn debug_logging() -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    fn json_headers(len: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(len) = len {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static(len));
        }
        headers
    }

    fn chunked(chunks: Vec<Result<&'static str, std::io::Error>>) -> Body {
        Body::from_stream(futures::stream::iter(chunks))
    }

    #[tokio::test]
    async fn small_json_bodies_are_passed_on_intact() {
        let _guard = debug_logging();
        let body = log_json_body("request", &json_headers(None), Body::from(r#"{"a":1}"#))
            .await
            .unwrap();
        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn bodies_are_left_alone_above_debug_level() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);
        let body = log_json_body("request", &json_headers(Some("2")), chunked(vec![Ok("{}")]))
            .await
            .unwrap();
        assert_eq!(body.size_hint().exact(), None);
    }

    #[tokio::test]
    async fn bodies_of_unknown_length_are_not_buffered() {
        let _guard = debug_logging();
        let body = log_json_body("request", &json_headers(None), chunked(vec![Ok("{}")]))
            .await
            .unwrap();
        // Still the original stream: a buffered body would report its exact size.
        assert_eq!(body.size_hint().exact(), None);
    }

    #[tokio::test]
    async fn oversized_bodies_behind_a_small_length_are_rejected() {
        let _guard = debug_logging();
        let big = "x".repeat(4096).leak();
        let body = chunked(vec![Ok("{\"a\":\""), Ok(big), Ok("\"}")]);
        assert!(log_json_body("request", &json_headers(Some("10")), body).await.is_err());
    }

    #[tokio::test]
    async fn read_errors_surface_instead_of_emptying_the_body() {
        let _guard = debug_logging();
        let body = chunked(vec![Err(std::io::Error::other("reset"))]);
        assert!(log_json_body("request", &json_headers(Some("10")), body).await.is_err());
    }
}
