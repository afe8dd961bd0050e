use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowHeaders, Any, CorsLayer};

use crate::state::AppState;

pub fn cors_layer(state: &AppState) -> CorsLayer {
    let origin = state
        .config
        .client_url
        .as_deref()
        .and_then(|url| url.parse::<HeaderValue>().ok());

    match origin {
        // Credentialed requests cannot use wildcards, so methods are listed
        // and request headers are mirrored.
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(AllowHeaders::mirror_request()),
        // Wildcard – suitable for development; set CLIENT_URL in production.
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods(Any),
    }
}
