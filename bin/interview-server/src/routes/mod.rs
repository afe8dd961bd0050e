//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (per-request trace id, CORS, identity)
//! - Optional Swagger UI / OpenAPI document endpoint (`ENABLE_SWAGGER`)
//! - Greeting, health and video-call routes
//! - `/api` routes: sessions and chat (signed-in), job framework callbacks
//! - In production, the frontend bundle as the fallback for every other path

mod chat;
pub mod doc;
mod frontend;
mod health;
mod jobs;
mod root;
mod session;
mod video_calls;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{auth, cors, trace};
use crate::state::AppState;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let signed_in = Router::new()
        .merge(session::router())
        .merge(chat::router())
        .route_layer(middleware::from_fn(auth::require_auth));

    let api_router = Router::new().merge(signed_in).merge(jobs::router());

    let mut app = Router::new()
        .merge(root::router())
        .merge(health::router())
        .merge(video_calls::router())
        .nest("/api", api_router);

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    if state.config.environment.is_production() {
        app = app.fallback_service(frontend::service(&state.config.frontend_dist));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(middleware::from_fn_with_state(state.clone(), auth::authenticate))
        .layer(cors::cors_layer(&state))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}
