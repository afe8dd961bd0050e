//! Liveness plus database readiness, for load balancers and uptime checks.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::warn;
use utoipa::{OpenApi, ToSchema};

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health), components(schemas(HealthReport)))]
pub struct HealthApi;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthReport {
    /// `ok` when every dependency answers, `degraded` otherwise.
    pub status: String,
    pub version: String,
    /// `ok` or `unavailable`.
    pub database: String,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server and database are up", body = HealthReport),
        (status = 503, description = "Database unreachable", body = HealthReport),
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthReport>) {
    let (status, database, code) = match state.store.ping().await {
        Ok(()) => ("ok", "ok", StatusCode::OK),
        Err(e) => {
            warn!(error = %e, "health check: database unreachable");
            ("degraded", "unavailable", StatusCode::SERVICE_UNAVAILABLE)
        }
    };
    (
        code,
        Json(HealthReport {
            status: status.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            database: database.to_owned(),
        }),
    )
}
