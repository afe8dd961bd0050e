//! Identity middleware.
//!
//! [`authenticate`] runs on every request and attaches an [`Identity`] to the
//! request extensions when a valid session token is presented.  It never
//! rejects; [`require_auth`] and the [`CurrentUser`] extractor do that for
//! the routes that need a signed-in user.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use interview_core::Identity;
use interview_core::entities::{User, UserStore};
use tracing::debug;

use crate::error::ServerError;
use crate::state::AppState;

/// Cookie the identity provider's browser SDK stores the session token in.
pub const SESSION_COOKIE: &str = "__session";

const UNAUTHORIZED: &str = "Unauthorized - you must be signed in";

/// Session token from `Authorization: Bearer …`, else from the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|t| !t.is_empty())
}

pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(verifier) = &state.verifier {
        if let Some(token) = session_token(req.headers()).map(str::to_owned) {
            match verifier.verify(&token).await {
                Ok(identity) => {
                    debug!(user_id = %identity.user_id, "request authenticated");
                    req.extensions_mut().insert(identity);
                }
                Err(e) => debug!(error = %e, "session token rejected; continuing signed out"),
            }
        }
    }
    next.run(req).await
}

pub async fn require_auth(req: Request<Body>, next: Next) -> Response {
    if req.extensions().get::<Identity>().is_none() {
        return ServerError::Unauthorized(UNAUTHORIZED.into()).into_response();
    }
    next.run(req).await
}

/// The local user row behind the request's identity.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let clerk_id = parts
            .extensions
            .get::<Identity>()
            .map(|identity| identity.user_id.clone())
            .ok_or_else(|| ServerError::Unauthorized(UNAUTHORIZED.into()))?;
        let user = state
            .store
            .get_user_by_clerk_id(&clerk_id)
            .await?
            .ok_or_else(|| ServerError::NotFound("User not found".into()))?;
        Ok(CurrentUser(user))
    }
}
