use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use interview_core::entities::{
    Difficulty, InterviewSession, SessionStatus, SessionStore, UserStore,
};
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

use crate::error::ServerError;
use crate::middleware::auth::CurrentUser;
use crate::schemas::session::{
    CreateSessionRequest, SessionEnvelope, SessionListResponse, SessionResponse, UserSummary,
    session_response,
};
use crate::state::AppState;

const LIST_LIMIT: u32 = 20;

#[derive(OpenApi)]
#[openapi(
    paths(
        create_session,
        list_active_sessions,
        list_my_recent_sessions,
        get_session,
        join_session,
        end_session
    ),
    components(schemas(
        CreateSessionRequest,
        SessionEnvelope,
        SessionListResponse,
        SessionResponse,
        UserSummary
    ))
)]
pub struct SessionApi;

/// Register session routes (nested under `/api`).
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/session",           post(create_session))
        .route("/session/active",    get(list_active_sessions))
        .route("/session/my-recent", get(list_my_recent_sessions))
        .route("/session/{id}",      get(get_session))
        .route("/session/{id}/join", post(join_session))
        .route("/session/{id}/end",  post(end_session))
}

/// Room id for the video call bound to a new session.
fn new_call_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Attach host and participant profiles to a session.
async fn populate(
    state: &AppState,
    session: InterviewSession,
) -> Result<SessionResponse, ServerError> {
    let host = state.store.get_user(&session.host_id).await?;
    let participant = match &session.participant_id {
        Some(id) => state.store.get_user(id).await?,
        None => None,
    };
    Ok(session_response(session, host.as_ref(), participant.as_ref()))
}

async fn populate_all(
    state: &AppState,
    sessions: Vec<InterviewSession>,
) -> Result<Vec<SessionResponse>, ServerError> {
    let mut out = Vec::with_capacity(sessions.len());
    for session in sessions {
        out.push(populate(state, session).await?);
    }
    Ok(out)
}

async fn load_session(state: &AppState, id: &str) -> Result<InterviewSession, ServerError> {
    state
        .store
        .get_session(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Session not found".into()))
}

#[utoipa::path(
    post,
    path = "/api/session",
    tag = "sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionEnvelope),
        (status = 400, description = "Missing or invalid problem / difficulty"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Signed-in user has no local profile"),
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionEnvelope>), ServerError> {
    let req = CreateSessionRequest {
        problem: req.problem.map(|p| p.trim().to_owned()),
        difficulty: req.difficulty.map(|d| d.trim().to_owned()),
    };
    let problem = req.problem.as_deref().unwrap_or_default();
    let difficulty = req.difficulty.as_deref().unwrap_or_default();
    if problem.is_empty() || difficulty.is_empty() {
        return Err(ServerError::BadRequest(
            "Problem and difficulty are required".into(),
        ));
    }
    req.validate()?;
    let difficulty: Difficulty = difficulty.parse().map_err(|_| {
        ServerError::BadRequest("Difficulty must be one of easy, medium or hard".into())
    })?;

    let now = Utc::now();
    let session = InterviewSession {
        id: Uuid::new_v4().to_string(),
        problem: problem.to_owned(),
        difficulty,
        host_id: user.id.clone(),
        participant_id: None,
        status: SessionStatus::Active,
        call_id: new_call_id(),
        created_at: now,
        updated_at: now,
    };
    state.store.create_session(session.clone()).await?;
    info!(session_id = %session.id, call_id = %session.call_id, host = %user.clerk_id, "session created");

    Ok((
        StatusCode::CREATED,
        Json(SessionEnvelope {
            session: session_response(session, Some(&user), None),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/session/active",
    tag = "sessions",
    responses(
        (status = 200, description = "Open sessions, newest first", body = SessionListResponse),
        (status = 401, description = "Not signed in"),
    )
)]
pub async fn list_active_sessions(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
) -> Result<Json<SessionListResponse>, ServerError> {
    let sessions = state.store.list_active_sessions(LIST_LIMIT).await?;
    Ok(Json(SessionListResponse {
        sessions: populate_all(&state, sessions).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/api/session/my-recent",
    tag = "sessions",
    responses(
        (status = 200, description = "Completed sessions of the caller, newest first", body = SessionListResponse),
        (status = 401, description = "Not signed in"),
    )
)]
pub async fn list_my_recent_sessions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SessionListResponse>, ServerError> {
    let sessions = state.store.list_recent_sessions_for(&user.id, LIST_LIMIT).await?;
    Ok(Json(SessionListResponse {
        sessions: populate_all(&state, sessions).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/api/session/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session", body = SessionEnvelope),
        (status = 404, description = "Session not found"),
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<SessionEnvelope>, ServerError> {
    let session = load_session(&state, &id).await?;
    Ok(Json(SessionEnvelope {
        session: populate(&state, session).await?,
    }))
}

#[utoipa::path(
    post,
    path = "/api/session/{id}/join",
    tag = "sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Joined as participant", body = SessionEnvelope),
        (status = 400, description = "Session completed, or caller is the host"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session is full"),
    )
)]
pub async fn join_session(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<SessionEnvelope>, ServerError> {
    let session = load_session(&state, &id).await?;
    if session.status != SessionStatus::Active {
        return Err(ServerError::BadRequest("Cannot join a completed session".into()));
    }
    if session.host_id == user.id {
        return Err(ServerError::BadRequest(
            "Host cannot join their own session as participant".into(),
        ));
    }

    match session.participant_id.as_deref() {
        Some(existing) if existing == user.id => {}
        Some(_) => return Err(ServerError::Conflict("Session is full".into())),
        None => {
            // The update is conditional, so a concurrent join loses here.
            if !state.store.join_session(&id, &user.id).await? {
                return Err(ServerError::Conflict("Session is full".into()));
            }
            info!(session_id = %id, participant = %user.clerk_id, "participant joined");
        }
    }

    let session = load_session(&state, &id).await?;
    Ok(Json(SessionEnvelope {
        session: populate(&state, session).await?,
    }))
}

#[utoipa::path(
    post,
    path = "/api/session/{id}/end",
    tag = "sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session completed", body = SessionEnvelope),
        (status = 400, description = "Session already completed"),
        (status = 403, description = "Caller is not the host"),
        (status = 404, description = "Session not found"),
    )
)]
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<SessionEnvelope>, ServerError> {
    let session = load_session(&state, &id).await?;
    if session.host_id != user.id {
        return Err(ServerError::Forbidden("Only the host can end the session".into()));
    }
    if session.status == SessionStatus::Completed
        || !state.store.complete_session(&id).await?
    {
        return Err(ServerError::BadRequest("Session is already completed".into()));
    }
    info!(session_id = %id, "session completed");

    let session = load_session(&state, &id).await?;
    Ok(Json(SessionEnvelope {
        session: populate(&state, session).await?,
    }))
}
