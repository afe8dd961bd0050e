use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use interview_core::entities::{
    ChatMessage, ChatStore, InterviewSession, SessionStatus, SessionStore, User,
};
use tracing::debug;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::ServerError;
use crate::middleware::auth::CurrentUser;
use crate::schemas::chat::{ChatTokenResponse, MessageResponse, PostMessageRequest};
use crate::state::AppState;

/// Upper bound on a single message, in bytes.
const MAX_MESSAGE_BYTES: usize = 4096;

#[derive(OpenApi)]
#[openapi(
    paths(get_chat_token, list_messages, post_message),
    components(schemas(ChatTokenResponse, MessageResponse, PostMessageRequest))
)]
pub struct ChatApi;

/// Register chat routes (nested under `/api`).
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/token", get(get_chat_token))
        .route("/chat/{session_id}/messages", get(list_messages).post(post_message))
}

#[utoipa::path(
    get,
    path = "/api/chat/token",
    tag = "chat",
    responses(
        (status = 200, description = "Token for the chat client SDK", body = ChatTokenResponse),
        (status = 401, description = "Not signed in"),
        (status = 503, description = "Chat credentials are not configured"),
    )
)]
pub async fn get_chat_token(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ChatTokenResponse>, ServerError> {
    let issuer = state
        .chat_tokens
        .as_ref()
        .ok_or_else(|| ServerError::ServiceUnavailable("Chat service is not configured".into()))?;
    let token = issuer
        .issue(&user.clerk_id)
        .map_err(|e| ServerError::Internal(format!("failed to sign chat token: {e}")))?;
    debug!(user = %user.clerk_id, "chat token issued");

    Ok(Json(ChatTokenResponse {
        token,
        api_key: issuer.api_key().to_owned(),
        user_id: user.clerk_id,
        user_name: user.name,
        user_image: user.profile_image,
    }))
}

/// The session, provided `user` takes part in it.
async fn member_session(
    state: &AppState,
    session_id: &str,
    user: &User,
) -> Result<InterviewSession, ServerError> {
    let session = state
        .store
        .get_session(session_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Session not found".into()))?;
    if !session.is_member(&user.id) {
        return Err(ServerError::Forbidden(
            "Only session members can access the chat".into(),
        ));
    }
    Ok(session)
}

#[utoipa::path(
    get,
    path = "/api/chat/{session_id}/messages",
    tag = "chat",
    params(("session_id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Messages, oldest first", body = Vec<MessageResponse>),
        (status = 403, description = "Caller is not host or participant"),
        (status = 404, description = "Session not found"),
    )
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, ServerError> {
    member_session(&state, &session_id, &user).await?;
    let messages = state.store.list_messages(&session_id).await?;
    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/chat/{session_id}/messages",
    tag = "chat",
    params(("session_id" = String, Path, description = "Session id")),
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = MessageResponse),
        (status = 400, description = "Empty or oversized message, or session completed"),
        (status = 403, description = "Caller is not host or participant"),
        (status = 404, description = "Session not found"),
    )
)]
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(session_id): Path<String>,
    Json(req): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ServerError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ServerError::BadRequest("Message content is required".into()));
    }
    if content.len() > MAX_MESSAGE_BYTES {
        return Err(ServerError::BadRequest(format!(
            "Message must be at most {MAX_MESSAGE_BYTES} bytes"
        )));
    }

    let session = member_session(&state, &session_id, &user).await?;
    if session.status == SessionStatus::Completed {
        return Err(ServerError::BadRequest(
            "Cannot post to a completed session".into(),
        ));
    }

    let message = ChatMessage {
        id: Uuid::new_v4().to_string(),
        session_id,
        sender_id: user.id,
        content: content.to_owned(),
        created_at: Utc::now(),
    };
    state.store.append_message(message.clone()).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}
