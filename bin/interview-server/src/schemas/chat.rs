use interview_core::entities::ChatMessage;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response body for `GET /api/chat/token`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatTokenResponse {
    /// Token for the chat provider's client SDK.
    pub token: String,
    /// Public API key the SDK is initialised with.
    pub api_key: String,
    /// Chat user id (the identity-provider user id).
    pub user_id: String,
    pub user_name: String,
    pub user_image: String,
}

/// Request body for `POST /api/chat/{session_id}/messages`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PostMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: String,
    pub session_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: String,
}

impl From<ChatMessage> for MessageResponse {
    fn from(msg: ChatMessage) -> Self {
        MessageResponse {
            created_at: msg.created_at.to_rfc3339(),
            id: msg.id,
            session_id: msg.session_id,
            sender_id: msg.sender_id,
            content: msg.content,
        }
    }
}
