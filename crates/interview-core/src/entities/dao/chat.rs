use chrono::{DateTime, Utc};

/// A single message row in the `chat_messages` table.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    /// `users.id` of the author.
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
