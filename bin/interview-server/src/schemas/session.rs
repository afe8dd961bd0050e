use interview_core::entities::{InterviewSession, User};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for `POST /api/session`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSessionRequest {
    /// Title or slug of the problem to work on.
    #[validate(length(max = 200, message = "problem must be at most 200 characters"))]
    pub problem: Option<String>,
    /// `easy`, `medium` or `hard`.
    pub difficulty: Option<String>,
}

/// Public profile embedded in session payloads.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub clerk_id: String,
    pub name: String,
    pub email: String,
    pub profile_image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub id: String,
    pub problem: String,
    pub difficulty: String,
    pub status: String,
    pub call_id: String,
    pub host_id: String,
    pub participant_id: Option<String>,
    /// Populated host profile; absent if the row vanished.
    pub host: Option<UserSummary>,
    pub participant: Option<UserSummary>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionEnvelope {
    pub session: SessionResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionResponse>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id.clone(),
            clerk_id: user.clerk_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            profile_image: user.profile_image.clone(),
        }
    }
}

pub fn session_response(
    session: InterviewSession,
    host: Option<&User>,
    participant: Option<&User>,
) -> SessionResponse {
    SessionResponse {
        difficulty: session.difficulty.to_string(),
        status: session.status.to_string(),
        created_at: session.created_at.to_rfc3339(),
        updated_at: session.updated_at.to_rfc3339(),
        id: session.id,
        problem: session.problem,
        call_id: session.call_id,
        host_id: session.host_id,
        participant_id: session.participant_id,
        host: host.map(UserSummary::from),
        participant: participant.map(UserSummary::from),
    }
}
