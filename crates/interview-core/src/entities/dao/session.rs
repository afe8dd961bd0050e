use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
}

/// A row in the `interview_sessions` table.
#[derive(Debug, Clone)]
pub struct InterviewSession {
    pub id: String,
    pub problem: String,
    pub difficulty: Difficulty,
    /// `users.id` of the interviewer who opened the session.
    pub host_id: String,
    /// `users.id` of the candidate, once someone has joined.
    pub participant_id: Option<String>,
    pub status: SessionStatus,
    /// Identifier of the video call room bound to this session.
    pub call_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewSession {
    /// Whether `user_id` is the host or the participant.
    pub fn is_member(&self, user_id: &str) -> bool {
        self.host_id == user_id || self.participant_id.as_deref() == Some(user_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("Hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!(Difficulty::Medium.as_ref(), "medium");
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn membership_covers_host_and_participant() {
        let now = Utc::now();
        let session = InterviewSession {
            id: "s1".into(),
            problem: "two-sum".into(),
            difficulty: Difficulty::Easy,
            host_id: "host".into(),
            participant_id: Some("guest".into()),
            status: SessionStatus::Active,
            call_id: "call".into(),
            created_at: now,
            updated_at: now,
        };
        assert!(session.is_member("host"));
        assert!(session.is_member("guest"));
        assert!(!session.is_member("stranger"));
    }
}
