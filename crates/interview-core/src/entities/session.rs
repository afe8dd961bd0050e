use std::future::Future;

use chrono::Utc;

use crate::entities::dao::{Difficulty, InterviewSession, SessionStatus};
use crate::entities::{SqliteStore, format_ts, parse_ts};

type SessionRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    String,
);

const SESSION_COLUMNS: &str =
    "id, problem, difficulty, host_id, participant_id, status, call_id, created_at, updated_at";

pub trait SessionStore: Send + Sync + 'static {
    fn create_session(
        &self,
        session: InterviewSession,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_session(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<InterviewSession>, sqlx::Error>> + Send;
    /// Active sessions, newest first.
    fn list_active_sessions(
        &self,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<InterviewSession>, sqlx::Error>> + Send;
    /// Completed sessions the user hosted or joined, newest first.
    fn list_recent_sessions_for(
        &self,
        user_id: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<InterviewSession>, sqlx::Error>> + Send;
    /// Set the participant of an active session that has none yet.
    /// Returns `false` when the session no longer qualifies.
    fn join_session(
        &self,
        id: &str,
        participant_id: &str,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
    /// Mark an active session completed.  Returns `false` when it was not active.
    fn complete_session(&self, id: &str) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

fn from_row(
    (id, problem, difficulty, host_id, participant_id, status, call_id, created_at, updated_at): SessionRow,
) -> InterviewSession {
    InterviewSession {
        difficulty: difficulty.parse().unwrap_or_else(|_| {
            tracing::warn!(session_id = %id, raw = %difficulty, "unknown difficulty; using medium");
            Difficulty::Medium
        }),
        status: status.parse().unwrap_or_else(|_| {
            tracing::warn!(session_id = %id, raw = %status, "unknown session status; using completed");
            SessionStatus::Completed
        }),
        id,
        problem,
        host_id,
        participant_id,
        call_id,
        created_at: parse_ts(&created_at, "interview_sessions.created_at"),
        updated_at: parse_ts(&updated_at, "interview_sessions.updated_at"),
    }
}

impl SessionStore for SqliteStore {
    async fn create_session(&self, session: InterviewSession) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO interview_sessions \
             (id, problem, difficulty, host_id, participant_id, status, call_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&session.id)
        .bind(&session.problem)
        .bind(session.difficulty.as_ref())
        .bind(&session.host_id)
        .bind(&session.participant_id)
        .bind(session.status.as_ref())
        .bind(&session.call_id)
        .bind(format_ts(&session.created_at))
        .bind(format_ts(&session.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<InterviewSession>, sqlx::Error> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM interview_sessions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(from_row))
    }

    async fn list_active_sessions(&self, limit: u32) -> Result<Vec<InterviewSession>, sqlx::Error> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM interview_sessions \
             WHERE status = 'active' ORDER BY created_at DESC LIMIT ?1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn list_recent_sessions_for(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<InterviewSession>, sqlx::Error> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM interview_sessions \
             WHERE status = 'completed' AND (host_id = ?1 OR participant_id = ?1) \
             ORDER BY created_at DESC LIMIT ?2"
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn join_session(&self, id: &str, participant_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE interview_sessions SET participant_id = ?1, updated_at = ?2 \
             WHERE id = ?3 AND status = 'active' AND participant_id IS NULL",
        )
        .bind(participant_id)
        .bind(format_ts(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn complete_session(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE interview_sessions SET status = 'completed', updated_at = ?1 \
             WHERE id = ?2 AND status = 'active'",
        )
        .bind(format_ts(&Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
