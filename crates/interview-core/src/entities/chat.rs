use std::future::Future;

use crate::entities::{SqliteStore, dao::ChatMessage, format_ts, parse_ts};

pub trait ChatStore: Send + Sync + 'static {
    fn append_message(
        &self,
        msg: ChatMessage,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn list_messages(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, sqlx::Error>> + Send;
}

impl ChatStore for SqliteStore {
    async fn append_message(&self, msg: ChatMessage) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO chat_messages (id, session_id, sender_id, content, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&msg.id)
        .bind(&msg.session_id)
        .bind(&msg.sender_id)
        .bind(&msg.content)
        .bind(format_ts(&msg.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
            "SELECT id, session_id, sender_id, content, created_at \
             FROM chat_messages WHERE session_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, session_id, sender_id, content, created_at)| ChatMessage {
                id,
                session_id,
                sender_id,
                content,
                created_at: parse_ts(&created_at, "chat_messages.created_at"),
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::dao::{Difficulty, InterviewSession, SessionStatus};
    use crate::entities::test_support::{memory_store, user};
    use crate::entities::{SessionStore, UserStore};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn messages_come_back_oldest_first_and_die_with_the_session() {
        let store = memory_store().await;
        let host = store.upsert_user(user("host")).await.unwrap();
        let now = Utc::now();
        store
            .create_session(InterviewSession {
                id: "s1".into(),
                problem: "lru-cache".into(),
                difficulty: Difficulty::Medium,
                host_id: host.id.clone(),
                participant_id: None,
                status: SessionStatus::Active,
                call_id: "call".into(),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        for (i, text) in ["second", "first"].iter().enumerate() {
            store
                .append_message(ChatMessage {
                    id: format!("m{i}"),
                    session_id: "s1".into(),
                    sender_id: host.id.clone(),
                    content: (*text).into(),
                    created_at: now - Duration::seconds(i as i64),
                })
                .await
                .unwrap();
        }

        let contents: Vec<_> = store
            .list_messages("s1")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["first", "second"]);

        // Removing the host cascades to the session and its messages.
        store.delete_user_by_clerk_id("host").await.unwrap();
        assert!(store.list_messages("s1").await.unwrap().is_empty());
    }
}
