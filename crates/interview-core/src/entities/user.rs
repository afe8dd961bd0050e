use std::future::Future;

use crate::entities::{SqliteStore, dao::User, format_ts, parse_ts};

type UserRow = (String, String, String, String, String, String, String);

pub trait UserStore: Send + Sync + 'static {
    /// Insert the user, or refresh the profile fields of the existing row with
    /// the same `clerk_id`.  Returns the stored row.
    fn upsert_user(&self, user: User) -> impl Future<Output = Result<User, sqlx::Error>> + Send;
    fn get_user(&self, id: &str) -> impl Future<Output = Result<Option<User>, sqlx::Error>> + Send;
    fn get_user_by_clerk_id(
        &self,
        clerk_id: &str,
    ) -> impl Future<Output = Result<Option<User>, sqlx::Error>> + Send;
    /// Returns `true` when a row was removed.
    fn delete_user_by_clerk_id(
        &self,
        clerk_id: &str,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

fn from_row((id, clerk_id, email, name, profile_image, created_at, updated_at): UserRow) -> User {
    User {
        id,
        clerk_id,
        email,
        name,
        profile_image,
        created_at: parse_ts(&created_at, "users.created_at"),
        updated_at: parse_ts(&updated_at, "users.updated_at"),
    }
}

impl UserStore for SqliteStore {
    async fn upsert_user(&self, user: User) -> Result<User, sqlx::Error> {
        sqlx::query(
            "INSERT INTO users (id, clerk_id, email, name, profile_image, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT(clerk_id) DO UPDATE SET \
                email = ?3, name = ?4, profile_image = ?5, updated_at = ?7",
        )
        .bind(&user.id)
        .bind(&user.clerk_id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.profile_image)
        .bind(format_ts(&user.created_at))
        .bind(format_ts(&user.updated_at))
        .execute(&self.pool)
        .await?;

        self.get_user_by_clerk_id(&user.clerk_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, clerk_id, email, name, profile_image, created_at, updated_at \
             FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(from_row))
    }

    async fn get_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, clerk_id, email, name, profile_image, created_at, updated_at \
             FROM users WHERE clerk_id = ?1",
        )
        .bind(clerk_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(from_row))
    }

    async fn delete_user_by_clerk_id(&self, clerk_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE clerk_id = ?1")
            .bind(clerk_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
