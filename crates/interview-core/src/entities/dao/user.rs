use chrono::{DateTime, Utc};

/// A row in the `users` table, mirrored from the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    /// Identity-provider user id (`sub` claim of the session token).
    pub clerk_id: String,
    pub email: String,
    pub name: String,
    pub profile_image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
