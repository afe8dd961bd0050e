//! Keeps the local `users` table in step with the identity provider.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{JobError, JobEvent, JobFunction};
use crate::entities::{User, UserStore};

/// The subset of the provider's user payload we mirror.
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: Option<String>,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    primary_email_address_id: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    #[serde(default)]
    id: Option<String>,
    email_address: String,
}

impl ProviderUser {
    fn parse(data: &Value) -> Result<Self, JobError> {
        Self::deserialize(data).map_err(|e| JobError::InvalidEvent(e.to_string()))
    }

    fn clerk_id(&self) -> Result<&str, JobError> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| JobError::InvalidEvent("user payload has no id".into()))
    }

    fn primary_email(&self) -> String {
        let primary = self.primary_email_address_id.as_deref();
        self.email_addresses
            .iter()
            .find(|e| primary.is_some() && e.id.as_deref() == primary)
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.clone())
            .unwrap_or_default()
    }

    fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{first} {last}").trim().to_owned()
    }
}

/// Creates or refreshes a user when the provider reports a sign-up or a
/// profile change.
pub struct SyncUser<S> {
    store: Arc<S>,
}

impl<S> SyncUser<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: UserStore> JobFunction for SyncUser<S> {
    fn slug(&self) -> &'static str {
        "sync-user"
    }

    fn name(&self) -> &'static str {
        "Sync user"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &["clerk/user.created", "clerk/user.updated"]
    }

    async fn run(&self, event: &JobEvent) -> Result<Value, JobError> {
        let payload = ProviderUser::parse(&event.data)?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            clerk_id: payload.clerk_id()?.to_owned(),
            email: payload.primary_email(),
            name: payload.display_name(),
            profile_image: payload.image_url.clone().unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        let stored = self.store.upsert_user(user).await?;
        Ok(json!({ "user_id": stored.id, "clerk_id": stored.clerk_id }))
    }
}

/// Removes the local row when the provider deletes the account.
pub struct DeleteUser<S> {
    store: Arc<S>,
}

impl<S> DeleteUser<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: UserStore> JobFunction for DeleteUser<S> {
    fn slug(&self) -> &'static str {
        "delete-user-from-db"
    }

    fn name(&self) -> &'static str {
        "Delete user from DB"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &["clerk/user.deleted"]
    }

    async fn run(&self, event: &JobEvent) -> Result<Value, JobError> {
        let payload = ProviderUser::parse(&event.data)?;
        let deleted = self.store.delete_user_by_clerk_id(payload.clerk_id()?).await?;
        Ok(json!({ "deleted": deleted }))
    }
}
