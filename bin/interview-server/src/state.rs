//! Shared application state injected into every Axum handler.

use std::sync::Arc;
use std::time::Duration;

use interview_core::SqliteStore;
use interview_core::auth::SessionVerifier;
use interview_core::chat_token::ChatTokenIssuer;
use interview_core::jobs::{DeleteUser, JobRegistry, SigningKey, SyncUser};

use crate::config::Config;

const CHAT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// State shared across all HTTP handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Users, interview sessions and chat messages.
    pub store: Arc<SqliteStore>,
    /// `None` when no identity-provider key is configured; every request is
    /// then treated as signed out.
    pub verifier: Option<Arc<dyn SessionVerifier>>,
    /// Background-job functions served at `/api/inngest`.
    pub jobs: Arc<JobRegistry>,
    /// Key for job callback signatures.  When unset, unsigned callbacks are
    /// accepted outside production and refused in production.
    pub signing_key: Option<SigningKey>,
    /// `None` when chat credentials are not configured.
    pub chat_tokens: Option<ChatTokenIssuer>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("verifier", &self.verifier.is_some())
            .field("jobs", &self.jobs)
            .field("signing_key", &self.signing_key.is_some())
            .field("chat_tokens", &self.chat_tokens)
            .finish()
    }
}

impl AppState {
    /// Assemble the state; job functions, the callback signing key and the
    /// chat token issuer are derived from `config`.
    pub fn new(
        config: Config,
        store: Arc<SqliteStore>,
        verifier: Option<Arc<dyn SessionVerifier>>,
    ) -> Self {
        let jobs = JobRegistry::new(config.jobs_app_id.clone())
            .register(SyncUser::new(Arc::clone(&store)))
            .register(DeleteUser::new(Arc::clone(&store)));
        let signing_key = config.jobs_signing_key.as_deref().map(SigningKey::new);
        let chat_tokens = match (&config.chat_api_key, &config.chat_api_secret) {
            (Some(key), Some(secret)) => {
                Some(ChatTokenIssuer::new(key.clone(), secret).with_ttl(CHAT_TOKEN_TTL))
            }
            _ => None,
        };
        Self {
            config: Arc::new(config),
            store,
            verifier,
            jobs: Arc::new(jobs),
            signing_key,
            chat_tokens,
        }
    }
}
