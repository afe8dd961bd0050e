//! Identity verification.
//!
//! The identity provider signs short-lived session tokens (JWTs) in the
//! browser; the server only verifies them.  [`SessionVerifier`] is the seam
//! the HTTP layer depends on, [`clerk::ClerkVerifier`] the production
//! implementation.

pub mod clerk;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use clerk::{ClerkSettings, ClerkVerifier};

/// The signed-in user attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Identity-provider user id (`sub`).
    pub user_id: String,
    /// Provider session id (`sid`), when present.
    pub session_id: Option<String>,
    /// Active organisation (`org_id`), when present.
    pub org_id: Option<String>,
    /// Token expiry as a unix timestamp.
    pub expires_at: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("unsupported signing algorithm {0:?}")]
    UnsupportedAlgorithm(jsonwebtoken::Algorithm),

    #[error("token header has no key id")]
    MissingKeyId,

    #[error("no signing key with id {0}")]
    UnknownKey(String),

    #[error("authorized party {0:?} is not accepted")]
    UnauthorizedParty(Option<String>),

    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(#[from] reqwest::Error),

    #[error("invalid verifier configuration: {0}")]
    Config(String),
}

/// Turns a raw session token into an [`Identity`].
#[async_trait]
pub trait SessionVerifier: Send + Sync + 'static {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}
