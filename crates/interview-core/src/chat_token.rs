//! Tokens for the chat provider's client SDK.
//!
//! The browser connects to the chat provider directly; the server vouches for
//! the user by signing `{user_id}` with the shared API secret (HS256).

use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ChatClaims<'a> {
    user_id: &'a str,
    iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

#[derive(Clone)]
pub struct ChatTokenIssuer {
    api_key: String,
    key: EncodingKey,
    ttl: Option<Duration>,
}

impl std::fmt::Debug for ChatTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatTokenIssuer")
            .field("api_key", &self.api_key)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ChatTokenIssuer {
    pub fn new(api_key: impl Into<String>, secret: &str) -> Self {
        Self {
            api_key: api_key.into(),
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl: None,
        }
    }

    /// Tokens expire `ttl` after issuance instead of living forever.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Public API key the client SDK is initialised with.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn issue(&self, user_id: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let iat = chrono::Utc::now().timestamp();
        let exp = self.ttl.map(|ttl| iat + ttl.as_secs() as i64);
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &ChatClaims { user_id, iat, exp },
            &self.key,
        )
    }
}
