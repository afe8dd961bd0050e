//! Clerk session-token verification.
//!
//! Clerk signs session tokens with RS256.  The public key comes from one of
//! two places:
//!
//! - a PEM key (`CLERK_JWT_KEY`), which allows verification without network
//!   access, or
//! - the instance JWKS, fetched with the secret key and cached in memory.
//!   A token signed with an unknown `kid` triggers one refresh so key
//!   rotation is picked up without a restart.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{AuthError, Identity, SessionVerifier};

pub const DEFAULT_JWKS_URL: &str = "https://api.clerk.com/v1/jwks";

const JWKS_TTL: Duration = Duration::from_secs(60 * 60);
const JWKS_MIN_REFRESH: Duration = Duration::from_secs(30);
const CLOCK_SKEW_SECS: u64 = 5;

/// Where the verifier gets its keys from, taken from the server config.
#[derive(Debug, Clone, Default)]
pub struct ClerkSettings {
    pub jwt_key: Option<String>,
    pub secret_key: Option<String>,
    pub jwks_url: Option<String>,
    pub authorized_parties: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    exp: i64,
    #[serde(default)]
    sid: Option<String>,
    #[serde(default)]
    azp: Option<String>,
    #[serde(default)]
    org_id: Option<String>,
}

pub struct ClerkVerifier {
    keys: KeySource,
    authorized_parties: Vec<String>,
}

enum KeySource {
    Static(DecodingKey),
    Jwks(JwksCache),
}

struct JwksCache {
    http: reqwest::Client,
    url: String,
    secret_key: Option<String>,
    cached: RwLock<Option<(JwkSet, Instant)>>,
}

impl ClerkVerifier {
    /// Verify against a fixed PEM-encoded public key.
    pub fn from_pem(pem: &str, authorized_parties: Vec<String>) -> Result<Self, AuthError> {
        // Keys pasted into env files often carry literal `\n` sequences.
        let pem = pem.replace("\\n", "\n");
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AuthError::Config(format!("CLERK_JWT_KEY is not an RSA public key: {e}")))?;
        Ok(Self {
            keys: KeySource::Static(key),
            authorized_parties,
        })
    }

    /// Verify against the JWKS served at `url`.
    pub fn from_jwks(
        url: impl Into<String>,
        secret_key: Option<String>,
        authorized_parties: Vec<String>,
    ) -> Self {
        Self {
            keys: KeySource::Jwks(JwksCache {
                http: reqwest::Client::new(),
                url: url.into(),
                secret_key,
                cached: RwLock::new(None),
            }),
            authorized_parties,
        }
    }

    /// Build a verifier from settings.  A PEM key wins over the JWKS; with
    /// neither a PEM key nor a secret key there is nothing to verify with and
    /// `None` is returned.
    pub fn from_settings(settings: &ClerkSettings) -> Result<Option<Self>, AuthError> {
        let parties = settings.authorized_parties.clone();
        if let Some(pem) = settings.jwt_key.as_deref().filter(|k| !k.trim().is_empty()) {
            info!("verifying session tokens with a static public key");
            return Self::from_pem(pem, parties).map(Some);
        }
        match settings.secret_key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(secret) => {
                let url = settings.jwks_url.clone().unwrap_or_else(|| DEFAULT_JWKS_URL.to_owned());
                info!(jwks_url = %url, "verifying session tokens with the instance JWKS");
                Ok(Some(Self::from_jwks(url, Some(secret.to_owned()), parties)))
            }
            None => Ok(None),
        }
    }

    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        match &self.keys {
            KeySource::Static(key) => Ok(key.clone()),
            KeySource::Jwks(cache) => cache.key_for(kid.ok_or(AuthError::MissingKeyId)?).await,
        }
    }

    fn check_party(&self, azp: Option<&str>) -> Result<(), AuthError> {
        if self.authorized_parties.is_empty() {
            return Ok(());
        }
        match azp {
            Some(party) if self.authorized_parties.iter().any(|p| p == party) => Ok(()),
            other => Err(AuthError::UnauthorizedParty(other.map(str::to_owned))),
        }
    }
}

#[async_trait]
impl SessionVerifier for ClerkVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let header = jsonwebtoken::decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }
        let key = self.decoding_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = CLOCK_SKEW_SECS;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = jsonwebtoken::decode::<SessionClaims>(token, &key, &validation)?.claims;
        self.check_party(claims.azp.as_deref())?;

        Ok(Identity {
            user_id: claims.sub,
            session_id: claims.sid,
            org_id: claims.org_id,
            expires_at: claims.exp,
        })
    }
}

impl JwksCache {
    async fn key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let guard = self.cached.read().await;
            if let Some((set, fetched_at)) = guard.as_ref() {
                let age = fetched_at.elapsed();
                if age < JWKS_TTL {
                    if let Some(jwk) = set.find(kid) {
                        return Ok(DecodingKey::from_jwk(jwk)?);
                    }
                    // Unknown kid on a fresh set: only refetch when the set is
                    // old enough, so garbage kids cannot hammer the endpoint.
                    if age < JWKS_MIN_REFRESH {
                        return Err(AuthError::UnknownKey(kid.to_owned()));
                    }
                }
            }
        }

        let set = self.fetch().await?;
        let key = set
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()?
            .ok_or_else(|| AuthError::UnknownKey(kid.to_owned()));
        *self.cached.write().await = Some((set, Instant::now()));
        key
    }

    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        debug!(url = %self.url, "fetching JWKS");
        let mut request = self.http.get(&self.url);
        if let Some(secret) = &self.secret_key {
            request = request.bearer_auth(secret);
        }
        let set = request
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await?;
        Ok(set)
    }

    #[cfg(test)]
    fn seeded(set: JwkSet) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: "http://127.0.0.1:9/jwks".into(),
            secret_key: None,
            cached: RwLock::new(Some((set, Instant::now()))),
        }
    }
}
