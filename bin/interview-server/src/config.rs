//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;

use interview_core::auth::ClerkSettings;

/// Deployment environment, from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    /// Unknown values fall back to development.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Runtime configuration for interview-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port to bind on all interfaces (default: `3000`).
    pub port: u16,

    /// Origin of the frontend; enables credentialed CORS for exactly that
    /// origin.  `None` allows any origin without credentials.
    pub client_url: Option<String>,

    pub environment: Environment,

    /// sqlx connection string (default: `"sqlite://interview.db?mode=rwc"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Directory holding the built frontend; served in production only.
    pub frontend_dist: PathBuf,

    /// Mount Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,

    pub clerk_secret_key: Option<String>,
    /// PEM public key for networkless token verification.
    pub clerk_jwt_key: Option<String>,
    pub clerk_jwks_url: Option<String>,
    /// Accepted `azp` claims.
    pub clerk_authorized_parties: Vec<String>,

    /// App id the job framework knows this server by.
    pub jobs_app_id: String,
    pub jobs_signing_key: Option<String>,

    pub chat_api_key: Option<String>,
    pub chat_api_secret: Option<String>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let environment = Environment::parse(&var("NODE_ENV").unwrap_or_default());
        let production = environment.is_production();
        let client_url = var("CLIENT_URL").map(|u| u.trim_end_matches('/').to_owned());

        let mut clerk_authorized_parties: Vec<String> = var("CLERK_AUTHORIZED_PARTIES")
            .map(|v| split_list(&v))
            .unwrap_or_default();
        if clerk_authorized_parties.is_empty() {
            clerk_authorized_parties.extend(client_url.clone());
        }

        Self {
            port: var("PORT").and_then(|v| v.trim().parse().ok()).unwrap_or(3000),
            client_url,
            environment,
            database_url: var("DB_URL")
                .unwrap_or_else(|| "sqlite://interview.db?mode=rwc".to_owned()),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_owned()),
            log_json: var("LOG_JSON").map(|v| parse_bool(&v)).unwrap_or(production),
            frontend_dist: var("FRONTEND_DIST")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("../frontend/dist")),
            enable_swagger: var("ENABLE_SWAGGER").map(|v| parse_bool(&v)).unwrap_or(!production),
            clerk_secret_key: var("CLERK_SECRET_KEY"),
            clerk_jwt_key: var("CLERK_JWT_KEY"),
            clerk_jwks_url: var("CLERK_JWKS_URL"),
            clerk_authorized_parties,
            jobs_app_id: var("INNGEST_APP_ID").unwrap_or_else(|| "interview".to_owned()),
            jobs_signing_key: var("INNGEST_SIGNING_KEY"),
            chat_api_key: var("CHAT_API_KEY"),
            chat_api_secret: var("CHAT_API_SECRET"),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn clerk_settings(&self) -> ClerkSettings {
        ClerkSettings {
            jwt_key: self.clerk_jwt_key.clone(),
            secret_key: self.clerk_secret_key.clone(),
            jwks_url: self.clerk_jwks_url.clone(),
            authorized_parties: self.clerk_authorized_parties.clone(),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse_bool(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
