//! interview-server – entry point.
//!
//! Startup order:
//! 1. Load `.env` (when present) and parse configuration.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Open the SQLite database and run pending migrations.
//! 4. Set up session-token verification.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use interview_core::SessionVerifier;
use interview_core::SqliteStore;
use interview_core::auth::ClerkVerifier;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    // A missing .env file is the normal case in production.
    dotenvy::dotenv().ok();
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    // Build the log-level filter, warning loudly if the configured value is
    // not a valid tracing filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: LOG_LEVEL='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?cfg.environment,
        "interview-server starting"
    );

    // ── 3. Database ────────────────────────────────────────────────────────────
    let store = open_store(&cfg).await?;

    // ── 4. Session verification ────────────────────────────────────────────────
    let verifier: Option<Arc<dyn SessionVerifier>> =
        match ClerkVerifier::from_settings(&cfg.clerk_settings())? {
            Some(v) => {
                info!(parties = ?cfg.clerk_authorized_parties, "session verification enabled");
                Some(Arc::new(v))
            }
            None => {
                warn!("no CLERK_JWT_KEY or CLERK_SECRET_KEY set; every request is signed out");
                None
            }
        };

    if cfg.jobs_signing_key.is_none() {
        if cfg.environment.is_production() {
            warn!("INNGEST_SIGNING_KEY is not set; job callbacks will be rejected");
        } else {
            info!("job callbacks accepted unsigned (no INNGEST_SIGNING_KEY)");
        }
    }

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let port = cfg.port;
    let addr: SocketAddr = cfg.bind_address().parse()?;
    let state = Arc::new(AppState::new(cfg, Arc::new(store), verifier));
    if state.chat_tokens.is_none() {
        warn!("CHAT_API_KEY / CHAT_API_SECRET not set; /api/chat/token answers 503");
    }

    let app = routes::build(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server is running on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.store.close().await;
    info!("interview-server stopped");
    Ok(())
}

/// Connect to the database; a failure is logged and ends startup.
async fn open_store(cfg: &Config) -> anyhow::Result<SqliteStore> {
    match SqliteStore::connect(&cfg.database_url).await {
        Ok(store) => {
            info!(database_url = %cfg.database_url, "database ready");
            Ok(store)
        }
        Err(e) => {
            error!(database_url = %cfg.database_url, error = %e, "Error starting the server");
            Err(e.into())
        }
    }
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c    => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::config;

    #[tokio::test]
    async fn startup_fails_on_an_unreachable_database() {
        let path = std::env::temp_dir()
            .join(format!("interview-missing-{}", uuid::Uuid::new_v4()))
            .join("x.db");
        let url = format!("sqlite://{}", path.display());
        let cfg = config(&[("DB_URL", url.as_str())]);
        assert!(open_store(&cfg).await.is_err());
    }

    #[tokio::test]
    async fn startup_opens_an_in_memory_database() {
        let cfg = config(&[("DB_URL", "sqlite::memory:")]);
        let store = open_store(&cfg).await.unwrap();
        store.ping().await.unwrap();
    }
}
