//! interview-core – domain layer shared by the interview server.
//!
//! Nothing in here knows about HTTP.  The server crate wires these pieces
//! into axum handlers and middleware:
//!
//! - [`entities`]: SQLite persistence for users, interview sessions and chat.
//! - [`auth`]: verification of identity-provider session tokens.
//! - [`jobs`]: background-job functions executed on job-framework callbacks.
//! - [`chat_token`]: tokens handed to the chat provider's client SDK.

pub mod auth;
pub mod chat_token;
pub mod entities;
pub mod jobs;

pub use auth::{AuthError, Identity, SessionVerifier};
pub use entities::SqliteStore;
