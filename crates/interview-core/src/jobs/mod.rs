//! Background-job functions.
//!
//! The job framework owns queuing, retries and scheduling.  When an event
//! fires it calls back into the server with the event payload and the id of
//! the function to run; [`JobRegistry::dispatch`] finds the function and runs
//! it.  The framework also asks the server to describe its functions, which
//! is what [`JobRegistry::manifest`] produces.

pub mod signature;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

pub use signature::{SIGNATURE_HEADER, SignatureError, SigningKey};
pub use users::{DeleteUser, SyncUser};

/// A single event as delivered by the job framework.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub name: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Milliseconds since the unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobContext {
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub attempt: u32,
}

/// Body of an execution callback.
#[derive(Debug, Clone, Deserialize)]
pub struct JobCall {
    pub event: JobEvent,
    #[serde(default)]
    pub events: Vec<JobEvent>,
    #[serde(default)]
    pub ctx: JobContext,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("unknown function {0}")]
    UnknownFunction(String),

    #[error("function {function} is not triggered by event {event}")]
    UnexpectedEvent { function: String, event: String },

    #[error("invalid event payload: {0}")]
    InvalidEvent(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl JobError {
    /// Whether the framework should retry the call.  Bad payloads will fail
    /// the same way every time.
    pub fn is_retriable(&self) -> bool {
        matches!(self, JobError::Store(_))
    }
}

#[async_trait]
pub trait JobFunction: Send + Sync + 'static {
    /// Short id, unique within the app.
    fn slug(&self) -> &'static str;
    fn name(&self) -> &'static str;
    /// Event names that start this function.
    fn triggers(&self) -> &'static [&'static str];
    async fn run(&self, event: &JobEvent) -> Result<Value, JobError>;
}

/// The functions this app serves.
#[derive(Clone)]
pub struct JobRegistry {
    app_id: String,
    functions: Vec<Arc<dyn JobFunction>>,
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slugs: Vec<_> = self.functions.iter().map(|func| func.slug()).collect();
        f.debug_struct("JobRegistry")
            .field("app_id", &self.app_id)
            .field("functions", &slugs)
            .finish()
    }
}

impl JobRegistry {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            functions: Vec::new(),
        }
    }

    pub fn register(mut self, function: impl JobFunction) -> Self {
        self.functions.push(Arc::new(function));
        self
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Fully-qualified function id as the framework knows it.
    pub fn function_id(&self, slug: &str) -> String {
        format!("{}-{}", self.app_id, slug)
    }

    /// Look a function up by slug or by fully-qualified id.
    pub fn resolve(&self, fn_id: &str) -> Option<&Arc<dyn JobFunction>> {
        let slug = fn_id
            .strip_prefix(self.app_id.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(fn_id);
        self.functions.iter().find(|f| f.slug() == slug)
    }

    /// Describe every function; `url` is where the framework should call back.
    pub fn manifest(&self, url: &str) -> Vec<Value> {
        self.functions
            .iter()
            .map(|f| {
                let id = self.function_id(f.slug());
                let triggers: Vec<Value> =
                    f.triggers().iter().map(|event| json!({ "event": event })).collect();
                json!({
                    "id": id,
                    "name": f.name(),
                    "triggers": triggers,
                    "steps": {
                        "step": {
                            "id": "step",
                            "name": "step",
                            "runtime": {
                                "type": "http",
                                "url": format!("{url}?fnId={id}&stepId=step"),
                            },
                        },
                    },
                })
            })
            .collect()
    }

    pub async fn dispatch(&self, fn_id: &str, call: &JobCall) -> Result<Value, JobError> {
        let function = self
            .resolve(fn_id)
            .ok_or_else(|| JobError::UnknownFunction(fn_id.to_owned()))?;

        if !function.triggers().iter().any(|t| *t == call.event.name) {
            return Err(JobError::UnexpectedEvent {
                function: function.slug().to_owned(),
                event: call.event.name.clone(),
            });
        }

        info!(
            function = function.slug(),
            event = %call.event.name,
            run_id = ?call.ctx.run_id,
            attempt = call.ctx.attempt,
            "running job function"
        );
        let result = function.run(&call.event).await;
        if let Err(e) = &result {
            warn!(function = function.slug(), error = %e, retriable = e.is_retriable(), "job function failed");
        }
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Echo;

    #[async_trait]
    impl JobFunction for Echo {
        fn slug(&self) -> &'static str {
            "echo"
        }
        fn name(&self) -> &'static str {
            "Echo"
        }
        fn triggers(&self) -> &'static [&'static str] {
            &["test/echo"]
        }
        async fn run(&self, event: &JobEvent) -> Result<Value, JobError> {
            Ok(event.data.clone())
        }
    }

    fn call(name: &str) -> JobCall {
        serde_json::from_value(json!({ "event": { "name": name, "data": { "n": 1 } } })).unwrap()
    }

    #[test]
    fn resolves_slug_and_qualified_id() {
        let registry = JobRegistry::new("interview").register(Echo);
        assert!(registry.resolve("echo").is_some());
        assert!(registry.resolve("interview-echo").is_some());
        assert!(registry.resolve("other-echo").is_none());
    }

    #[test]
    fn manifest_points_back_at_the_serve_url() {
        let registry = JobRegistry::new("interview").register(Echo);
        let manifest = registry.manifest("http://localhost:3000/api/inngest");
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0]["id"], "interview-echo");
        assert_eq!(manifest[0]["triggers"][0]["event"], "test/echo");
        assert_eq!(
            manifest[0]["steps"]["step"]["runtime"]["url"],
            "http://localhost:3000/api/inngest?fnId=interview-echo&stepId=step"
        );
    }

    #[tokio::test]
    async fn dispatch_checks_function_and_trigger() {
        let registry = JobRegistry::new("interview").register(Echo);

        let out = registry.dispatch("interview-echo", &call("test/echo")).await.unwrap();
        assert_eq!(out, json!({ "n": 1 }));

        let unknown = registry.dispatch("nope", &call("test/echo")).await.unwrap_err();
        assert!(matches!(unknown, JobError::UnknownFunction(_)));

        let wrong = registry.dispatch("echo", &call("test/other")).await.unwrap_err();
        assert!(matches!(wrong, JobError::UnexpectedEvent { .. }));
        assert!(!wrong.is_retriable());
    }
}
