use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response body for `GET /api/inngest`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobsIntrospection {
    pub app_id: String,
    pub function_count: usize,
    pub has_signing_key: bool,
    /// `"cloud"` in production, `"dev"` otherwise.
    pub mode: String,
}

/// Query string of execution callbacks.
#[derive(Debug, Clone, Deserialize)]
pub struct JobCallQuery {
    #[serde(rename = "fnId")]
    pub fn_id: Option<String>,
    #[serde(rename = "stepId", default)]
    pub step_id: Option<String>,
}
