use utoipa::OpenApi;

use crate::routes::{chat, health, jobs, root, session, video_calls};

#[derive(OpenApi)]
#[openapi(info(
    title = "interview-server",
    description = "interview platform API",
    version = "0.1.0"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.merge(root::RootApi::openapi());
    doc.merge(health::HealthApi::openapi());
    doc.merge(video_calls::VideoCallsApi::openapi());
    doc.merge(session::SessionApi::openapi());
    doc.merge(chat::ChatApi::openapi());
    doc.merge(jobs::JobsApi::openapi());
    doc
}
