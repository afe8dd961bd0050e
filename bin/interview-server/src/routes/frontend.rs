//! Built single-page frontend, served in production only.

use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};
use tracing::warn;

/// Static files under `dist`; any path without a matching file gets
/// `index.html` so client-side routes resolve.
pub fn service(dist: &Path) -> ServeDir<ServeFile> {
    let index = dist.join("index.html");
    if !index.is_file() {
        warn!(path = %index.display(), "frontend index.html not found; SPA routes will 404");
    }
    ServeDir::new(dist).fallback(ServeFile::new(index))
}
