//! Artifact download route
//!
//! Serves the output directory read-only. Anyone who knows an artifact's
//! name can fetch it; there is no per-file access check.

use std::path::Path;

use tower_http::services::ServeDir;

/// Static file service over the output directory
///
/// Content types are guessed from the extension, missing names yield 404
/// and paths escaping the directory are rejected.
pub fn service(dir: &Path) -> ServeDir {
    ServeDir::new(dir).append_index_html_on_directories(false)
}
