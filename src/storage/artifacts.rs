//! Output area for converted artifacts
//!
//! Tools write into this directory and everything in it is served as-is
//! under [`URL_PREFIX`]. The gateway never deletes artifacts; retention is
//! left to the deployment.

use std::path::{Path, PathBuf};

/// URL prefix the output directory is mounted at
pub const URL_PREFIX: &str = "/converted";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute path for an artifact name.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Download path for a file inside the output directory.
    ///
    /// Returns `None` when `path` is not directly inside the output area.
    pub fn download_url(&self, path: &Path) -> Option<String> {
        if path.parent()? != self.dir.as_path() {
            return None;
        }
        path.file_name()
            .and_then(|n| n.to_str())
            .map(download_url_for)
    }
}

/// Download path for an artifact name.
pub fn download_url_for(name: &str) -> String {
    format!("{}/{}", URL_PREFIX, name)
}
