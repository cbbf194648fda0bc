//! Staging Area
//!
//! Uploads are written here before an external tool reads them. Each staged
//! file belongs to exactly one request and is removed once the tool has
//! finished, whatever the outcome.

use std::io;
use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use tokio::io::AsyncWriteExt;

use super::naming;
use crate::error::AppError;

/// Staging directory for incoming uploads
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stream a multipart field to disk under a unique name.
    pub async fn stage_field(&self, mut field: Field<'_>) -> Result<StagedUpload, AppError> {
        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let mut upload = self.reserve(original_name, content_type);

        let mut file = tokio::fs::File::create(&upload.path).await?;
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
            upload.size += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(
            file_name = %upload.original_name,
            staged = %upload.path.display(),
            size = upload.size,
            content_type = ?upload.content_type,
            "Upload staged"
        );

        Ok(upload)
    }

    #[cfg(test)]
    pub(crate) async fn stage_bytes(&self, original_name: &str, data: &[u8]) -> io::Result<StagedUpload> {
        let mut upload = self.reserve(original_name.to_string(), None);
        tokio::fs::write(&upload.path, data).await?;
        upload.size = data.len() as u64;
        Ok(upload)
    }

    /// The returned value owns the path from here on; dropping it removes
    /// whatever has been written.
    fn reserve(&self, original_name: String, content_type: Option<String>) -> StagedUpload {
        let path = self.dir.join(naming::staged_name(&original_name));
        StagedUpload {
            original_name,
            content_type,
            path,
            size: 0,
            armed: true,
        }
    }
}

/// A file staged for a single conversion request
#[derive(Debug)]
pub struct StagedUpload {
    original_name: String,
    content_type: Option<String>,
    path: PathBuf,
    size: u64,
    armed: bool,
}

impl StagedUpload {
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Storage name without extension; tools derive their output names from it.
    pub fn stem(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .map(naming::file_stem)
            .unwrap_or_default()
    }

    /// Delete the staged file.
    pub async fn discard(mut self) -> io::Result<()> {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        // Reached when a request is abandoned before `discard` ran.
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), "Failed to remove staged upload: {}", e);
                }
            }
        }
    }
}

/// Remove every staged upload of a request, logging failures.
///
/// Cleanup never fails the request; the tool outcome decides the response.
pub async fn discard_all(uploads: Vec<StagedUpload>) {
    let results = futures::future::join_all(uploads.into_iter().map(|upload| async move {
        let path = upload.path().to_path_buf();
        (path, upload.discard().await)
    }))
    .await;

    for (path, result) in results {
        match result {
            Ok(()) => tracing::debug!(path = %path.display(), "Staged upload removed"),
            Err(e) => tracing::warn!(path = %path.display(), "Failed to remove staged upload: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn entries(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        let mut read_dir = tokio::fs::read_dir(dir).await.unwrap();
        while let Some(entry) = read_dir.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names
    }

    #[tokio::test]
    async fn test_stage_and_discard() {
        let tmp = TempDir::new().unwrap();
        let staging = StagingArea::new(tmp.path().to_path_buf());

        let upload = staging.stage_bytes("doc.docx", b"hello").await.unwrap();
        assert_eq!(upload.size(), 5);
        assert_eq!(upload.original_name(), "doc.docx");
        assert!(upload.stem().ends_with("-doc"));
        assert_eq!(tokio::fs::read(upload.path()).await.unwrap(), b"hello");

        upload.discard().await.unwrap();
        assert!(entries(tmp.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_drop_removes_staged_file() {
        let tmp = TempDir::new().unwrap();
        let staging = StagingArea::new(tmp.path().to_path_buf());

        {
            let _upload = staging.stage_bytes("slides.pptx", b"data").await.unwrap();
            assert_eq!(entries(tmp.path()).await.len(), 1);
        }

        assert!(entries(tmp.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_collide() {
        let tmp = TempDir::new().unwrap();
        let staging = StagingArea::new(tmp.path().to_path_buf());

        let (a, b) = tokio::join!(
            staging.stage_bytes("doc.docx", b"first"),
            staging.stage_bytes("doc.docx", b"second"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.path(), b.path());
        assert_eq!(tokio::fs::read(a.path()).await.unwrap(), b"first");
        assert_eq!(tokio::fs::read(b.path()).await.unwrap(), b"second");

        discard_all(vec![a, b]).await;
        assert!(entries(tmp.path()).await.is_empty());
    }

    #[tokio::test]
    async fn test_discard_tolerates_missing_file() {
        let tmp = TempDir::new().unwrap();
        let staging = StagingArea::new(tmp.path().to_path_buf());

        let upload = staging.stage_bytes("a.pdf", b"%PDF-1.4").await.unwrap();
        std::fs::remove_file(upload.path()).unwrap();
        assert!(upload.discard().await.is_ok());
    }
}
