//! Conversion Routes
//!
//! One endpoint per operation. Every handler follows the same order:
//! stage the uploads, run the tool, remove the staged inputs whatever the
//! outcome, and only then shape the response.
//!
//! Endpoints:
//! - POST /convert/document-to-pdf (alias /convert/word-to-pdf)
//! - POST /convert/image-to-pdf (alias /convert/jpg-to-pdf)
//! - POST /convert/pdf-to-images (alias /convert/pdf-to-jpg)
//! - POST /convert/compress-pdf
//! - POST /convert/merge-pdf

use std::path::{Path, PathBuf};
use std::time::Instant;

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tokio::io::AsyncReadExt;

use crate::convert::Operation;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::{discard_all, download_url_for, naming, StagedUpload};

/// Multipart field carrying the file of single-file operations
const FILE_FIELD: &str = "file";

/// Multipart field carrying the files to merge
const FILES_FIELD: &str = "files";

/// A PDF header may sit anywhere in the first 1024 bytes
const PDF_HEADER_WINDOW: u64 = 1024;

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub success: bool,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct PageImagesResponse {
    pub success: bool,
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub file: String,
}

// ============================================================================
// Router
// ============================================================================

/// Create the conversion router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/document-to-pdf", post(document_to_pdf))
        .route("/word-to-pdf", post(document_to_pdf))
        .route("/image-to-pdf", post(image_to_pdf))
        .route("/jpg-to-pdf", post(image_to_pdf))
        .route("/pdf-to-images", post(pdf_to_images))
        .route("/pdf-to-jpg", post(pdf_to_images))
        .route("/compress-pdf", post(compress_pdf))
        .route("/merge-pdf", post(merge_pdf))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /convert/document-to-pdf
async fn document_to_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DownloadResponse>> {
    office_to_pdf(&state, multipart, Operation::DocumentToPdf).await
}

/// POST /convert/image-to-pdf
async fn image_to_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DownloadResponse>> {
    office_to_pdf(&state, multipart, Operation::ImageToPdf).await
}

/// Documents and images both go through the office converter.
async fn office_to_pdf(
    state: &AppState,
    multipart: Multipart,
    operation: Operation,
) -> Result<Json<DownloadResponse>> {
    let upload = single_upload(state, multipart).await?;
    let started = log_start(operation, std::slice::from_ref(&upload));

    let result = state
        .toolchain()
        .office
        .convert_to_pdf(upload.path(), state.artifacts().dir())
        .await;
    discard_all(vec![upload]).await;

    let pdf = result.map_err(|e| AppError::conversion(operation, e))?;
    let download_url = artifact_url(state, &pdf)?;

    log_done(operation, started, 1);
    Ok(Json(DownloadResponse {
        success: true,
        download_url,
    }))
}

/// POST /convert/pdf-to-images
///
/// Returns one download path per page, in page order.
async fn pdf_to_images(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PageImagesResponse>> {
    let operation = Operation::PdfToImages;
    let upload = single_upload(&state, multipart).await?;
    let started = log_start(operation, std::slice::from_ref(&upload));

    // The staged stem carries the uniqueness token, so no other request can
    // produce files under this prefix.
    let prefix = upload.stem().to_string();
    let result = state
        .toolchain()
        .rasterizer
        .rasterize(upload.path(), state.artifacts().dir(), &prefix)
        .await;
    discard_all(vec![upload]).await;

    let pages = result.map_err(|e| AppError::conversion(operation, e))?;

    log_done(operation, started, pages.len());
    Ok(Json(PageImagesResponse {
        success: true,
        files: pages.iter().map(|name| download_url_for(name)).collect(),
    }))
}

/// POST /convert/compress-pdf
async fn compress_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<FileResponse>> {
    let operation = Operation::CompressPdf;
    let upload = single_upload(&state, multipart).await?;
    let started = log_start(operation, std::slice::from_ref(&upload));

    let result = state
        .toolchain()
        .compressor
        .compress(upload.path(), state.artifacts().dir())
        .await;
    discard_all(vec![upload]).await;

    let compressed = result.map_err(|e| AppError::conversion(operation, e))?;
    let file = artifact_url(&state, &compressed)?;

    log_done(operation, started, 1);
    Ok(Json(FileResponse { file }))
}

/// POST /convert/merge-pdf
///
/// Pages are concatenated in the order the files were submitted.
async fn merge_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<FileResponse>> {
    let operation = Operation::MergePdf;
    let uploads = collect_uploads(&state, multipart, FILES_FIELD).await?;

    if uploads.len() < 2 {
        discard_all(uploads).await;
        return Err(AppError::validation("Upload at least two PDF files."));
    }

    let mut rejected = None;
    for upload in &uploads {
        if !looks_like_pdf(upload.path()).await? {
            rejected = Some(format!("{} is not a PDF file", display_name(upload)));
            break;
        }
    }
    if let Some(message) = rejected {
        discard_all(uploads).await;
        return Err(AppError::validation(message));
    }

    let started = log_start(operation, &uploads);
    let inputs: Vec<PathBuf> = uploads.iter().map(|u| u.path().to_path_buf()).collect();
    let output = state
        .artifacts()
        .path_for(&naming::artifact_name("merged", "pdf"));

    let result = state.toolchain().merger.merge(inputs, output.clone()).await;
    discard_all(uploads).await;

    result.map_err(|e| AppError::conversion(operation, e))?;
    let file = artifact_url(&state, &output)?;

    log_done(operation, started, 1);
    Ok(Json(FileResponse { file }))
}

// ============================================================================
// Helpers
// ============================================================================

/// Stage every file sent under `field_name`, in submission order.
///
/// Parts without a file name (plain form fields, empty file inputs) are
/// ignored. If reading fails halfway, uploads staged so far are removed when
/// dropped.
async fn collect_uploads(
    state: &AppState,
    mut multipart: Multipart,
    field_name: &str,
) -> Result<Vec<StagedUpload>> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        if name != field_name {
            tracing::debug!(field = %name, "Ignoring unexpected multipart field");
            continue;
        }
        if field.file_name().map_or(true, str::is_empty) {
            tracing::debug!(field = %name, "Ignoring multipart field without a file");
            continue;
        }

        uploads.push(state.staging().stage_field(field).await?);
    }

    Ok(uploads)
}

/// Stage the single `file` upload of a one-file operation.
async fn single_upload(state: &AppState, multipart: Multipart) -> Result<StagedUpload> {
    let mut uploads = collect_uploads(state, multipart, FILE_FIELD).await?;

    match uploads.len() {
        1 => Ok(uploads.remove(0)),
        0 => Err(AppError::validation("No file uploaded")),
        n => {
            discard_all(uploads).await;
            Err(AppError::validation(format!(
                "Expected exactly one file, got {}",
                n
            )))
        }
    }
}

/// Check for a `%PDF-` header near the start of the file.
async fn looks_like_pdf(path: &Path) -> std::io::Result<bool> {
    let file = tokio::fs::File::open(path).await?;
    let mut head = Vec::with_capacity(PDF_HEADER_WINDOW as usize);
    file.take(PDF_HEADER_WINDOW).read_to_end(&mut head).await?;
    Ok(head.windows(5).any(|w| w == b"%PDF-"))
}

fn artifact_url(state: &AppState, path: &Path) -> Result<String> {
    state.artifacts().download_url(path).ok_or_else(|| {
        AppError::Io(std::io::Error::other(format!(
            "artifact {} is outside the output directory",
            path.display()
        )))
    })
}

fn display_name(upload: &StagedUpload) -> &str {
    match upload.original_name() {
        "" => "upload",
        name => name,
    }
}

fn log_start(operation: Operation, uploads: &[StagedUpload]) -> Instant {
    let names: Vec<&str> = uploads.iter().map(display_name).collect();
    let content_types: Vec<&str> = uploads
        .iter()
        .map(|u| u.content_type().unwrap_or("unknown"))
        .collect();
    let bytes: u64 = uploads.iter().map(StagedUpload::size).sum();
    tracing::info!(
        operation = %operation,
        files = ?names,
        content_types = ?content_types,
        bytes,
        "Conversion started"
    );
    Instant::now()
}

fn log_done(operation: Operation, started: Instant, artifacts: usize) {
    tracing::info!(
        operation = %operation,
        artifacts,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Conversion complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_looks_like_pdf() {
        let tmp = TempDir::new().unwrap();
        let pdf = tmp.path().join("a.pdf");
        let padded = tmp.path().join("b.pdf");
        let text = tmp.path().join("c.txt");
        std::fs::write(&pdf, b"%PDF-1.7\n...").unwrap();
        std::fs::write(&padded, [vec![0u8; 100], b"%PDF-1.4".to_vec()].concat()).unwrap();
        std::fs::write(&text, b"hello world").unwrap();

        assert!(looks_like_pdf(&pdf).await.unwrap());
        assert!(looks_like_pdf(&padded).await.unwrap());
        assert!(!looks_like_pdf(&text).await.unwrap());
    }

    #[tokio::test]
    async fn test_header_beyond_window_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let late = tmp.path().join("late.pdf");
        std::fs::write(&late, [vec![b' '; 2048], b"%PDF-1.4".to_vec()].concat()).unwrap();

        assert!(!looks_like_pdf(&late).await.unwrap());
    }

    #[test]
    fn test_response_shapes() {
        let download = serde_json::to_value(DownloadResponse {
            success: true,
            download_url: "/converted/x.pdf".to_string(),
        })
        .unwrap();
        assert_eq!(download["downloadUrl"], "/converted/x.pdf");

        let file = serde_json::to_value(FileResponse {
            file: "/converted/merged-x.pdf".to_string(),
        })
        .unwrap();
        assert_eq!(file, serde_json::json!({ "file": "/converted/merged-x.pdf" }));
    }
}
