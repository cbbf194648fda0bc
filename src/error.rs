//! Error types for the Conversion Gateway

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::convert::{ConversionError, Operation};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or insufficient input, caught before any tool runs
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{operation} failed: {source}")]
    Conversion {
        operation: Operation,
        #[source]
        source: ConversionError,
    },

    #[error("Upload error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn conversion(operation: Operation, source: ConversionError) -> Self {
        AppError::Conversion { operation, source }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conversion { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Multipart(e) => e.status(),
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error, detail) = match &self {
            AppError::Validation(msg) => {
                tracing::warn!("Rejected request: {}", msg);
                (msg.clone(), None)
            }
            AppError::Conversion { operation, source } => {
                if source.is_timeout() {
                    tracing::warn!(operation = %operation, "Conversion timed out: {}", source);
                } else {
                    tracing::error!(operation = %operation, "Conversion error: {}", source);
                }
                (operation.failure_message().to_string(), source.detail())
            }
            AppError::Multipart(e) => {
                tracing::warn!("Multipart error: {}", e);
                ("Failed to read upload".to_string(), Some(e.body_text()))
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                ("IO error".to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error,
            detail,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_is_bad_request() {
        let response = AppError::validation("No file uploaded").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "No file uploaded");
        assert!(body.get("detail").is_none());
    }

    #[tokio::test]
    async fn test_conversion_failure_carries_stderr() {
        let err = AppError::conversion(
            Operation::CompressPdf,
            ConversionError::Failed {
                tool: "qpdf".to_string(),
                status: "exit status: 2".to_string(),
                stderr: "qpdf: file is damaged".to_string(),
            },
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Compression failed");
        assert_eq!(body["detail"], "qpdf: file is damaged");
    }

    #[tokio::test]
    async fn test_timeout_is_server_error_with_detail() {
        let source = ConversionError::TimedOut {
            tool: "soffice".to_string(),
            timeout: std::time::Duration::from_secs(120),
        };
        assert!(source.is_timeout());

        let response = AppError::conversion(Operation::DocumentToPdf, source).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Conversion failed");
        assert_eq!(body["detail"], "soffice timed out after 120s");
    }

    #[tokio::test]
    async fn test_io_error_hides_details() {
        let err = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "IO error");
    }
}
