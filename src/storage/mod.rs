//! Filesystem areas used by the gateway
//!
//! - `staging`: uploads waiting for a tool, deleted after every request
//! - `artifacts`: tool output, served under `/converted`
//! - `naming`: collision-free storage names

pub mod artifacts;
pub mod naming;
pub mod staging;

use std::io;
use std::path::PathBuf;

pub use artifacts::{download_url_for, ArtifactStore, URL_PREFIX};
pub use staging::{discard_all, StagedUpload, StagingArea};

use crate::config::StorageConfig;

/// Create the staging and output directories if needed.
///
/// Idempotent; returns both directories as absolute paths so that tools
/// started from another working directory resolve them the same way.
pub async fn ensure_dirs(config: &StorageConfig) -> io::Result<(PathBuf, PathBuf)> {
    tokio::fs::create_dir_all(&config.staging_dir).await?;
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let staging = tokio::fs::canonicalize(&config.staging_dir).await?;
    let output = tokio::fs::canonicalize(&config.output_dir).await?;

    tracing::info!(
        staging = %staging.display(),
        output = %output.display(),
        "Storage directories ready"
    );

    Ok((staging, output))
}
