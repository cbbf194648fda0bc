//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::convert::{ToolAvailability, Toolchain};
use crate::storage::{self, ArtifactStore, StagingArea};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to prepare storage directories: {0}")]
    Storage(#[from] std::io::Error),
}

/// Shared application state
///
/// Read-only after startup; requests share nothing else.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    staging: StagingArea,
    artifacts: ArtifactStore,
    toolchain: Toolchain,
    tools: ToolAvailability,
}

impl AppState {
    /// Create a new application state
    ///
    /// Creates the staging and output directories and probes the external
    /// tools once, before anything can be served.
    pub async fn new(config: Config) -> Result<Self, StateError> {
        let (staging_dir, output_dir) = storage::ensure_dirs(&config.storage).await?;
        let toolchain = Toolchain::from_config(&config.tools);
        let tools = toolchain.probe().await;
        if !(tools.soffice && tools.pdftoppm && tools.qpdf) {
            tracing::warn!(?tools, "Some conversion tools are unavailable; matching requests will fail");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                staging: StagingArea::new(staging_dir),
                artifacts: ArtifactStore::new(output_dir),
                toolchain,
                tools,
                config,
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the staging area
    pub fn staging(&self) -> &StagingArea {
        &self.inner.staging
    }

    /// Get the artifact store
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.inner.artifacts
    }

    /// Get the conversion backends
    pub fn toolchain(&self) -> &Toolchain {
        &self.inner.toolchain
    }

    /// Tool availability as probed at startup
    pub fn tool_availability(&self) -> &ToolAvailability {
        &self.inner.tools
    }
}
