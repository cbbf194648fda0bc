//! Conversion errors

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of an external tool or of the merge library
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("{tool} could not be started: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} timed out after {}s", .timeout.as_secs())]
    TimedOut { tool: String, timeout: Duration },

    #[error("{tool} exited with {status}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} produced no output at {}", .path.display())]
    MissingOutput { tool: String, path: PathBuf },

    #[error("Merging needs at least two PDFs, got {0}")]
    NotEnoughInputs(usize),

    #[error("PDF merge failed: {0}")]
    Merge(#[from] lopdf::Error),

    #[error("IO error while handling {tool} output: {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} worker stopped unexpectedly: {message}")]
    Worker { tool: String, message: String },
}

impl ConversionError {
    /// Diagnostic text worth returning to the client, if any.
    pub fn detail(&self) -> Option<String> {
        match self {
            ConversionError::Failed { stderr, .. } if !stderr.is_empty() => Some(stderr.clone()),
            ConversionError::Failed { .. } => None,
            other => Some(other.to_string()),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ConversionError::TimedOut { .. })
    }
}
