//! PDF compressor
//!
//! Structural compression with `qpdf`: object streams are generated and
//! stream data compressed. The output name is chosen here, never derived
//! from the input, so concurrent compressions cannot overwrite each other.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;

use super::runner::{run_tool, tool_name};
use super::ConversionError;
use crate::storage::naming;

/// qpdf exit code for "succeeded with warnings"
const QPDF_EXIT_WARNINGS: i32 = 3;

#[derive(Debug, Clone)]
pub struct Compressor {
    program: PathBuf,
    timeout: Duration,
}

impl Compressor {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Compress `input` into a fresh `compressed-<token>.pdf` in `output_dir`.
    pub async fn compress(&self, input: &Path, output_dir: &Path) -> Result<PathBuf, ConversionError> {
        let tool = tool_name(&self.program);
        let output = output_dir.join(naming::artifact_name("compressed", "pdf"));

        let mut cmd = Command::new(&self.program);
        cmd.arg("--object-streams=generate")
            .arg("--stream-data=compress")
            .arg(input)
            .arg(&output);

        tracing::debug!(tool = %tool, input = %input.display(), "Compressing PDF");
        let result = match run_tool(&tool, &mut cmd, self.timeout, &[0, QPDF_EXIT_WARNINGS]).await {
            Ok(result) => result,
            Err(e) => {
                // qpdf may leave a truncated file behind on failure
                let _ = tokio::fs::remove_file(&output).await;
                return Err(e);
            }
        };
        if result.code() == Some(QPDF_EXIT_WARNINGS) {
            tracing::warn!(tool = %tool, warnings = %result.stderr, "Compression finished with warnings");
        }

        match tokio::fs::try_exists(&output).await {
            Ok(true) => Ok(output),
            Ok(false) => Err(ConversionError::MissingOutput { tool, path: output }),
            Err(e) => Err(ConversionError::Io { tool, source: e }),
        }
    }
}
