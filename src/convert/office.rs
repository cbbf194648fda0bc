//! Office converter
//!
//! Document and image to PDF through a headless LibreOffice (`soffice`).
//! The tool names its output after the input, so the wrapper computes
//! `<stem>.pdf` itself instead of parsing stdout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;

use super::runner::{run_tool, tool_name};
use super::ConversionError;
use crate::storage::naming;

#[derive(Debug, Clone)]
pub struct OfficeConverter {
    program: PathBuf,
    timeout: Duration,
    isolated_profile: bool,
}

impl OfficeConverter {
    pub fn new(program: PathBuf, timeout: Duration, isolated_profile: bool) -> Self {
        Self {
            program,
            timeout,
            isolated_profile,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Convert `input` to PDF inside `output_dir` and return the PDF path.
    pub async fn convert_to_pdf(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, ConversionError> {
        let tool = tool_name(&self.program);
        let expected = output_dir.join(pdf_name_for(input));

        // soffice refuses to run twice against the same user profile, so
        // concurrent conversions each get a private one.
        let profile = self
            .isolated_profile
            .then(|| std::env::temp_dir().join(format!("gateway-soffice-{}", naming::uniqueness_token())));

        let mut cmd = Command::new(&self.program);
        cmd.arg("--headless");
        if let Some(profile) = &profile {
            cmd.arg(format!("-env:UserInstallation={}", file_url(profile)));
        }
        cmd.arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(output_dir)
            .arg(input);

        tracing::debug!(tool = %tool, input = %input.display(), "Converting to PDF");
        let result = run_tool(&tool, &mut cmd, self.timeout, &[0]).await;

        if let Some(profile) = &profile {
            if let Err(e) = tokio::fs::remove_dir_all(profile).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(profile = %profile.display(), "Failed to remove soffice profile: {}", e);
                }
            }
        }
        result?;

        match tokio::fs::try_exists(&expected).await {
            Ok(true) => Ok(expected),
            Ok(false) => Err(ConversionError::MissingOutput {
                tool,
                path: expected,
            }),
            Err(e) => Err(ConversionError::Io { tool, source: e }),
        }
    }
}

/// `<stem>.pdf` for an input path.
pub fn pdf_name_for(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}.pdf", naming::file_stem(&name))
}

fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{}", path)
    } else {
        format!("file:///{}", path)
    }
}
