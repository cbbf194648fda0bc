//! PDF rasterizer
//!
//! Renders every page of a PDF to an image with `pdftoppm`. The tool writes
//! `<prefix>-<page>.<ext>` files and reports nothing, so the generated pages
//! are discovered by listing the output directory and sorted by their
//! numeric page suffix.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;

use super::runner::{run_tool, tool_name};
use super::ConversionError;
use crate::config::RasterFormat;

#[derive(Debug, Clone)]
pub struct Rasterizer {
    program: PathBuf,
    timeout: Duration,
    format: RasterFormat,
    dpi: Option<u32>,
}

impl Rasterizer {
    pub fn new(program: PathBuf, timeout: Duration, format: RasterFormat, dpi: Option<u32>) -> Self {
        Self {
            program,
            timeout,
            format,
            dpi,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Render all pages of `input` into `output_dir`, using `prefix` for the
    /// file names. Returns the generated file names in page order.
    pub async fn rasterize(
        &self,
        input: &Path,
        output_dir: &Path,
        prefix: &str,
    ) -> Result<Vec<String>, ConversionError> {
        let tool = tool_name(&self.program);

        let mut cmd = Command::new(&self.program);
        cmd.arg(self.format.flag());
        if let Some(dpi) = self.dpi {
            cmd.arg("-r").arg(dpi.to_string());
        }
        cmd.arg(input).arg(output_dir.join(prefix));

        tracing::debug!(tool = %tool, input = %input.display(), prefix, "Rasterizing PDF");
        if let Err(e) = run_tool(&tool, &mut cmd, self.timeout, &[0]).await {
            remove_pages(output_dir, prefix, self.format.extension()).await;
            return Err(e);
        }

        let pages = discover_pages(output_dir, prefix, self.format.extension())
            .await
            .map_err(|e| ConversionError::Io {
                tool: tool.clone(),
                source: e,
            })?;

        if pages.is_empty() {
            return Err(ConversionError::MissingOutput {
                tool,
                path: output_dir.join(format!("{}-1.{}", prefix, self.format.extension())),
            });
        }

        tracing::debug!(pages = pages.len(), prefix, "Rasterized pages discovered");
        Ok(pages)
    }
}

/// List `<prefix>-<page>.<extension>` files in `dir`, ordered by page number.
pub async fn discover_pages(dir: &Path, prefix: &str, extension: &str) -> std::io::Result<Vec<String>> {
    let mut pages = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(page) = page_number(&name, prefix, extension) {
            pages.push((page, name));
        }
    }

    pages.sort_by_key(|(page, _)| *page);
    Ok(pages.into_iter().map(|(_, name)| name).collect())
}

/// Delete pages a failed run managed to write before it stopped.
async fn remove_pages(dir: &Path, prefix: &str, extension: &str) {
    let pages = match discover_pages(dir, prefix, extension).await {
        Ok(pages) => pages,
        Err(e) => {
            tracing::warn!(prefix, "Failed to list partial pages: {}", e);
            return;
        }
    };

    for page in pages {
        let path = dir.join(&page);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), "Failed to remove partial page: {}", e);
        }
    }
}

/// Page number encoded in a generated file name, zero padding allowed.
pub fn page_number(name: &str, prefix: &str, extension: &str) -> Option<u32> {
    let rest = name.strip_prefix(prefix)?.strip_prefix('-')?;
    let digits = rest.strip_suffix(extension)?.strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
