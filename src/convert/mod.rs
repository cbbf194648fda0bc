//! Conversion wrappers
//!
//! One thin adapter per operation, each translating a staged input and the
//! output directory into an external tool invocation:
//!
//! - `office`: document/image to PDF via `soffice`
//! - `raster`: PDF to page images via `pdftoppm`
//! - `compress`: PDF compression via `qpdf`
//! - `merge`: PDF concatenation via `lopdf`

pub mod compress;
pub mod error;
pub mod merge;
pub mod office;
pub mod raster;
pub mod runner;

use std::fmt;

use serde::Serialize;

pub use compress::Compressor;
pub use error::ConversionError;
pub use merge::Merger;
pub use office::OfficeConverter;
pub use raster::Rasterizer;

use crate::config::ToolsConfig;

/// The operations the gateway offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    DocumentToPdf,
    ImageToPdf,
    PdfToImages,
    CompressPdf,
    MergePdf,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::DocumentToPdf => "document-to-pdf",
            Operation::ImageToPdf => "image-to-pdf",
            Operation::PdfToImages => "pdf-to-images",
            Operation::CompressPdf => "compress-pdf",
            Operation::MergePdf => "merge-pdf",
        }
    }

    /// Message shown to clients when the operation's tool fails
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::DocumentToPdf | Operation::ImageToPdf => "Conversion failed",
            Operation::PdfToImages => "Failed to convert PDF to images",
            Operation::CompressPdf => "Compression failed",
            Operation::MergePdf => "Merging failed",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All conversion backends, configured once at startup
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub office: OfficeConverter,
    pub rasterizer: Rasterizer,
    pub compressor: Compressor,
    pub merger: Merger,
}

/// Which external programs can currently be executed
#[derive(Debug, Clone, Serialize)]
pub struct ToolAvailability {
    pub soffice: bool,
    pub pdftoppm: bool,
    pub qpdf: bool,
}

impl Toolchain {
    pub fn from_config(config: &ToolsConfig) -> Self {
        let timeout = config.timeout();
        Self {
            office: OfficeConverter::new(
                config.soffice.clone(),
                timeout,
                config.isolated_office_profile,
            ),
            rasterizer: Rasterizer::new(
                config.pdftoppm.clone(),
                timeout,
                config.raster_format,
                config.raster_dpi,
            ),
            compressor: Compressor::new(config.qpdf.clone(), timeout),
            merger: Merger::new(timeout),
        }
    }

    /// Try each external program once.
    pub async fn probe(&self) -> ToolAvailability {
        let (soffice, pdftoppm, qpdf) = tokio::join!(
            runner::probe(self.office.program(), "--version"),
            runner::probe(self.rasterizer.program(), "-v"),
            runner::probe(self.compressor.program(), "--version"),
        );
        ToolAvailability {
            soffice,
            pdftoppm,
            qpdf,
        }
    }
}
