//! Conversion Gateway Library
//!
//! HTTP front for external conversion tools. Uploads are staged under unique
//! names, handed to one tool per request, removed afterwards, and the
//! produced artifacts are served back under `/converted`.
//!
//! # Modules
//!
//! - `routes`: HTTP surface (conversion endpoints, downloads, health)
//! - `convert`: tool wrappers (soffice, pdftoppm, qpdf, lopdf merge)
//! - `storage`: staging area, artifact area and naming
//! - `config`: environment configuration

pub mod config;
pub mod convert;
pub mod error;
pub mod routes;
pub mod state;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
