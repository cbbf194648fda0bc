//! Configuration management for the Conversion Gateway

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Where uploads are written before a tool reads them
    pub staging_dir: PathBuf,
    /// Where tools write artifacts; served under `/converted`
    pub output_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    pub soffice: PathBuf,
    pub pdftoppm: PathBuf,
    pub qpdf: PathBuf,
    pub timeout_secs: u64,
    pub raster_format: RasterFormat,
    pub raster_dpi: Option<u32>,
    /// Give every soffice run its own user profile directory
    pub isolated_office_profile: bool,
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Image format produced by the rasterizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    Jpeg,
    Png,
}

impl RasterFormat {
    /// Flag passed to pdftoppm
    pub fn flag(self) -> &'static str {
        match self {
            RasterFormat::Jpeg => "-jpeg",
            RasterFormat::Png => "-png",
        }
    }

    /// Extension pdftoppm gives the generated files
    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Jpeg => "jpg",
            RasterFormat::Png => "png",
        }
    }
}

impl FromStr for RasterFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(RasterFormat::Jpeg),
            "png" => Ok(RasterFormat::Png),
            _ => Err(()),
        }
    }
}

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 120;

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
            },
            storage: StorageConfig {
                staging_dir: PathBuf::from("uploads"),
                output_dir: PathBuf::from("converted"),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            tools: ToolsConfig {
                soffice: PathBuf::from("soffice"),
                pdftoppm: PathBuf::from("pdftoppm"),
                qpdf: PathBuf::from("qpdf"),
                timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
                raster_format: RasterFormat::Jpeg,
                raster_dpi: None,
                isolated_office_profile: true,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            server: ServerConfig {
                host: var("HOST").unwrap_or(defaults.server.host),
                port: parse_or(&lookup, "PORT", defaults.server.port)?,
            },
            storage: StorageConfig {
                staging_dir: var("STAGING_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.staging_dir),
                output_dir: var("OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.output_dir),
                max_upload_bytes: parse_or(
                    &lookup,
                    "MAX_UPLOAD_BYTES",
                    defaults.storage.max_upload_bytes,
                )?,
            },
            tools: ToolsConfig {
                soffice: var("SOFFICE_BIN")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.tools.soffice),
                pdftoppm: var("PDFTOPPM_BIN")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.tools.pdftoppm),
                qpdf: var("QPDF_BIN")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.tools.qpdf),
                timeout_secs: parse_or(&lookup, "TOOL_TIMEOUT_SECS", defaults.tools.timeout_secs)?,
                raster_format: parse_or(&lookup, "RASTER_FORMAT", defaults.tools.raster_format)?,
                raster_dpi: match var("RASTER_DPI") {
                    Some(value) => Some(parse_value("RASTER_DPI", &value)?),
                    None => None,
                },
                isolated_office_profile: parse_or(
                    &lookup,
                    "SOFFICE_ISOLATED_PROFILE",
                    defaults.tools.isolated_office_profile,
                )?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
