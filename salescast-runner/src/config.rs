//! TOML pipeline configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration that looks for the Superstore sample in the usual
//! places and writes CSV outputs under `data/`.

use encoding_rs::Encoding;
use salescast_core::LoadOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown encoding label '{0}'")]
    UnknownEncoding(String),

    #[error("at least one input encoding is required")]
    EmptyEncodings,
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
}

/// Where to find the source file and how to decode it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Explicit input path. Takes precedence over `candidates`.
    pub path: Option<PathBuf>,

    /// Locations tried in order when no explicit path is given.
    pub candidates: Vec<PathBuf>,

    /// Encoding labels tried in order (WHATWG labels, e.g. "utf-8", "latin1").
    pub encodings: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: None,
            candidates: vec![
                PathBuf::from("../data/Sample - Superstore.csv"),
                PathBuf::from("data/Sample - Superstore.csv"),
            ],
            encodings: vec!["utf-8".into(), "windows-1252".into()],
        }
    }
}

/// On-disk format for the two output tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Where and how outputs are written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// File stem of the featured table; the extension follows `format`.
    pub featured_file: String,
    /// File stem of the monthly aggregate.
    pub monthly_file: String,
    pub format: OutputFormat,
    /// Write `manifest.json` next to the outputs.
    pub manifest: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            featured_file: "processed_superstore".into(),
            monthly_file: "monthly_sales".into(),
            format: OutputFormat::Csv,
            manifest: true,
        }
    }
}

impl OutputConfig {
    pub fn featured_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}.{}", self.featured_file, self.format.extension()))
    }

    pub fn monthly_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}.{}", self.monthly_file, self.format.extension()))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join("manifest.json")
    }
}

impl PipelineConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Resolve encoding labels into loader options.
    pub fn load_options(&self) -> Result<LoadOptions, ConfigError> {
        if self.input.encodings.is_empty() {
            return Err(ConfigError::EmptyEncodings);
        }
        let encodings = self
            .input
            .encodings
            .iter()
            .map(|label| {
                Encoding::for_label(label.trim().as_bytes())
                    .ok_or_else(|| ConfigError::UnknownEncoding(label.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LoadOptions { encodings })
    }
}
