//! End-to-end pipeline run: load → clean → features → monthly aggregate.
//!
//! Any fatal error discards the whole run; nothing is returned partially.

use salescast_core::{
    aggregate_monthly, clean, derive_features, load_bytes, read_source, DataError, FeaturedTable,
    LoadOptions, MonthlyAggregate, PipelineEvent, PipelineProgress,
};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{ConfigError, PipelineConfig};
use crate::discovery::{discover_input, DiscoveryError};

/// Errors from a pipeline run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Discovery(#[from] DiscoveryError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Everything a single run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub input_path: PathBuf,
    /// BLAKE3 digest of the raw input bytes.
    pub input_hash: String,
    /// Label of the encoding that decoded the input.
    pub encoding: &'static str,
    pub featured: FeaturedTable,
    pub monthly: MonthlyAggregate,
}

/// Run every stage on the file at `path`.
pub fn run_pipeline(
    path: &Path,
    opts: &LoadOptions,
    progress: &dyn PipelineProgress,
) -> Result<PipelineOutput, RunError> {
    let bytes = read_source(path)?;
    let input_hash = blake3::hash(&bytes).to_hex().to_string();

    let raw = load_bytes(path, &bytes, opts, progress)?;
    let encoding = raw.encoding().name();

    let canonical = clean(raw, progress)?;
    let featured = derive_features(canonical, progress)?;

    let monthly = aggregate_monthly(&featured)?;
    progress.on_event(&PipelineEvent::Aggregated {
        months: monthly.len(),
    });

    Ok(PipelineOutput {
        input_path: path.to_path_buf(),
        input_hash,
        encoding,
        featured,
        monthly,
    })
}

/// Resolve the input from `config` (or `explicit`) and run the pipeline.
pub fn run_from_config(
    config: &PipelineConfig,
    explicit: Option<&Path>,
    progress: &dyn PipelineProgress,
) -> Result<PipelineOutput, RunError> {
    let opts = config.load_options()?;
    let explicit = explicit.or(config.input.path.as_deref());
    let path = discover_input(explicit, &config.input.candidates)?;
    tracing::debug!(path = %path.display(), "input resolved");
    run_pipeline(&path, &opts, progress)
}
