//! Salescast Runner: pipeline orchestration on top of `salescast-core`.
//!
//! This crate provides:
//! - TOML configuration with defaults for every field
//! - Input discovery over an ordered candidate list
//! - A single-call pipeline run (load, clean, features, monthly aggregate)
//! - CSV and Parquet export with atomic writes and a JSON run manifest

pub mod config;
pub mod discovery;
pub mod export;
pub mod pipeline;

pub use config::{ConfigError, InputConfig, OutputConfig, OutputFormat, PipelineConfig};
pub use discovery::{discover_input, DiscoveryError};
pub use export::{
    export_monthly_csv, export_table_csv, load_manifest, monthly_to_dataframe, save_outputs,
    write_parquet, RunManifest, SavedArtifacts, MANIFEST_SCHEMA_VERSION,
};
pub use pipeline::{run_from_config, run_pipeline, PipelineOutput, RunError};
