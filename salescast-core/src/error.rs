//! Structured error types for the pipeline stages.
//!
//! These are designed to be displayable directly in the CLI.

use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("input file not found: {path} ({reason})")]
    NotFound { path: PathBuf, reason: String },

    #[error("could not decode {path} with any of: {}", tried.join(", "))]
    Decode { path: PathBuf, tried: Vec<String> },

    #[error("required column '{column}' is missing")]
    MissingColumn { column: String },

    #[error("column '{column}' appears more than once after normalization")]
    DuplicateColumn { column: String },

    #[error("malformed CSV: {0}")]
    Csv(PolarsError),

    #[error("non-numeric value {value:?} in column '{column}' at row {row}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("dataframe operation failed: {0}")]
    Frame(#[from] PolarsError),
}
