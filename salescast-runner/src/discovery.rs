//! Input path resolution.
//!
//! An explicit path always wins and is returned unchecked so that the loader
//! reports a missing file with its own error. Otherwise the first candidate
//! that exists as a regular file is used.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("dataset not found in any expected location: {}", format_tried(.tried))]
    NoCandidate { tried: Vec<PathBuf> },
}

fn format_tried(tried: &[PathBuf]) -> String {
    if tried.is_empty() {
        return "(no candidates configured)".into();
    }
    tried
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pick the input file.
pub fn discover_input(
    explicit: Option<&Path>,
    candidates: &[PathBuf],
) -> Result<PathBuf, DiscoveryError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    candidates
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or_else(|| DiscoveryError::NoCandidate {
            tried: candidates.to_vec(),
        })
}
