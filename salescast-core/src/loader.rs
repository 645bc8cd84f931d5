//! Reading the source file into a [`RawTable`].
//!
//! Candidate encodings are tried in order with strict decoding. The first one
//! that decodes the whole file wins; when that is not the first candidate a
//! single fallback event is emitted.

use crate::error::DataError;
use crate::progress::{PipelineEvent, PipelineProgress};
use crate::table::RawTable;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use polars::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Field values read as missing, in addition to empty fields.
pub const MISSING_VALUE_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Options controlling how the source file is read.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Encodings to try, in order. Must not be empty.
    pub encodings: Vec<&'static Encoding>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            encodings: vec![UTF_8, WINDOWS_1252],
        }
    }
}

/// Load a comma-separated file with a header row.
pub fn load_table(
    path: &Path,
    opts: &LoadOptions,
    progress: &dyn PipelineProgress,
) -> Result<RawTable, DataError> {
    let bytes = read_source(path)?;
    load_bytes(path, &bytes, opts, progress)
}

/// Existence is checked before any read is attempted.
pub fn read_source(path: &Path) -> Result<Vec<u8>, DataError> {
    if !path.is_file() {
        return Err(DataError::NotFound {
            path: path.to_path_buf(),
            reason: if path.exists() {
                "not a regular file".into()
            } else {
                "no such file".into()
            },
        });
    }
    fs::read(path).map_err(|e| DataError::NotFound {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Decode and parse bytes already read from `path`.
pub fn load_bytes(
    path: &Path,
    bytes: &[u8],
    opts: &LoadOptions,
    progress: &dyn PipelineProgress,
) -> Result<RawTable, DataError> {
    let mut tried = Vec::with_capacity(opts.encodings.len());

    for (i, &encoding) in opts.encodings.iter().enumerate() {
        if i > 0 {
            let failed = opts.encodings[i - 1].name();
            progress.on_event(&PipelineEvent::EncodingFallback {
                failed,
                using: encoding.name(),
            });
        }
        tried.push(encoding.name().to_string());

        let Some(text) = decode_strict(bytes, encoding) else {
            tracing::debug!(encoding = encoding.name(), "strict decode failed");
            continue;
        };

        let frame = parse_csv(text)?;
        progress.on_event(&PipelineEvent::Loaded {
            path: path.to_path_buf(),
            rows: frame.height(),
            columns: frame.width(),
            encoding: encoding.name(),
        });
        return Ok(RawTable::new(frame, encoding));
    }

    Err(DataError::Decode {
        path: path.to_path_buf(),
        tried,
    })
}

/// Decode without replacement characters; `None` on any malformed sequence.
fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let bytes = if encoding == UTF_8 {
        bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
    } else {
        bytes
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

/// Parse decoded text into a frame. Column types are inferred over every row.
fn parse_csv(text: String) -> Result<DataFrame, DataError> {
    let null_values = NullValues::AllColumns(
        MISSING_VALUE_TOKENS.iter().map(|token| (*token).into()).collect(),
    );
    let opts = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .map_parse_options(move |parse| parse.with_null_values(Some(null_values.clone())));

    opts.into_reader_with_file_handle(Cursor::new(text.into_bytes()))
        .finish()
        .map_err(DataError::Csv)
}
