//! Persisting pipeline outputs: CSV, Parquet and the JSON run manifest.
//!
//! Output files are written atomically: each is written to a `.tmp` sibling
//! and renamed into place, so a failed run never leaves a half-written table.
//! The manifest carries a `schema_version`; newer versions are rejected on load.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use polars::prelude::*;
use salescast_core::{
    date_to_epoch_days, MonthlyAggregate, PipelineEvent, PipelineProgress, ORDER_DATE, SALES,
};
use serde::{Deserialize, Serialize};

use crate::config::{OutputConfig, OutputFormat};
use crate::pipeline::PipelineOutput;

/// Current schema version for `manifest.json`.
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a frame as CSV with a header row of its column names.
///
/// Dates are ISO 8601, nulls are empty fields.
pub fn export_table_csv(frame: &DataFrame) -> Result<String> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .finish(&mut frame.clone())
        .context("failed to write CSV")?;
    String::from_utf8(buf).context("CSV output is not valid UTF-8")
}

/// Render a total so it always reads back as a float: `150` becomes `150.0`.
fn format_total(total: f64) -> String {
    let text = total.to_string();
    if total.is_finite() && !text.contains('.') {
        format!("{text}.0")
    } else {
        text
    }
}

/// Export the monthly aggregate as `order_date,sales` rows.
pub fn export_monthly_csv(monthly: &MonthlyAggregate) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([ORDER_DATE, SALES])?;
    for m in monthly.iter() {
        wtr.write_record([
            m.month_end.format("%Y-%m-%d").to_string(),
            format_total(m.total_sales),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Parquet export ─────────────────────────────────────────────────

/// Convert the monthly aggregate to a two-column DataFrame.
pub fn monthly_to_dataframe(monthly: &MonthlyAggregate) -> Result<DataFrame> {
    let dates: Vec<i32> = monthly
        .iter()
        .map(|m| date_to_epoch_days(m.month_end))
        .collect();
    let totals: Vec<f64> = monthly.iter().map(|m| m.total_sales).collect();

    DataFrame::new(vec![
        Column::new(ORDER_DATE.into(), dates)
            .cast(&DataType::Date)
            .context("date cast")?,
        Column::new(SALES.into(), totals),
    ])
    .context("dataframe creation")
}

/// Write a DataFrame to a Parquet file.
pub fn write_parquet(df: &DataFrame, path: &Path) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .with_context(|| format!("failed to write parquet {}", path.display()))?;
    Ok(())
}

// ─── Run manifest ───────────────────────────────────────────────────

/// JSON sidecar describing one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub schema_version: u32,
    pub input_path: PathBuf,
    pub input_hash: String,
    pub encoding: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub months: usize,
    pub first_month: Option<NaiveDate>,
    pub last_month: Option<NaiveDate>,
    pub total_sales: f64,
    pub format: OutputFormat,
    pub featured_path: PathBuf,
    pub monthly_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl RunManifest {
    pub fn from_output(output: &PipelineOutput, config: &OutputConfig) -> Self {
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            input_path: output.input_path.clone(),
            input_hash: output.input_hash.clone(),
            encoding: output.encoding.to_string(),
            rows: output.featured.height(),
            columns: output
                .featured
                .get_column_names()
                .iter()
                .map(|name| name.to_string())
                .collect(),
            months: output.monthly.len(),
            first_month: output.monthly.months.first().map(|m| m.month_end),
            last_month: output.monthly.months.last().map(|m| m.month_end),
            total_sales: output.monthly.total(),
            format: config.format,
            featured_path: config.featured_path(),
            monthly_path: config.monthly_path(),
            created_at: Utc::now(),
        }
    }
}

/// Load a manifest, rejecting unknown schema versions.
pub fn load_manifest(path: &Path) -> Result<RunManifest> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: RunManifest =
        serde_json::from_str(&json).context("failed to deserialize run manifest")?;
    if manifest.schema_version > MANIFEST_SCHEMA_VERSION {
        bail!(
            "unsupported manifest schema version {} (max supported: {})",
            manifest.schema_version,
            MANIFEST_SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Paths written by [`save_outputs`].
#[derive(Debug, Clone, PartialEq)]
pub struct SavedArtifacts {
    pub featured: PathBuf,
    pub monthly: PathBuf,
    pub manifest: Option<PathBuf>,
}

/// Write to `{path}.tmp` through `write`, then rename into place.
fn write_atomic(path: &Path, write: impl FnOnce(&Path) -> Result<()>) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);

    if let Err(e) = write(&tmp_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        anyhow::anyhow!("atomic rename to {} failed: {e}", path.display())
    })
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    write_atomic(path, |tmp| {
        fs::write(tmp, text).with_context(|| format!("failed to write {}", tmp.display()))
    })
}

/// Save the featured table, the monthly aggregate and (optionally) the manifest.
///
/// Creates the output directory if needed.
pub fn save_outputs(
    output: &PipelineOutput,
    config: &OutputConfig,
    progress: &dyn PipelineProgress,
) -> Result<SavedArtifacts> {
    fs::create_dir_all(&config.dir)
        .with_context(|| format!("failed to create output dir: {}", config.dir.display()))?;

    let featured_path = config.featured_path();
    let monthly_path = config.monthly_path();

    match config.format {
        OutputFormat::Csv => {
            write_text(&featured_path, &export_table_csv(&output.featured)?)?;
            progress.on_event(&PipelineEvent::Saved {
                path: featured_path.clone(),
            });
            write_text(&monthly_path, &export_monthly_csv(&output.monthly)?)?;
        }
        OutputFormat::Parquet => {
            write_atomic(&featured_path, |tmp| write_parquet(&output.featured, tmp))?;
            progress.on_event(&PipelineEvent::Saved {
                path: featured_path.clone(),
            });
            let monthly_df = monthly_to_dataframe(&output.monthly)?;
            write_atomic(&monthly_path, |tmp| write_parquet(&monthly_df, tmp))?;
        }
    }
    progress.on_event(&PipelineEvent::Saved {
        path: monthly_path.clone(),
    });

    let manifest = if config.manifest {
        let path = config.manifest_path();
        let manifest = RunManifest::from_output(output, config);
        let json = serde_json::to_string_pretty(&manifest)
            .context("failed to serialize run manifest")?;
        write_text(&path, &json)?;
        progress.on_event(&PipelineEvent::Saved { path: path.clone() });
        Some(path)
    } else {
        None
    };

    Ok(SavedArtifacts {
        featured: featured_path,
        monthly: monthly_path,
        manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use salescast_core::MonthlyTotal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_frame() -> DataFrame {
        let order_date = Column::new(
            "order_date".into(),
            [Some(date_to_epoch_days(date(2023, 1, 5))), None],
        )
        .cast(&DataType::Date)
        .unwrap();
        DataFrame::new(vec![
            order_date,
            Column::new("sales".into(), [10.5, 3.25]),
            Column::new("region".into(), [Some("West"), None]),
            Column::new("quantity".into(), [2i64, 1]),
        ])
        .unwrap()
    }

    fn sample_monthly() -> MonthlyAggregate {
        MonthlyAggregate {
            months: vec![
                MonthlyTotal {
                    month_end: date(2023, 1, 31),
                    total_sales: 150.0,
                },
                MonthlyTotal {
                    month_end: date(2023, 2, 28),
                    total_sales: 0.0,
                },
                MonthlyTotal {
                    month_end: date(2023, 3, 31),
                    total_sales: 957.5775,
                },
            ],
        }
    }

    #[test]
    fn table_csv_has_header_and_empty_nulls() {
        let csv = export_table_csv(&sample_frame()).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "order_date,sales,region,quantity");
        assert_eq!(lines[1], "2023-01-05,10.5,West,2");
        assert_eq!(lines[2], ",3.25,,1");
    }

    #[test]
    fn monthly_csv_writes_totals_as_floats() {
        let csv = export_monthly_csv(&sample_monthly()).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "order_date,sales",
                "2023-01-31,150.0",
                "2023-02-28,0.0",
                "2023-03-31,957.5775",
            ]
        );
    }

    #[test]
    fn total_formatting() {
        assert_eq!(format_total(150.0), "150.0");
        assert_eq!(format_total(-3.0), "-3.0");
        assert_eq!(format_total(0.1), "0.1");
        assert_eq!(format_total(1e21), "1000000000000000000000.0");
    }

    #[test]
    fn monthly_dataframe_has_two_columns() {
        let df = monthly_to_dataframe(&sample_monthly()).unwrap();
        assert_eq!(df.width(), 2);
        assert_eq!(df.column("order_date").unwrap().dtype(), &DataType::Date);
        let sales = df.column("sales").unwrap().f64().unwrap();
        assert_eq!(sales.get(0), Some(150.0));
    }

    #[test]
    fn parquet_roundtrip_preserves_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("featured.parquet");

        write_parquet(&sample_frame(), &path).unwrap();

        let file = fs::File::open(&path).unwrap();
        let loaded = ParquetReader::new(file).finish().unwrap();
        assert_eq!(loaded.shape(), (2, 4));
        assert_eq!(loaded.column("order_date").unwrap().dtype(), &DataType::Date);
        assert_eq!(loaded.column("order_date").unwrap().null_count(), 1);
    }

    #[test]
    fn newer_manifest_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let manifest = RunManifest {
            schema_version: MANIFEST_SCHEMA_VERSION + 1,
            input_path: PathBuf::from("in.csv"),
            input_hash: "abc".into(),
            encoding: "UTF-8".into(),
            rows: 0,
            columns: vec![],
            months: 0,
            first_month: None,
            last_month: None,
            total_sales: 0.0,
            format: OutputFormat::Csv,
            featured_path: PathBuf::from("a.csv"),
            monthly_path: PathBuf::from("b.csv"),
            created_at: Utc::now(),
        };
        fs::write(&path, serde_json::to_string(&manifest).unwrap()).unwrap();

        let err = load_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported manifest schema version"));
    }
}
