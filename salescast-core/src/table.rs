//! Stage wrappers around a Polars [`DataFrame`].
//!
//! Each pipeline stage hands the next one a typed wrapper ([`RawTable`],
//! [`CanonicalTable`], [`FeaturedTable`]) so a stage cannot be given the wrong
//! input by accident. All three deref to the underlying frame.

use chrono::{Datelike, NaiveDate};
use encoding_rs::Encoding;
use polars::prelude::*;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;

/// Days from 0001-01-01 (CE) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Physical value of a Polars `Date`: days since the Unix epoch.
pub fn date_to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Read a `Date` column as chrono dates.
pub fn column_dates(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<NaiveDate>>> {
    Ok(frame.column(name)?.date()?.as_date_iter().collect())
}

/// Column overview, the equivalent of a dataframe `info()` dump.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub non_null: usize,
    pub dtype: String,
}

impl TableSummary {
    pub fn of(frame: &DataFrame) -> Self {
        let columns = frame
            .get_columns()
            .iter()
            .map(|column| ColumnSummary {
                name: column.name().to_string(),
                non_null: column.len() - column.null_count(),
                dtype: column.dtype().to_string(),
            })
            .collect();

        Self {
            rows: frame.height(),
            columns,
        }
    }
}

impl fmt::Display for TableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} rows, {} columns", self.rows, self.columns.len())?;
        let name_width = self
            .columns
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(0)
            .max(6);
        writeln!(f, " #  {:<name_width$}  non-null  dtype", "column")?;
        for (i, c) in self.columns.iter().enumerate() {
            writeln!(
                f,
                "{:>2}  {:<name_width$}  {:>8}  {}",
                i, c.name, c.non_null, c.dtype
            )?;
        }
        Ok(())
    }
}

// ── Stage wrappers ──────────────────────────────────────────────────

/// Frame as read from the source file, before any normalization.
#[derive(Debug, Clone)]
pub struct RawTable {
    frame: DataFrame,
    encoding: &'static Encoding,
}

impl RawTable {
    pub fn new(frame: DataFrame, encoding: &'static Encoding) -> Self {
        Self { frame, encoding }
    }

    /// Encoding that successfully decoded the source bytes.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }
}

impl Deref for RawTable {
    type Target = DataFrame;

    fn deref(&self) -> &DataFrame {
        &self.frame
    }
}

/// Normalized column names, coerced date columns, sorted by `order_date`.
#[derive(Debug, Clone)]
pub struct CanonicalTable(pub(crate) DataFrame);

impl CanonicalTable {
    pub fn into_frame(self) -> DataFrame {
        self.0
    }
}

impl Deref for CanonicalTable {
    type Target = DataFrame;

    fn deref(&self) -> &DataFrame {
        &self.0
    }
}

/// Canonical frame plus `year`, `month`, `day_of_week` and `quarter`.
#[derive(Debug, Clone)]
pub struct FeaturedTable(pub(crate) DataFrame);

impl FeaturedTable {
    pub fn into_frame(self) -> DataFrame {
        self.0
    }
}

impl Deref for FeaturedTable {
    type Target = DataFrame;

    fn deref(&self) -> &DataFrame {
        &self.0
    }
}
