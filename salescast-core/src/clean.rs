//! Column normalization, date coercion and chronological ordering.

use crate::error::DataError;
use crate::progress::{PipelineEvent, PipelineProgress};
use crate::table::{date_to_epoch_days, CanonicalTable, RawTable};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::HashSet;

/// Column the cleaner sorts on and the later stages key off.
pub const ORDER_DATE: &str = "order_date";

/// Date-only layouts, tried in order. Month-first wins for ambiguous
/// slash and dash dates. `%B` also accepts abbreviated month names.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%Y%m%d",
    "%d-%b-%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Lowercase, then replace spaces and hyphens with underscores.
pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase().replace([' ', '-'], "_")
}

/// Whether a normalized column holds dates.
pub fn is_date_column(normalized: &str) -> bool {
    normalized.to_lowercase().contains("date")
}

/// Parse text as a calendar date, trying every known layout.
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Re-type any column as `Date`, nulling every value that does not parse.
///
/// Values are parsed through their text, so the integer `20230105` reads as
/// 2023-01-05 and a float never parses.
pub(crate) fn coerce_dates(column: &Column) -> PolarsResult<Column> {
    let text = column.cast(&DataType::String)?;
    let days: Vec<Option<i32>> = text
        .str()?
        .into_iter()
        .map(|value| value.and_then(parse_date_str).map(date_to_epoch_days))
        .collect();
    Column::new(column.name().clone(), days).cast(&DataType::Date)
}

/// Produce the canonical table from a raw one.
///
/// Cells that do not parse as dates become null. Rows are stably sorted
/// ascending by `order_date` when present, with null dates last in their
/// original relative order. Fails only when two source columns normalize to
/// the same name.
pub fn clean(raw: RawTable, progress: &dyn PipelineProgress) -> Result<CanonicalTable, DataError> {
    let mut seen = HashSet::new();
    let mut date_columns = Vec::new();
    let mut columns = Vec::with_capacity(raw.width());

    for column in raw.into_frame().take_columns() {
        let name = normalize_column_name(column.name());
        if !seen.insert(name.clone()) {
            return Err(DataError::DuplicateColumn { column: name });
        }

        let mut column = if is_date_column(&name) {
            date_columns.push(name.clone());
            coerce_dates(&column)?
        } else {
            column
        };
        column.rename(name.into());
        columns.push(column);
    }

    let mut frame = DataFrame::new(columns)?;
    if frame.get_column_index(ORDER_DATE).is_some() {
        frame = frame.sort(
            [ORDER_DATE],
            SortMultipleOptions::default()
                .with_nulls_last(true)
                .with_maintain_order(true),
        )?;
    }

    progress.on_event(&PipelineEvent::Cleaned {
        rows: frame.height(),
        date_columns,
    });
    Ok(CanonicalTable(frame))
}
