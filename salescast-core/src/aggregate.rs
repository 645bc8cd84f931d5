//! Monthly resampling of sales totals.
//!
//! Each month is labelled by its last calendar day. The output spans every
//! month from the earliest to the latest dated row, so months without sales
//! appear with a zero total.

use crate::clean::{coerce_dates, ORDER_DATE};
use crate::error::DataError;
use crate::loader::MISSING_VALUE_TOKENS;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::Serialize;

/// Column summed per month.
pub const SALES: &str = "sales";

/// One month of the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyTotal {
    /// Last calendar day of the month.
    pub month_end: NaiveDate,
    pub total_sales: f64,
}

/// Contiguous, ascending month-end sales series.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MonthlyAggregate {
    pub months: Vec<MonthlyTotal>,
}

impl MonthlyAggregate {
    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Sum of every monthly total.
    pub fn total(&self) -> f64 {
        self.months.iter().map(|m| m.total_sales).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonthlyTotal> {
        self.months.iter()
    }
}

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (y, m) = next_month(date.year(), date.month());
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn require_column(frame: &DataFrame, name: &str) -> Result<(), DataError> {
    match frame.get_column_index(name) {
        Some(_) => Ok(()),
        None => Err(DataError::MissingColumn {
            column: name.to_string(),
        }),
    }
}

/// `sales` as `Float64`, nulls kept.
///
/// Numeric columns are cast. Anything else is read as text: blanks and
/// missing-value markers are null, numbers count after trimming, and the
/// first other value fails with [`DataError::NonNumeric`].
fn sales_amounts(column: &Column) -> Result<Column, DataError> {
    match column.dtype() {
        DataType::Null
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64 => Ok(column.cast(&DataType::Float64)?),
        _ => {
            let text = column.cast(&DataType::String)?;
            let amounts = text
                .str()?
                .into_iter()
                .enumerate()
                .map(|(row, value)| match value.map(str::trim) {
                    None => Ok(None),
                    Some(v) if v.is_empty() || MISSING_VALUE_TOKENS.contains(&v) => Ok(None),
                    Some(v) => v
                        .parse::<f64>()
                        .ok()
                        .filter(|amount| amount.is_finite())
                        .map(Some)
                        .ok_or_else(|| DataError::NonNumeric {
                            column: SALES.to_string(),
                            row,
                            value: v.to_string(),
                        }),
                })
                .collect::<Result<Vec<Option<f64>>, DataError>>()?;
            Ok(Column::new(SALES.into(), amounts))
        }
    }
}

/// Every `(year, month)` from `first` to `last` inclusive.
fn month_grid(first: (i32, u32), last: (i32, u32)) -> PolarsResult<DataFrame> {
    let mut years = Vec::new();
    let mut months = Vec::new();
    let mut key = first;
    while key <= last {
        years.push(key.0);
        months.push(key.1 as i32);
        key = next_month(key.0, key.1);
    }
    DataFrame::new(vec![
        Column::new("year".into(), years),
        Column::new("month".into(), months),
    ])
}

/// Sum `sales` per calendar month of `order_date`.
///
/// Rows with a null `order_date` are skipped. Null sales count as zero.
/// Months between the first and last dated row with no rows report zero.
/// A text `order_date` column is coerced the way the cleaner does it.
pub fn aggregate_monthly(frame: &DataFrame) -> Result<MonthlyAggregate, DataError> {
    require_column(frame, ORDER_DATE)?;
    require_column(frame, SALES)?;

    let dates = frame.column(ORDER_DATE)?;
    let dates = if dates.dtype() == &DataType::Date {
        dates.clone()
    } else {
        coerce_dates(dates)?
    };
    let sales = sales_amounts(frame.column(SALES)?)?;

    let keys = [
        col(ORDER_DATE).dt().year().cast(DataType::Int32).alias("year"),
        col(ORDER_DATE).dt().month().cast(DataType::Int32).alias("month"),
    ];
    let totals = DataFrame::new(vec![dates, sales])?
        .lazy()
        .filter(col(ORDER_DATE).is_not_null())
        .group_by(keys)
        .agg([col(SALES).fill_null(lit(0.0)).sum()])
        .sort(["year", "month"], SortMultipleOptions::default())
        .collect()?;

    if totals.height() == 0 {
        return Ok(MonthlyAggregate::default());
    }
    let years = totals.column("year")?.i32()?;
    let months = totals.column("month")?.i32()?;
    let key_at = |idx: usize| {
        let month = months.get(idx).and_then(|m| u32::try_from(m).ok());
        (years.get(idx).unwrap_or(0), month.unwrap_or(1))
    };
    let grid = month_grid(key_at(0), key_at(totals.height() - 1))?;

    let filled = grid
        .lazy()
        .join(
            totals.clone().lazy(),
            [col("year"), col("month")],
            [col("year"), col("month")],
            JoinArgs::new(JoinType::Left),
        )
        .with_column(col(SALES).fill_null(lit(0.0)))
        .sort(["year", "month"], SortMultipleOptions::default())
        .collect()?;

    let months = filled
        .column("year")?
        .i32()?
        .into_iter()
        .zip(filled.column("month")?.i32()?)
        .zip(filled.column(SALES)?.f64()?)
        .filter_map(|((year, month), total)| {
            let first_day = NaiveDate::from_ymd_opt(year?, u32::try_from(month?).ok()?, 1)?;
            Some(MonthlyTotal {
                month_end: month_end(first_day),
                total_sales: total.unwrap_or(0.0),
            })
        })
        .collect();

    Ok(MonthlyAggregate { months })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_end_handles_lengths() {
        assert_eq!(month_end(date(2023, 2, 10)), date(2023, 2, 28));
        assert_eq!(month_end(date(2024, 2, 1)), date(2024, 2, 29));
        assert_eq!(month_end(date(2023, 12, 25)), date(2023, 12, 31));
        assert_eq!(month_end(date(2023, 4, 30)), date(2023, 4, 30));
    }

    #[test]
    fn gap_months_are_zero_filled() {
        let frame = df!(
            "order_date" => &["2023-01-05", "2023-01-20", "2023-03-10"],
            "sales" => &[100i64, 50, 30],
        )
        .unwrap();

        let agg = aggregate_monthly(&frame).unwrap();

        assert_eq!(
            agg.months,
            vec![
                MonthlyTotal { month_end: date(2023, 1, 31), total_sales: 150.0 },
                MonthlyTotal { month_end: date(2023, 2, 28), total_sales: 0.0 },
                MonthlyTotal { month_end: date(2023, 3, 31), total_sales: 30.0 },
            ]
        );
    }

    #[test]
    fn spans_year_boundary() {
        let frame = df!(
            "order_date" => &["2023-02-01", "2022-11-15"],
            "sales" => &[2.5, 1.5],
        )
        .unwrap();
        let agg = aggregate_monthly(&frame).unwrap();
        let ends: Vec<_> = agg.iter().map(|m| m.month_end).collect();
        assert_eq!(
            ends,
            vec![date(2022, 11, 30), date(2022, 12, 31), date(2023, 1, 31), date(2023, 2, 28)]
        );
        assert_eq!(agg.total(), 4.0);
    }

    #[test]
    fn null_dates_skipped_and_null_sales_are_zero() {
        let frame = df!(
            "order_date" => &[None, Some("2023-05-02"), Some("2023-05-03")],
            "sales" => &[Some("1000"), None, Some(" 12.5 ")],
        )
        .unwrap();
        let agg = aggregate_monthly(&frame).unwrap();
        assert_eq!(agg.len(), 1);
        assert_eq!(agg.months[0].total_sales, 12.5);
    }

    #[test]
    fn missing_value_markers_in_text_sales_are_zero() {
        let frame = df!(
            "order_date" => &["2023-05-02", "2023-05-03", "2023-05-04", "2023-05-05"],
            "sales" => &["100", "NaN", "NA", "null"],
        )
        .unwrap();
        let agg = aggregate_monthly(&frame).unwrap();
        assert_eq!(agg.months[0].total_sales, 100.0);
    }

    #[test]
    fn missing_sales_column() {
        let frame = df!("order_date" => &[None::<&str>]).unwrap();
        match aggregate_monthly(&frame) {
            Err(DataError::MissingColumn { column }) => assert_eq!(column, "sales"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn missing_order_date_column() {
        let frame = df!("sales" => &[1i64]).unwrap();
        assert!(matches!(
            aggregate_monthly(&frame),
            Err(DataError::MissingColumn { column }) if column == "order_date"
        ));
    }

    #[test]
    fn non_numeric_sales_fail() {
        let frame = df!(
            "order_date" => &["2023-05-01", "2023-05-02"],
            "sales" => &["3", "lots"],
        )
        .unwrap();
        match aggregate_monthly(&frame) {
            Err(DataError::NonNumeric { row, value, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(value, "lots");
            }
            other => panic!("expected non-numeric error, got {other:?}"),
        }
    }

    #[test]
    fn no_dated_rows_is_empty() {
        let frame = df!("order_date" => &[None::<&str>], "sales" => &[3i64]).unwrap();
        assert!(aggregate_monthly(&frame).unwrap().is_empty());
    }
}
