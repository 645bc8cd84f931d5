//! Calendar features derived from `order_date`.

use crate::clean::ORDER_DATE;
use crate::error::DataError;
use crate::progress::{PipelineEvent, PipelineProgress};
use crate::table::{CanonicalTable, FeaturedTable};
use polars::prelude::*;

/// Names of the derived columns, in the order they are appended.
pub const FEATURE_COLUMNS: [&str; 4] = ["year", "month", "day_of_week", "quarter"];

/// Expressions for the four calendar columns, all `Int32`.
///
/// `day_of_week` counts from 0 = Monday; Polars weekdays are ISO (1 = Monday).
fn calendar_exprs() -> [Expr; 4] {
    let date = || col(ORDER_DATE).dt();
    [
        date().year().cast(DataType::Int32).alias(FEATURE_COLUMNS[0]),
        date().month().cast(DataType::Int32).alias(FEATURE_COLUMNS[1]),
        (date().weekday().cast(DataType::Int32) - lit(1)).alias(FEATURE_COLUMNS[2]),
        date().quarter().cast(DataType::Int32).alias(FEATURE_COLUMNS[3]),
    ]
}

/// Add `year`, `month`, `day_of_week` and `quarter` columns.
///
/// Identity when there is no `order_date` column. Null dates yield null
/// features. An existing column with a derived name is overwritten in place.
pub fn derive_features(
    table: CanonicalTable,
    progress: &dyn PipelineProgress,
) -> Result<FeaturedTable, DataError> {
    if table.get_column_index(ORDER_DATE).is_none() {
        return Ok(FeaturedTable(table.into_frame()));
    }

    let frame = table
        .into_frame()
        .lazy()
        .with_columns(calendar_exprs())
        .collect()?;

    progress.on_event(&PipelineEvent::FeaturesDerived {
        rows: frame.height(),
    });
    Ok(FeaturedTable(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::clean;
    use crate::progress::{NoProgress, RecordingProgress};
    use crate::table::RawTable;
    use encoding_rs::UTF_8;

    fn canonical(frame: DataFrame) -> CanonicalTable {
        clean(RawTable::new(frame, UTF_8), &NoProgress).unwrap()
    }

    fn ints(frame: &DataFrame, name: &str) -> Vec<Option<i32>> {
        frame.column(name).unwrap().i32().unwrap().into_iter().collect()
    }

    fn names(frame: &DataFrame) -> Vec<String> {
        frame.get_column_names().iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn calendar_fields_for_known_dates() {
        // Thursday, Sunday, Monday, Sunday.
        let featured = derive_features(
            canonical(
                df!("order_date" => &["2023-01-05", "2023-12-31", "2024-07-01", "2024-06-30"])
                    .unwrap(),
            ),
            &NoProgress,
        )
        .unwrap();

        assert_eq!(ints(&featured, "year"), [Some(2023), Some(2023), Some(2024), Some(2024)]);
        assert_eq!(ints(&featured, "month"), [Some(1), Some(12), Some(7), Some(6)]);
        assert_eq!(ints(&featured, "day_of_week"), [Some(3), Some(6), Some(0), Some(6)]);
        assert_eq!(ints(&featured, "quarter"), [Some(1), Some(4), Some(3), Some(2)]);
    }

    #[test]
    fn appends_feature_columns_and_propagates_nulls() {
        let featured = derive_features(
            canonical(df!("order_date" => &[Some("2023-01-02"), None], "sales" => &[5i64, 7]).unwrap()),
            &NoProgress,
        )
        .unwrap();

        assert_eq!(
            names(&featured),
            ["order_date", "sales", "year", "month", "day_of_week", "quarter"]
        );
        for name in FEATURE_COLUMNS {
            assert_eq!(featured.column(name).unwrap().null_count(), 1, "{name}");
        }
        assert_eq!(ints(&featured, "day_of_week")[0], Some(0));
    }

    #[test]
    fn identity_without_order_date() {
        let input = canonical(df!("ship_date" => &[None::<&str>], "sales" => &[1i64]).unwrap());
        let progress = RecordingProgress::new();

        let featured = derive_features(input.clone(), &progress).unwrap();

        assert!(featured.into_frame().equals_missing(&input.into_frame()));
        assert!(progress.events().is_empty());
    }

    #[test]
    fn overwrites_existing_feature_column() {
        let featured = derive_features(
            canonical(df!("year" => &["old"], "order_date" => &["2021-05-09"]).unwrap()),
            &NoProgress,
        )
        .unwrap();

        assert_eq!(
            names(&featured),
            ["year", "order_date", "month", "day_of_week", "quarter"]
        );
        assert_eq!(ints(&featured, "year"), [Some(2021)]);
        assert_eq!(ints(&featured, "quarter"), [Some(2)]);
    }
}
