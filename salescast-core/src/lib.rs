//! Salescast Core: the four pipeline stages over Polars dataframes.
//!
//! - [`loader`]: read a comma-separated file, falling back through candidate encodings
//! - [`clean`]: normalize column names, coerce date columns, sort by `order_date`
//! - [`features`]: derive `year`, `month`, `day_of_week`, `quarter`
//! - [`aggregate`]: month-end sales totals over the full date range
//!
//! Stages report progress through [`progress::PipelineProgress`] and never
//! write to stdout themselves.

pub mod aggregate;
pub mod clean;
pub mod error;
pub mod features;
pub mod loader;
pub mod progress;
pub mod table;

pub use aggregate::{aggregate_monthly, month_end, MonthlyAggregate, MonthlyTotal, SALES};
pub use clean::{clean, is_date_column, normalize_column_name, parse_date_str, ORDER_DATE};
pub use error::DataError;
pub use features::{derive_features, FEATURE_COLUMNS};
pub use loader::{load_bytes, load_table, read_source, LoadOptions, MISSING_VALUE_TOKENS};
pub use progress::{LogProgress, NoProgress, PipelineEvent, PipelineProgress, RecordingProgress};
pub use table::{
    column_dates, date_to_epoch_days, CanonicalTable, ColumnSummary, FeaturedTable, RawTable,
    TableSummary,
};
