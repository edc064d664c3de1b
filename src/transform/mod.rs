//! Table transforms applied between the warehouse and the charts
//!
//! Every function here is pure: it takes a borrowed DataFrame and returns a
//! new one, leaving the caller's table untouched.
//!
//! - [`calendar`] - year / ISO week / month / day fields from a date column
//! - [`binning`] - quantile binning into ordered, labelled buckets
//! - [`aggregate`] - group-by sums and means, sorting, label formatting

pub mod aggregate;
pub mod binning;
pub mod calendar;

pub use aggregate::{
    aggregate, cast_to_string, format_billions, sort_by, with_formatted_billions,
    with_year_month, AggFn, Aggregation,
};
pub use binning::{bin_quantiles, BinnedTable, DECILE_LABELS};
pub use calendar::{add_calendar_fields, add_day_field, parse_date_column};
