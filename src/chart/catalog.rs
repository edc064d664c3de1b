//! Report charts
//!
//! One function per chart. Each takes an already aggregated table; the
//! expected columns are listed on every function and checked on bind. Extra
//! columns are ignored.

use super::{Channel, Chart, ChartSpec, FieldType, Mark};
use crate::naming;
use crate::transform::with_formatted_billions;
use crate::{DataFrame, Result};

const TILTED_LABELS: f64 = -45.0;

/// Grouped bars of summed weekly sales per store, split by holiday flag.
///
/// Expects columns: `store_id`, `is_holiday` (bool), `store_weekly_sales` (summed)
pub fn weekly_sales_by_store_and_holiday(df: &DataFrame) -> Result<Chart> {
    ChartSpec::new(Mark::Bar, "Weekly Sales by Store & Holiday")
        .encode_as(Channel::X, "store_id", FieldType::Ordinal)
        .encode(Channel::Y, "store_weekly_sales")
        .encode_as(Channel::Color, "is_holiday", FieldType::Nominal)
        .label("store_id", "Store")
        .label("store_weekly_sales", "Weekly Sales (sum)")
        .label("is_holiday", "Holiday")
        .grouped()
        .label_angle(TILTED_LABELS)
        .bind(df)
}

/// Scatter of weekly sales by ISO week, colored by temperature.
///
/// Expects columns: `week`, `store_weekly_sales`, `store_temperature`
pub fn weekly_sales_vs_temperature(df: &DataFrame) -> Result<Chart> {
    ChartSpec::new(Mark::Point, "Weekly Sales vs Temperature by week")
        .encode(Channel::X, naming::WEEK_COLUMN)
        .encode(Channel::Y, "store_weekly_sales")
        .encode(Channel::Color, "store_temperature")
        .label(naming::WEEK_COLUMN, "Week")
        .label("store_temperature", "Temperature")
        .label("store_weekly_sales", "Weekly Sales")
        .opacity(0.6)
        .bind(df)
}

/// Line of total sales over store size.
///
/// Expects columns: `store_size`, `total_weekly_sales`, sorted by `store_size`
pub fn weekly_sales_by_store_size(df: &DataFrame) -> Result<Chart> {
    ChartSpec::new(Mark::Line, "Weekly Sales by Store Size")
        .encode(Channel::X, "store_size")
        .encode(Channel::Y, "total_weekly_sales")
        .label("store_size", "Store Size")
        .label("total_weekly_sales", "Weekly Sales")
        .bind(df)
}

/// Bars of total sales per store-size bucket, buckets in `order`.
///
/// Expects columns: `store_size_bin`, `total_weekly_sales`
pub fn weekly_sales_by_store_size_bin(df: &DataFrame, order: &[String]) -> Result<Chart> {
    let bin_column = naming::bin_column("store_size");
    ChartSpec::new(Mark::Bar, "Weekly Sales by Store Size (Binned)")
        .encode_as(Channel::X, bin_column.as_str(), FieldType::Ordinal)
        .sort(Channel::X, order)
        .encode(Channel::Y, "total_weekly_sales")
        .label(bin_column.as_str(), "Store Size")
        .label("total_weekly_sales", "Weekly Sales")
        .bind(df)
}

/// One line per store type over the months of the year.
///
/// Expects columns: `month`, `store_type`, `total_monthly_sales`
pub fn monthly_sales_by_store_type(df: &DataFrame) -> Result<Chart> {
    ChartSpec::new(Mark::Line, "Monthly Sales by Store Type")
        .encode_as(Channel::X, naming::MONTH_COLUMN, FieldType::Ordinal)
        .encode(Channel::Y, "total_monthly_sales")
        .encode_as(Channel::Color, "store_type", FieldType::Nominal)
        .label(naming::MONTH_COLUMN, "Month")
        .label("total_monthly_sales", "Monthly Sales")
        .label("store_type", "Store Type")
        .bind(df)
}

/// Grouped bars of markdown amounts per year and markdown type.
///
/// Expects columns: `year`, `markdown_type`, `total_markdown_amount`
pub fn yearly_markdown_sales(df: &DataFrame) -> Result<Chart> {
    ChartSpec::new(Mark::Bar, "Yearly Markdown Sales by Year & store")
        .encode_as(Channel::X, naming::YEAR_COLUMN, FieldType::Ordinal)
        .encode(Channel::Y, "total_markdown_amount")
        .encode_as(Channel::Color, "markdown_type", FieldType::Nominal)
        .label(naming::YEAR_COLUMN, "Year")
        .label("total_markdown_amount", "Yearly Markdown Sales")
        .grouped()
        .bind(df)
}

/// Pie of total sales per store type.
///
/// Expects columns: `store_type`, `total_weekly_sales`
pub fn sales_by_store_type(df: &DataFrame) -> Result<Chart> {
    ChartSpec::new(Mark::Arc, "Sales by Store Type")
        .encode(Channel::Theta, "total_weekly_sales")
        .encode_as(Channel::Color, "store_type", FieldType::Nominal)
        .label("store_type", "Store Type")
        .label("total_weekly_sales", "Total Sales")
        .bind(df)
}

/// Grouped bars per store type, one bar per store.
///
/// Expects columns: `store_type`, `store_id` (text), `total_weekly_sales`
pub fn sales_by_store_and_type(df: &DataFrame) -> Result<Chart> {
    ChartSpec::new(Mark::Bar, "Sales by Store and Type")
        .encode_as(Channel::X, "store_type", FieldType::Nominal)
        .encode(Channel::Y, "total_weekly_sales")
        .encode_as(Channel::Color, "store_id", FieldType::Nominal)
        .label("store_id", "Store")
        .label("total_weekly_sales", "Total Sales")
        .label("store_type", "Store Type")
        .grouped()
        .bind(df)
}

/// Bars per store, one panel per store type, three panels per row, with
/// value labels.
///
/// Expects columns: `store_id` (text), `store_type`, `total_weekly_sales`
pub fn sales_by_store_and_type_facet(df: &DataFrame) -> Result<Chart> {
    ChartSpec::new(Mark::Bar, "Sales by Store and Type (Faceted)")
        .encode_as(Channel::X, "store_id", FieldType::Nominal)
        .encode(Channel::Y, "total_weekly_sales")
        .encode_as(Channel::Facet, "store_type", FieldType::Nominal)
        .encode(Channel::Text, "total_weekly_sales")
        .format(Channel::Text, ".3~s")
        .label("store_id", "Store")
        .label("total_weekly_sales", "Total Sales")
        .label("store_type", "Store Type")
        .facet_columns(3)
        .label_angle(TILTED_LABELS)
        .bind(df)
}

/// Average fuel price per year.
///
/// Expects columns: `year`, `avg_fuel_price`
pub fn fuel_price_by_year(df: &DataFrame) -> Result<Chart> {
    ChartSpec::new(Mark::Line, "Average Fuel Price by Year")
        .encode_as(Channel::X, naming::YEAR_COLUMN, FieldType::Ordinal)
        .encode(Channel::Y, "avg_fuel_price")
        .label(naming::YEAR_COLUMN, "Year")
        .label("avg_fuel_price", "Avg Fuel Price")
        .bind(df)
}

/// Average fuel price per calendar month across years.
///
/// Expects columns: `year_month` (`YYYY-MM`), `avg_fuel_price`
pub fn fuel_price_by_month(df: &DataFrame) -> Result<Chart> {
    ChartSpec::new(Mark::Line, "Average Fuel Price by Month")
        .encode_as(Channel::X, naming::YEAR_MONTH_COLUMN, FieldType::Ordinal)
        .encode(Channel::Y, "avg_fuel_price")
        .label(naming::YEAR_MONTH_COLUMN, "Month")
        .label("avg_fuel_price", "Avg Fuel Price")
        .bind(df)
}

/// Time grain for [`sales_by_time`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInterval {
    Year,
    Month,
    Day,
}

impl TimeInterval {
    /// Column holding this grain
    pub fn column(&self) -> &'static str {
        match self {
            TimeInterval::Year => naming::YEAR_COLUMN,
            TimeInterval::Month => naming::MONTH_COLUMN,
            TimeInterval::Day => naming::DAY_COLUMN,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TimeInterval::Year => "Year",
            TimeInterval::Month => "Month",
            TimeInterval::Day => "Day",
        }
    }
}

/// Bars of total sales per time grain, labelled in billions.
///
/// The label column is added to a copy; `df` is left as it was.
///
/// Expects columns: `year`, `month` or `day` (per `interval`), `total_weekly_sales`
pub fn sales_by_time(df: &DataFrame, interval: TimeInterval) -> Result<Chart> {
    let labelled = with_formatted_billions(df, "total_weekly_sales")?;
    let formatted = naming::formatted_column("total_weekly_sales");

    ChartSpec::new(Mark::Bar, format!("Sales by {}", interval.title()))
        .encode_as(Channel::X, interval.column(), FieldType::Ordinal)
        .encode(Channel::Y, "total_weekly_sales")
        .encode_as(Channel::Text, formatted.as_str(), FieldType::Nominal)
        .label(interval.column(), interval.title())
        .label("total_weekly_sales", "Total Sales")
        .bind(&labelled)
}

/// Scatter of total sales per CPI value.
///
/// Expects columns: `cpi`, `total_weekly_sales`
pub fn sales_by_cpi(df: &DataFrame) -> Result<Chart> {
    ChartSpec::new(Mark::Point, "Sales by CPI")
        .encode(Channel::X, "cpi")
        .encode(Channel::Y, "total_weekly_sales")
        .label("cpi", "CPI")
        .label("total_weekly_sales", "Total Sales")
        .bind(df)
}

/// Bars of total sales per department.
///
/// Expects columns: `dept_id`, `total_weekly_sales`
pub fn sales_by_dept(df: &DataFrame) -> Result<Chart> {
    ChartSpec::new(Mark::Bar, "Sales by Department")
        .encode_as(Channel::X, "dept_id", FieldType::Ordinal)
        .encode(Channel::Y, "total_weekly_sales")
        .label("dept_id", "Department")
        .label("total_weekly_sales", "Total Sales")
        .label_angle(TILTED_LABELS)
        .bind(df)
}
