//! Calendar fields derived from a date column

use crate::naming;
use crate::table::{date_from_epoch_days, datetime_from_timestamp};
use crate::{DataFrame, Result, SalesvizError};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;

/// Textual layouts accepted for date columns, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Read a column as calendar dates.
///
/// Date, Datetime and String columns are accepted. Nulls and unparseable
/// strings become `None`.
///
/// # Errors
///
/// Returns `SalesvizError::TransformError` when the column is missing or has
/// a dtype that cannot hold dates.
pub fn parse_date_column(df: &DataFrame, column: &str) -> Result<Vec<Option<NaiveDate>>> {
    let series = df
        .column(column)
        .map_err(|_| {
            SalesvizError::TransformError(format!("Date column '{}' does not exist", column))
        })?
        .as_materialized_series();

    let wrong_type = |e: PolarsError| {
        SalesvizError::TransformError(format!("Column '{}' is not a date: {}", column, e))
    };

    let dates = match series.dtype() {
        DataType::Date => {
            let ca = series.date().map_err(wrong_type)?;
            (&ca.phys)
                .into_iter()
                .map(|days| days.and_then(date_from_epoch_days))
                .collect()
        }
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let ca = series.datetime().map_err(wrong_type)?;
            (&ca.phys)
                .into_iter()
                .map(|ts| {
                    ts.and_then(|ts| datetime_from_timestamp(ts, unit))
                        .map(|dt| dt.date_naive())
                })
                .collect()
        }
        DataType::String => {
            let ca = series.str().map_err(wrong_type)?;
            let dates: Vec<Option<NaiveDate>> =
                ca.into_iter().map(|v| v.and_then(parse_date_text)).collect();
            let unparsed = ca
                .into_iter()
                .zip(&dates)
                .filter(|(raw, date)| raw.is_some() && date.is_none())
                .count();
            if unparsed > 0 {
                tracing::warn!(
                    "{} value(s) of column '{}' are not dates and yield empty calendar fields",
                    unparsed,
                    column
                );
            }
            dates
        }
        other => {
            return Err(SalesvizError::TransformError(format!(
                "Column '{}' has type {}, expected a date, datetime or string",
                column, other
            )))
        }
    };

    Ok(dates)
}

fn with_columns(df: &DataFrame, columns: Vec<Series>) -> Result<DataFrame> {
    let mut out = df.clone();
    for series in columns {
        out.with_column(series).map_err(|e| {
            SalesvizError::TransformError(format!("Failed to add derived column: {}", e))
        })?;
    }
    Ok(out)
}

/// Add `year`, `week` (ISO 8601) and `month` columns derived from `date_column`.
///
/// Rows whose date is null or unparseable get nulls in all three columns.
/// Existing columns with those names are replaced.
pub fn add_calendar_fields(df: &DataFrame, date_column: &str) -> Result<DataFrame> {
    let dates = parse_date_column(df, date_column)?;

    let years: Vec<Option<i32>> = dates.iter().map(|d| d.map(|d| d.year())).collect();
    let weeks: Vec<Option<i32>> = dates
        .iter()
        .map(|d| d.map(|d| d.iso_week().week() as i32))
        .collect();
    let months: Vec<Option<i32>> = dates.iter().map(|d| d.map(|d| d.month() as i32)).collect();

    with_columns(
        df,
        vec![
            Series::new(naming::YEAR_COLUMN.into(), years),
            Series::new(naming::WEEK_COLUMN.into(), weeks),
            Series::new(naming::MONTH_COLUMN.into(), months),
        ],
    )
}

/// Add a `day` (day of month) column derived from `date_column`.
pub fn add_day_field(df: &DataFrame, date_column: &str) -> Result<DataFrame> {
    let dates = parse_date_column(df, date_column)?;
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(|d| d.day() as i32)).collect();
    with_columns(df, vec![Series::new(naming::DAY_COLUMN.into(), days)])
}
