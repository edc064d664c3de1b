//! Tidy table helpers
//!
//! Query results, transform outputs and chart inputs are all Polars
//! DataFrames. This module holds the small pieces every layer needs:
//! column precondition checks and conversion of typed columns to JSON
//! values (used for `Reader::execute` rows and for inline chart data).

use crate::{DataFrame, Result, SalesvizError};
use polars::prelude::*;
use serde_json::{json, Map, Value};

/// A single result row: column name → value, in column order
pub type Row = Map<String, Value>;

/// Names of all columns, as owned strings.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Check that every column in `required` exists in `df`.
///
/// The error names the first missing column, the consumer (`context`) and
/// the available columns, so a mis-shaped query result is easy to diagnose.
pub fn require_columns(df: &DataFrame, required: &[&str], context: &str) -> Result<()> {
    let available = column_names(df);
    for column in required {
        if !available.iter().any(|c| c == column) {
            return Err(SalesvizError::ValidationError(format!(
                "Column '{}' required by {} does not exist.\nAvailable columns: {}",
                column,
                context,
                available.join(", ")
            )));
        }
    }
    Ok(())
}

/// Convert a DataFrame to row objects (array of column → value maps).
pub fn dataframe_to_rows(df: &DataFrame) -> Result<Vec<Row>> {
    let columns = df
        .get_columns()
        .iter()
        .map(|column| {
            column_to_values(column.as_materialized_series())
                .map(|values| (column.name().to_string(), values))
        })
        .collect::<Result<Vec<_>>>()?;

    let rows = (0..df.height())
        .map(|idx| {
            columns
                .iter()
                .map(|(name, values)| (name.clone(), values[idx].clone()))
                .collect::<Row>()
        })
        .collect();

    Ok(rows)
}

/// Convert a DataFrame to JSON row values.
pub fn dataframe_to_values(df: &DataFrame) -> Result<Vec<Value>> {
    Ok(dataframe_to_rows(df)?
        .into_iter()
        .map(Value::Object)
        .collect())
}

fn cast_error(series: &Series, target: &str, e: PolarsError) -> SalesvizError {
    SalesvizError::InternalError(format!(
        "Failed to read column '{}' as {}: {}",
        series.name(),
        target,
        e
    ))
}

/// Convert every value of a series to a JSON value
///
/// Numbers stay numbers (non-finite floats become null), dates become
/// `YYYY-MM-DD` and datetimes `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn column_to_values(series: &Series) -> Result<Vec<Value>> {
    use DataType::*;

    let values = match series.dtype() {
        Int8 | Int16 | Int32 | Int64 | UInt8 | UInt16 | UInt32 | UInt64 => {
            let cast = series
                .cast(&Int64)
                .map_err(|e| cast_error(series, "i64", e))?;
            let ca = cast.i64().map_err(|e| cast_error(series, "i64", e))?;
            ca.into_iter()
                .map(|v| v.map(|v| json!(v)).unwrap_or(Value::Null))
                .collect()
        }
        Float32 | Float64 => {
            let cast = series
                .cast(&Float64)
                .map_err(|e| cast_error(series, "f64", e))?;
            let ca = cast.f64().map_err(|e| cast_error(series, "f64", e))?;
            ca.into_iter()
                .map(|v| match v {
                    Some(v) if v.is_finite() => json!(v),
                    _ => Value::Null,
                })
                .collect()
        }
        Boolean => {
            let ca = series.bool().map_err(|e| cast_error(series, "bool", e))?;
            ca.into_iter()
                .map(|v| v.map(|v| json!(v)).unwrap_or(Value::Null))
                .collect()
        }
        String => {
            let ca = series.str().map_err(|e| cast_error(series, "string", e))?;
            ca.into_iter()
                .map(|v| v.map(|v| json!(v)).unwrap_or(Value::Null))
                .collect()
        }
        Date => {
            // Days since epoch to ISO date string: "YYYY-MM-DD"
            let ca = series.date().map_err(|e| cast_error(series, "date", e))?;
            (&ca.phys)
                .into_iter()
                .map(|days| match days.and_then(date_from_epoch_days) {
                    Some(date) => json!(date.format("%Y-%m-%d").to_string()),
                    None => Value::Null,
                })
                .collect()
        }
        Datetime(time_unit, _) => {
            let ca = series
                .datetime()
                .map_err(|e| cast_error(series, "datetime", e))?;
            let unit = *time_unit;
            (&ca.phys)
                .into_iter()
                .map(|ts| match ts.and_then(|ts| datetime_from_timestamp(ts, unit)) {
                    Some(dt) => json!(dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()),
                    None => Value::Null,
                })
                .collect()
        }
        _ => {
            // Fallback: convert to string
            let cast = series
                .cast(&String)
                .map_err(|e| cast_error(series, "string", e))?;
            let ca = cast.str().map_err(|e| cast_error(series, "string", e))?;
            ca.into_iter()
                .map(|v| v.map(|v| json!(v)).unwrap_or(Value::Null))
                .collect()
        }
    };

    Ok(values)
}

/// Calendar date from days since the Unix epoch.
pub fn date_from_epoch_days(days: i32) -> Option<chrono::NaiveDate> {
    chrono::NaiveDate::from_ymd_opt(1970, 1, 1)?
        .checked_add_signed(chrono::Duration::days(days as i64))
}

/// UTC datetime from a timestamp in the given unit.
pub fn datetime_from_timestamp(
    timestamp: i64,
    unit: TimeUnit,
) -> Option<chrono::DateTime<chrono::Utc>> {
    let micros = match unit {
        TimeUnit::Microseconds => timestamp,
        TimeUnit::Milliseconds => timestamp.checked_mul(1_000)?,
        TimeUnit::Nanoseconds => timestamp / 1_000,
    };
    let secs = micros.div_euclid(1_000_000);
    let nsecs = (micros.rem_euclid(1_000_000) * 1000) as u32;
    chrono::DateTime::<chrono::Utc>::from_timestamp(secs, nsecs)
}

/// Numeric view of a column as `f64` (nulls and non-numeric casts become `None`).
pub fn numeric_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(column)
        .map_err(|e| SalesvizError::TransformError(format!("Column '{}': {}", column, e)))?
        .as_materialized_series();

    if !series.dtype().is_primitive_numeric() {
        return Err(SalesvizError::TransformError(format!(
            "Column '{}' is not numeric (found {})",
            column,
            series.dtype()
        )));
    }

    let cast = series
        .cast(&DataType::Float64)
        .map_err(|e| cast_error(series, "f64", e))?;
    let ca = cast.f64().map_err(|e| cast_error(series, "f64", e))?;
    Ok(ca.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_columns_ok_with_extras() {
        let df = df! {
            "a" => [1i64],
            "b" => ["x"],
            "extra" => [true],
        }
        .unwrap();
        assert!(require_columns(&df, &["a", "b"], "test chart").is_ok());
    }

    #[test]
    fn test_require_columns_reports_missing() {
        let df = df! { "a" => [1i64] }.unwrap();
        let err = require_columns(&df, &["a", "zzz"], "sales chart")
            .unwrap_err()
            .to_string();
        assert!(err.contains("'zzz'"));
        assert!(err.contains("sales chart"));
        assert!(err.contains("Available columns: a"));
    }

    #[test]
    fn test_rows_preserve_types_and_nulls() {
        let df = df! {
            "id" => [Some(1i64), None],
            "sales" => [Some(2.5f64), Some(f64::NAN)],
            "holiday" => [Some(true), None],
            "kind" => [Some("A"), None],
        }
        .unwrap();

        let rows = dataframe_to_rows(&df).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], 1);
        assert_eq!(rows[0]["sales"], 2.5);
        assert_eq!(rows[0]["holiday"], true);
        assert_eq!(rows[0]["kind"], "A");
        assert_eq!(rows[1]["id"], Value::Null);
        assert_eq!(rows[1]["sales"], Value::Null);
        assert_eq!(rows[1]["kind"], Value::Null);

        // Column order is kept
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["id", "sales", "holiday", "kind"]);
    }

    #[test]
    fn test_numeric_strings_stay_strings() {
        let df = df! { "store_id" => ["1", "2"] }.unwrap();
        let values = dataframe_to_values(&df).unwrap();
        assert_eq!(values[0]["store_id"], "1");
    }

    #[test]
    fn test_date_and_datetime_to_iso() {
        let dates = Series::new("d".into(), [Some(15340i32), None])
            .cast(&DataType::Date)
            .unwrap();
        let values = column_to_values(&dates).unwrap();
        assert_eq!(values[0], "2012-01-01");
        assert_eq!(values[1], Value::Null);

        let stamps = Series::new("t".into(), [1_325_376_000_000i64])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let values = column_to_values(&stamps).unwrap();
        assert_eq!(values[0], "2012-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_numeric_values_rejects_text() {
        let df = df! { "a" => ["x"], "b" => [1i32] }.unwrap();
        assert!(numeric_values(&df, "a").is_err());
        assert_eq!(numeric_values(&df, "b").unwrap(), vec![Some(1.0)]);
        assert!(numeric_values(&df, "missing").is_err());
    }
}
