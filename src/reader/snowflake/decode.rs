//! Conversion of JSON result sets into typed DataFrames
//!
//! Every cell arrives as a string (or null). The declared column type
//! decides how it is parsed:
//!
//! | Warehouse type | DataFrame dtype |
//! |---|---|
//! | `fixed`, scale 0 | Int64 (Float64 when a value overflows) |
//! | `fixed`, scale > 0; `real` | Float64 |
//! | `boolean` | Boolean |
//! | `date` (days since epoch) | Date |
//! | `timestamp_ntz/ltz/tz` (`secs.fraction [offset]`) | Datetime(ms) |
//! | `time` (seconds since midnight) | String `HH:MM:SS` |
//! | anything else | String |

use super::wire::RowType;
use crate::{DataFrame, Result, SalesvizError};
use polars::prelude::*;
use serde_json::Value;

/// Column name as the caller sees it.
///
/// Unquoted identifiers come back upper-cased; those are folded to lower
/// case. Names with any lower-case letter were quoted and are kept as-is.
pub fn normalize_column_name(name: &str) -> String {
    let has_upper = name.chars().any(|c| c.is_uppercase());
    let has_lower = name.chars().any(|c| c.is_lowercase());
    if has_upper && !has_lower {
        name.to_lowercase()
    } else {
        name.to_string()
    }
}

fn cell(row: &[Value], idx: usize) -> Option<String> {
    match row.get(idx) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn decode_error(column: &str, kind: &str, raw: &str) -> SalesvizError {
    SalesvizError::QueryError(format!(
        "Cannot decode value '{}' of column '{}' as {}",
        raw, column, kind
    ))
}

/// Milliseconds since epoch from `secs.fraction`, ignoring a trailing offset.
fn parse_epoch_millis(raw: &str) -> Option<i64> {
    let value = raw.split_whitespace().next()?;
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let (secs, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let secs: i64 = secs.parse().ok()?;
    let millis_fraction: i64 = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<3}", &fraction[..fraction.len().min(3)]);
        padded.parse().ok()?
    };
    let magnitude = secs.checked_mul(1000)?.checked_add(millis_fraction)?;
    Some(if negative { -magnitude } else { magnitude })
}

/// `HH:MM:SS` from seconds since midnight (fraction dropped).
fn format_time_of_day(raw: &str) -> Option<String> {
    let secs: u64 = raw.split('.').next()?.parse().ok()?;
    Some(format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    ))
}

fn decode_column(rowtype: &RowType, idx: usize, rows: &[Vec<Value>]) -> Result<Series> {
    let name = normalize_column_name(&rowtype.name);
    let kind = rowtype.kind.to_ascii_lowercase();
    let raw: Vec<Option<String>> = rows.iter().map(|row| cell(row, idx)).collect();

    let series = match kind.as_str() {
        "fixed" if rowtype.scale.unwrap_or(0) == 0 => {
            let ints: Vec<Option<i64>> = raw
                .iter()
                .map(|v| v.as_deref().map(|s| s.parse::<i64>()))
                .map(|v| v.transpose().ok().flatten())
                .collect();
            let overflowed = raw
                .iter()
                .zip(&ints)
                .any(|(r, i)| r.is_some() && i.is_none());
            if overflowed {
                Series::new(name.as_str().into(), parse_floats(&name, &raw)?)
            } else {
                Series::new(name.as_str().into(), ints)
            }
        }
        "fixed" | "real" => Series::new(name.as_str().into(), parse_floats(&name, &raw)?),
        "boolean" => {
            let values = raw
                .iter()
                .map(|v| match v.as_deref() {
                    None => Ok(None),
                    Some("1") | Some("true") | Some("TRUE") => Ok(Some(true)),
                    Some("0") | Some("false") | Some("FALSE") => Ok(Some(false)),
                    Some(other) => Err(decode_error(&name, "boolean", other)),
                })
                .collect::<Result<Vec<Option<bool>>>>()?;
            Series::new(name.as_str().into(), values)
        }
        "date" => {
            let days = raw
                .iter()
                .map(|v| match v.as_deref() {
                    None => Ok(None),
                    Some(s) => s
                        .parse::<i32>()
                        .map(Some)
                        .map_err(|_| decode_error(&name, "date", s)),
                })
                .collect::<Result<Vec<Option<i32>>>>()?;
            Series::new(name.as_str().into(), days)
                .cast(&DataType::Date)
                .map_err(|e| SalesvizError::QueryError(format!("Column '{}': {}", name, e)))?
        }
        "timestamp_ntz" | "timestamp_ltz" | "timestamp_tz" => {
            let millis = raw
                .iter()
                .map(|v| match v.as_deref() {
                    None => Ok(None),
                    Some(s) => parse_epoch_millis(s)
                        .map(Some)
                        .ok_or_else(|| decode_error(&name, "timestamp", s)),
                })
                .collect::<Result<Vec<Option<i64>>>>()?;
            Series::new(name.as_str().into(), millis)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                .map_err(|e| SalesvizError::QueryError(format!("Column '{}': {}", name, e)))?
        }
        "time" => {
            let values: Vec<Option<String>> = raw
                .iter()
                .map(|v| v.as_deref().and_then(format_time_of_day))
                .collect();
            Series::new(name.as_str().into(), values)
        }
        _ => Series::new(name.as_str().into(), raw),
    };

    Ok(series)
}

fn parse_floats(name: &str, raw: &[Option<String>]) -> Result<Vec<Option<f64>>> {
    raw.iter()
        .map(|v| match v.as_deref() {
            None => Ok(None),
            Some(s) => s
                .parse::<f64>()
                .map(Some)
                .map_err(|_| decode_error(name, "number", s)),
        })
        .collect()
}

/// Build a DataFrame from a result set description and its rows.
pub fn decode_rowset(rowtype: &[RowType], rows: &[Vec<Value>]) -> Result<DataFrame> {
    let columns = rowtype
        .iter()
        .enumerate()
        .map(|(idx, rt)| decode_column(rt, idx, rows).map(Column::from))
        .collect::<Result<Vec<Column>>>()?;

    DataFrame::new(columns).map_err(|e| {
        SalesvizError::QueryError(format!("Failed to assemble result table: {}", e))
    })
}

/// Parse a result chunk body.
///
/// Chunk bodies hold comma-separated row arrays without the enclosing brackets.
pub fn parse_chunk(body: &str) -> Result<Vec<Vec<Value>>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let wrapped = if trimmed.starts_with("[[") || trimmed == "[]" {
        trimmed.to_string()
    } else {
        format!("[{}]", trimmed)
    };
    serde_json::from_str(&wrapped)
        .map_err(|e| SalesvizError::QueryError(format!("Malformed result chunk: {}", e)))
}
