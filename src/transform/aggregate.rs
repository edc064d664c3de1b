//! Group aggregation and small reshaping helpers

use crate::naming;
use crate::table::{numeric_values, require_columns};
use crate::{DataFrame, Result, SalesvizError};
use polars::prelude::*;

/// Aggregate function applied to a value column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFn {
    Sum,
    Mean,
}

/// One output column of [`aggregate`]: `function(column) AS output`
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub column: String,
    pub function: AggFn,
    pub output: String,
}

impl Aggregation {
    pub fn sum(column: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            function: AggFn::Sum,
            output: output.into(),
        }
    }

    pub fn mean(column: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            function: AggFn::Mean,
            output: output.into(),
        }
    }

    fn to_expr(&self) -> Expr {
        let input = col(self.column.as_str());
        match self.function {
            AggFn::Sum => input.sum(),
            AggFn::Mean => input.mean(),
        }
        .alias(self.output.as_str())
    }
}

fn transform_error(context: &str, e: PolarsError) -> SalesvizError {
    SalesvizError::TransformError(format!("{}: {}", context, e))
}

/// Group `df` by `keys` and compute `aggregations` per group.
///
/// Rows with a null in any key column are dropped. The result has one row
/// per distinct key combination, sorted by the keys ascending, with the key
/// columns first followed by the aggregation outputs.
///
/// # Errors
///
/// Returns `SalesvizError::TransformError` when a key or value column is
/// missing, or when no keys are given.
pub fn aggregate(df: &DataFrame, keys: &[&str], aggregations: &[Aggregation]) -> Result<DataFrame> {
    if keys.is_empty() {
        return Err(SalesvizError::TransformError(
            "Aggregation needs at least one group key".to_string(),
        ));
    }
    let mut required: Vec<&str> = keys.to_vec();
    required.extend(aggregations.iter().map(|a| a.column.as_str()));
    require_columns(df, &required, "aggregation")
        .map_err(|e| SalesvizError::TransformError(e.to_string()))?;

    let not_null = keys
        .iter()
        .map(|key| col(*key).is_not_null())
        .reduce(|acc, expr| acc.and(expr))
        .unwrap_or_else(|| lit(true));

    df.clone()
        .lazy()
        .filter(not_null)
        .group_by(keys.iter().map(|key| col(*key)).collect::<Vec<_>>())
        .agg(aggregations.iter().map(Aggregation::to_expr).collect::<Vec<_>>())
        .sort(keys.to_vec(), SortMultipleOptions::default())
        .collect()
        .map_err(|e| transform_error(&format!("Failed to aggregate by {}", keys.join(", ")), e))
}

/// Sort by one column.
pub fn sort_by(df: &DataFrame, column: &str, descending: bool) -> Result<DataFrame> {
    df.sort(
        [column],
        SortMultipleOptions::default()
            .with_order_descending(descending)
            .with_nulls_last(true),
    )
    .map_err(|e| transform_error(&format!("Failed to sort by '{}'", column), e))
}

/// Replace `column` with its string rendering (for categorical plotting of ids).
pub fn cast_to_string(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let series = df
        .column(column)
        .map_err(|e| transform_error(&format!("Column '{}'", column), e))?
        .as_materialized_series()
        .cast(&DataType::String)
        .map_err(|e| transform_error(&format!("Failed to cast '{}' to text", column), e))?;

    let mut out = df.clone();
    out.with_column(series)
        .map_err(|e| transform_error(&format!("Failed to replace '{}'", column), e))?;
    Ok(out)
}

fn integer_values(df: &DataFrame, column: &str) -> Result<Vec<Option<i64>>> {
    Ok(numeric_values(df, column)?
        .into_iter()
        .map(|v| v.map(|v| v as i64))
        .collect())
}

/// Add a `year_month` column (`YYYY-MM`) from integer year and month columns.
pub fn with_year_month(df: &DataFrame, year_column: &str, month_column: &str) -> Result<DataFrame> {
    let years = integer_values(df, year_column)?;
    let months = integer_values(df, month_column)?;
    let labels: Vec<Option<String>> = years
        .iter()
        .zip(&months)
        .map(|(year, month)| match (year, month) {
            (Some(y), Some(m)) => Some(format!("{}-{:02}", y, m)),
            _ => None,
        })
        .collect();

    let mut out = df.clone();
    out.with_column(Series::new(naming::YEAR_MONTH_COLUMN.into(), labels))
        .map_err(|e| transform_error("Failed to add year_month", e))?;
    Ok(out)
}

/// Format an amount in billions with two decimals: `1234567890.0` → `"1.23B"`.
pub fn format_billions(value: f64) -> String {
    format!("{:.2}B", value / 1e9)
}

/// Copy of `df` with a `<column>_formatted` text column in billions.
pub fn with_formatted_billions(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let labels: Vec<Option<String>> = numeric_values(df, column)?
        .into_iter()
        .map(|v| v.map(format_billions))
        .collect();

    let mut out = df.clone();
    out.with_column(Series::new(
        naming::formatted_column(column).as_str().into(),
        labels,
    ))
    .map_err(|e| transform_error("Failed to add formatted column", e))?;
    Ok(out)
}
