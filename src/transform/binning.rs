//! Quantile binning of a numeric column into ordered, labelled buckets
//!
//! Bucket edges are the `k`-quantiles of the non-null values (linear
//! interpolation between order statistics). Buckets are right-closed, with
//! the lowest edge included in the first bucket, so every non-null value is
//! assigned. When edges coincide (few distinct values, heavy ties) the
//! duplicates are dropped and fewer buckets are realized; the result reports
//! this instead of failing.

use crate::naming;
use crate::table::numeric_values;
use crate::{DataFrame, Result, SalesvizError};
use polars::prelude::*;

/// Labels for ten buckets, smallest first
pub const DECILE_LABELS: [&str; 10] = [
    "Q1-Small", "Q2", "Q3", "Q4", "Q5", "Q6", "Q7", "Q8", "Q9", "Q10-Large",
];

/// Result of [`bin_quantiles`]
#[derive(Debug, Clone)]
pub struct BinnedTable {
    /// Input table plus the `<column>_bin` label column
    pub table: DataFrame,
    /// Name of the label column
    pub bin_column: String,
    /// Distinct bucket edges, ascending (`labels.len() + 1` of them, or none)
    pub edges: Vec<f64>,
    /// Labels of the realized buckets, in order
    pub labels: Vec<String>,
    /// Number of buckets asked for
    pub requested: usize,
}

impl BinnedTable {
    pub fn realized(&self) -> usize {
        self.labels.len()
    }

    /// True when tied edges left fewer buckets than requested
    pub fn is_degraded(&self) -> bool {
        self.realized() < self.requested
    }
}

/// `q`-quantile of sorted values, linear interpolation.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Distinct quantile edges for `bucket_count` buckets over `values`.
fn quantile_edges(values: &[f64], bucket_count: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut edges: Vec<f64> = (0..=bucket_count)
        .map(|i| quantile(&sorted, i as f64 / bucket_count as f64))
        .collect();
    edges.dedup();
    edges
}

/// Index of the bucket holding `value` (right-closed, first bucket closed on both ends).
fn bucket_index(edges: &[f64], value: f64) -> Option<usize> {
    match edges.len() {
        0 => None,
        1 => (value == edges[0]).then_some(0),
        _ => {
            if value < edges[0] || value > edges[edges.len() - 1] {
                return None;
            }
            edges[1..].iter().position(|edge| value <= *edge)
        }
    }
}

/// Partition `column` into `bucket_count` quantile buckets.
///
/// Adds a String column `<column>_bin` holding each row's bucket label;
/// nulls and NaN stay null. `labels`, when given, name the buckets from lowest to
/// highest and must number exactly `bucket_count`. If tied edges realize
/// fewer buckets, the given labels no longer line up and generic labels
/// `Q1..Qk` are used instead (logged as a warning, visible through
/// [`BinnedTable::is_degraded`]).
///
/// A constant column yields a single bucket; an empty or all-null column
/// yields no buckets.
///
/// # Errors
///
/// Returns `SalesvizError::TransformError` if `bucket_count` is zero, the
/// label count does not match, or the column is missing or not numeric.
pub fn bin_quantiles(
    df: &DataFrame,
    column: &str,
    bucket_count: usize,
    labels: Option<&[&str]>,
) -> Result<BinnedTable> {
    if bucket_count == 0 {
        return Err(SalesvizError::TransformError(
            "Quantile binning needs at least one bucket".to_string(),
        ));
    }
    if let Some(labels) = labels {
        if labels.len() != bucket_count {
            return Err(SalesvizError::TransformError(format!(
                "Expected {} bucket labels for column '{}', got {}",
                bucket_count,
                column,
                labels.len()
            )));
        }
    }

    let values = numeric_values(df, column)?;
    // NaN counts as missing, like null
    let values: Vec<Option<f64>> = values
        .into_iter()
        .map(|v| v.filter(|v| !v.is_nan()))
        .collect();
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let edges = quantile_edges(&present, bucket_count);

    let realized = match edges.len() {
        0 => 0,
        1 => 1,
        n => n - 1,
    };
    let bucket_labels: Vec<String> = match labels {
        Some(labels) if realized == bucket_count => {
            labels.iter().map(|l| l.to_string()).collect()
        }
        _ => (1..=realized).map(|i| format!("Q{}", i)).collect(),
    };
    if realized > 0 && realized < bucket_count {
        tracing::warn!(
            "Column '{}': duplicate quantile edges dropped, {} of {} buckets realized",
            column,
            realized,
            bucket_count
        );
    }

    let assigned: Vec<Option<String>> = values
        .iter()
        .map(|value| {
            value
                .and_then(|v| bucket_index(&edges, v))
                .map(|idx| bucket_labels[idx].clone())
        })
        .collect();

    let bin_column = naming::bin_column(column);
    let mut table = df.clone();
    table
        .with_column(Series::new(bin_column.as_str().into(), assigned))
        .map_err(|e| {
            SalesvizError::TransformError(format!("Failed to add column '{}': {}", bin_column, e))
        })?;

    Ok(BinnedTable {
        table,
        bin_column,
        edges,
        labels: bucket_labels,
        requested: bucket_count,
    })
}
