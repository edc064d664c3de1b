//! Centralized naming conventions for salesviz-generated identifiers.
//!
//! Derived columns use plain, readable names because they end up as axis
//! fields in the exported charts. Keys that only live inside generated
//! documents use a double-underscore prefix/suffix pattern to avoid
//! collision with warehouse column names.
//!
//! # Categories
//!
//! - **Calendar columns**: Added by the calendar transform (`year`, `week`, `month`, `day`)
//! - **Derived columns**: Bins and formatted labels (`<column>_bin`, `<column>_formatted`)
//! - **Document keys**: Dataset key and script element id inside exported files
//! - **Artifacts**: File extensions of exported charts

use const_format::concatcp;

// ============================================================================
// Base Building Blocks
// ============================================================================

/// Base prefix for all salesviz document-level identifiers
const SALESVIZ_PREFIX: &str = "__salesviz_";

/// Suffix for all salesviz identifiers (double underscore)
const SALESVIZ_SUFFIX: &str = "__";

/// Suffix for quantile bin columns
const BIN_SUFFIX: &str = "_bin";

/// Suffix for preformatted label columns
const FORMATTED_SUFFIX: &str = "_formatted";

// ============================================================================
// Calendar Columns
// ============================================================================

/// Calendar year derived from a date column
pub const YEAR_COLUMN: &str = "year";

/// ISO-8601 week number derived from a date column
pub const WEEK_COLUMN: &str = "week";

/// Month number (1-12) derived from a date column
pub const MONTH_COLUMN: &str = "month";

/// Day of month derived from a date column
pub const DAY_COLUMN: &str = "day";

/// `YYYY-MM` label built from the year and month columns
pub const YEAR_MONTH_COLUMN: &str = "year_month";

// ============================================================================
// Document Keys
// ============================================================================

/// Key of the chart table inside the Vega-Lite `datasets` object.
pub const CHART_DATA_KEY: &str = concatcp!(SALESVIZ_PREFIX, "chart", SALESVIZ_SUFFIX);

/// Id of the script element holding the Vega-Lite spec in exported HTML.
pub const SPEC_ELEMENT_ID: &str = concatcp!(SALESVIZ_PREFIX, "spec", SALESVIZ_SUFFIX);

/// Id of the element the chart is embedded into in exported HTML.
pub const VIEW_ELEMENT_ID: &str = concatcp!(SALESVIZ_PREFIX, "view", SALESVIZ_SUFFIX);

// ============================================================================
// Artifacts
// ============================================================================

/// Extension of the interactive document
pub const HTML_EXTENSION: &str = "html";

/// Extension of the static image
pub const PNG_EXTENSION: &str = "png";

// ============================================================================
// Constructor Functions
// ============================================================================

/// Name of the bin column derived from `column`.
///
/// # Example
/// ```
/// use salesviz::naming;
/// assert_eq!(naming::bin_column("store_size"), "store_size_bin");
/// ```
pub fn bin_column(column: &str) -> String {
    format!("{}{}", column, BIN_SUFFIX)
}

/// Name of the preformatted label column derived from `column`.
///
/// # Example
/// ```
/// use salesviz::naming;
/// assert_eq!(
///     naming::formatted_column("total_weekly_sales"),
///     "total_weekly_sales_formatted"
/// );
/// ```
pub fn formatted_column(column: &str) -> String {
    format!("{}{}", column, FORMATTED_SUFFIX)
}

/// File name of an exported artifact.
pub fn artifact_file(basename: &str, extension: &str) -> String {
    format!("{}.{}", basename, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_keys_are_reserved() {
        assert_eq!(CHART_DATA_KEY, "__salesviz_chart__");
        assert_eq!(SPEC_ELEMENT_ID, "__salesviz_spec__");
        assert!(VIEW_ELEMENT_ID.starts_with(SALESVIZ_PREFIX));
        assert!(VIEW_ELEMENT_ID.ends_with(SALESVIZ_SUFFIX));
    }

    #[test]
    fn test_derived_column_names() {
        assert_eq!(bin_column("cpi"), "cpi_bin");
        assert_eq!(formatted_column("sales"), "sales_formatted");
    }

    #[test]
    fn test_artifact_file() {
        assert_eq!(artifact_file("fuel_price_by_year", HTML_EXTENSION), "fuel_price_by_year.html");
        assert_eq!(artifact_file("fuel_price_by_year", PNG_EXTENSION), "fuel_price_by_year.png");
    }
}
