/*!
# salesviz - Warehouse Sales Reports as Vega-Lite Charts

A batch reporting pipeline for the retail sales dataset (stores, weekly sales,
markdowns, fuel prices, CPI). Each report pulls a tidy table out of the
warehouse, reshapes it, and exports the result as a chart.

## Example

```rust,ignore
use salesviz::config::Settings;
use salesviz::export::Exporter;
use salesviz::reader::{Reader, SnowflakeReader};
use salesviz::report::{self, RunOptions};

let settings = Settings::from_env();
let mut reader = SnowflakeReader::connect(&settings)?;
let exporter = Exporter::new(&settings.output_dir);
report::run_reports(&reader, &exporter, &report::catalog(), &RunOptions::default())?;
reader.close()?;
```

## Architecture

Every report follows the same sequence:
- **SQL** → bound with named parameters and executed by a [`reader::Reader`]
- **Table** → a Polars `DataFrame`, reshaped by the [`transform`] functions
- **Chart** → built by a pure function in [`chart`] that binds columns to encodings
- **Output** → written by [`export::Exporter`] as `<name>.html` plus a best-effort `<name>.png`

## Core Components

- [`config`] - Connection parameters from the environment
- [`reader`] - Warehouse client abstraction and the Snowflake implementation
- [`transform`] - Calendar fields, quantile binning, group aggregation
- [`chart`] - Chart specifications and the chart catalog
- [`writer`] - Vega-Lite, HTML and static image writers
- [`report`] - Report catalog and the sequential driver
*/

pub mod chart;
pub mod config;
pub mod export;
pub mod naming;
pub mod reader;
pub mod report;
pub mod table;
pub mod transform;
pub mod writer;

// Re-export key types for convenience
pub use chart::{Chart, ChartSpec, Channel, Mark};
pub use config::Settings;
pub use export::{ExportedChart, Exporter};
pub use reader::{ParamValue, Params, Reader};

// DataFrame abstraction (wraps Polars)
pub use polars::prelude::DataFrame;

/// Main library error type
#[derive(thiserror::Error, Debug)]
pub enum SalesvizError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Transform error: {0}")]
    TransformError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Output generation error: {0}")]
    WriterError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, SalesvizError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::export::Exporter;
    use crate::reader::stub::StubReader;
    use crate::report::{self, RunOptions};
    use crate::transform::{aggregate, Aggregation};
    use crate::writer::html::read_embedded_spec;
    use crate::writer::ImageRenderer;
    use polars::prelude::*;
    use std::path::Path;

    struct BrokenRenderer;

    impl ImageRenderer for BrokenRenderer {
        fn render_png(&self, _spec_json: &str, _path: &Path) -> Result<()> {
            Err(SalesvizError::ExportError(
                "image engine unavailable".to_string(),
            ))
        }
    }

    fn stub_warehouse() -> StubReader {
        let mut reader = StubReader::new();
        reader.respond(
            "d.is_holiday",
            df! {
                "store_id" => [1i64, 1, 2],
                "is_holiday" => [true, false, true],
                "store_weekly_sales" => [100.0f64, 50.0, 200.0],
            }
            .unwrap(),
        );
        reader.respond(
            "f.store_temperature",
            df! {
                "report_date" => ["2011-02-04", "2012-07-13"],
                "store_weekly_sales" => [1200.0f64, 900.0],
                "store_temperature" => [38.5f64, 81.2],
            }
            .unwrap(),
        );
        reader.respond(
            "GROUP BY s.store_size",
            df! {
                "total_weekly_sales" => [5.0e8f64, 1.0e8, 3.0e8, 2.0e8],
                "store_size" => [200_000i64, 40_000, 150_000, 90_000],
            }
            .unwrap(),
        );
        reader.respond(
            "GROUP BY s.store_type, d.report_date",
            df! {
                "total_weekly_sales" => [10.0f64, 20.0, 30.0, 5.0],
                "store_type" => ["A", "A", "A", "B"],
                "report_date" => ["2010-02-05", "2010-02-12", "2010-03-05", "2010-02-05"],
            }
            .unwrap(),
        );
        reader.respond(
            "UNPIVOT",
            df! {
                "year" => [2011i64, 2011, 2012],
                "markdown_type" => ["MARKDOWN1", "MARKDOWN2", "MARKDOWN1"],
                "total_markdown_amount" => [10.0f64, 20.0, 30.0],
                "store_id" => [1i64, 1, 1],
            }
            .unwrap(),
        );
        reader.respond(
            "GROUP BY s.store_type, s.store_id",
            df! {
                "store_type" => ["A", "A", "B"],
                "store_id" => [1i64, 2, 3],
                "total_weekly_sales" => [10.0f64, 20.0, 5.0],
            }
            .unwrap(),
        );
        reader.respond(
            "f.fuel_price",
            df! {
                "report_date" => ["2010-02-05", "2010-02-12", "2011-03-04"],
                "fuel_price" => [2.5f64, 2.7, 3.1],
            }
            .unwrap(),
        );
        reader.respond(
            "f.cpi",
            df! {
                "cpi" => [211.1f64, 211.1, 215.3],
                "store_weekly_sales" => [10.0f64, 20.0, 30.0],
            }
            .unwrap(),
        );
        reader.respond(
            "s.dept_id",
            df! {
                "dept_id" => [7i64, 3],
                "total_weekly_sales" => [90.0f64, 40.0],
            }
            .unwrap(),
        );
        // Matches several statements; registered last so it only answers the by-date query
        reader.respond(
            "f.store_weekly_sales IS NOT NULL",
            df! {
                "report_date" => ["2010-02-05", "2011-02-05", "2011-03-12"],
                "store_weekly_sales" => [1.5e9f64, 2.0e9, 0.5e9],
            }
            .unwrap(),
        );
        reader
    }

    #[test]
    fn test_end_to_end_holiday_aggregation_scenario() {
        let rows = df! {
            "store_id" => [1i64, 1, 2],
            "is_holiday" => [true, false, true],
            "store_weekly_sales" => [100.0f64, 50.0, 200.0],
        }
        .unwrap();

        let agg = aggregate(
            &rows,
            &["store_id", "is_holiday"],
            &[Aggregation::sum("store_weekly_sales", "store_weekly_sales")],
        )
        .unwrap();
        assert_eq!(agg.height(), 3);

        let stores: Vec<Option<i64>> = agg.column("store_id").unwrap().i64().unwrap().into_iter().collect();
        let holidays: Vec<Option<bool>> = agg.column("is_holiday").unwrap().bool().unwrap().into_iter().collect();
        let sums: Vec<Option<f64>> = agg
            .column("store_weekly_sales")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        // Sorted by keys: (1, false), (1, true), (2, true)
        assert_eq!(stores, vec![Some(1), Some(1), Some(2)]);
        assert_eq!(holidays, vec![Some(false), Some(true), Some(true)]);
        assert_eq!(sums, vec![Some(50.0), Some(100.0), Some(200.0)]);

        let chart = chart::weekly_sales_by_store_and_holiday(&agg).unwrap();
        let color_field = &chart.spec.encodings[&Channel::Color].field;
        let categories = chart.data.column(color_field).unwrap().n_unique().unwrap();
        assert_eq!(categories, 2);
    }

    #[test]
    fn test_end_to_end_calendar_scenario() {
        let table = df! { "report_date" => ["2012-01-01", "2012-12-31"] }.unwrap();
        let derived = transform::add_calendar_fields(&table, "report_date").unwrap();

        let years: Vec<Option<i32>> = derived.column("year").unwrap().i32().unwrap().into_iter().collect();
        let months: Vec<Option<i32>> = derived.column("month").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(years, vec![Some(2012), Some(2012)]);
        assert_eq!(months, vec![Some(1), Some(12)]);
    }

    #[test]
    fn test_full_catalog_against_stub_warehouse() {
        let dir = tempfile::tempdir().unwrap();
        let reader = stub_warehouse();
        let exporter = Exporter::new(dir.path()).with_renderer(Box::new(BrokenRenderer));

        let summary =
            report::run_reports(&reader, &exporter, &report::catalog(), &RunOptions::default())
                .unwrap();

        assert!(summary.failed.is_empty());
        assert_eq!(summary.exported.len(), 16);
        for exported in &summary.exported {
            assert!(exported.html.exists(), "missing {}", exported.html.display());
            assert!(exported.image.is_none());
        }
        assert!(dir
            .path()
            .join("weekly_sales_by_store_and_holiday_2012.html")
            .exists());
        assert!(dir
            .path()
            .join("weekly_sales_vs_temperature_by_year_2011_2012.html")
            .exists());

        // Date-windowed reports bind their parameters instead of inlining them
        let calls = reader.calls();
        let holiday_call = calls
            .iter()
            .find(|(sql, _)| sql.contains("d.is_holiday"))
            .unwrap();
        assert!(holiday_call.0.contains(":start_date"));
        assert!(!holiday_call.0.contains("2012-01-01"));
        assert_eq!(
            holiday_call.1.get("start_date"),
            Some(&ParamValue::Date(
                chrono::NaiveDate::from_ymd_opt(2012, 1, 1).unwrap()
            ))
        );
    }

    #[test]
    fn test_exported_document_round_trips_chart_table() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path()).with_renderer(Box::new(BrokenRenderer));

        let table = df! {
            "store_type" => ["A", "B", "C"],
            "total_weekly_sales" => [4.3e9f64, 2.0e9, 0.5e9],
            "ignored" => [1i64, 2, 3],
        }
        .unwrap();
        let chart = chart::sales_by_store_type(&table).unwrap();
        let exported = exporter.export(&chart, "round_trip").unwrap();

        let html = std::fs::read_to_string(&exported.html).unwrap();
        let spec = read_embedded_spec(&html).unwrap();
        let rows = spec["datasets"][naming::CHART_DATA_KEY].as_array().unwrap();
        assert_eq!(rows.len(), chart.data.height());

        let mut embedded: Vec<String> = rows[0].as_object().unwrap().keys().cloned().collect();
        let mut expected: Vec<String> = chart
            .data
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();
        embedded.sort();
        expected.sort();
        assert_eq!(embedded, expected);
    }
}
