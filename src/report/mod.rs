//! Report catalog and driver
//!
//! A report runs one query, reshapes the result and exports one or more
//! charts. Reports run strictly one after another over a single reader.
//!
//! # Example
//!
//! ```rust,ignore
//! use salesviz::report::{self, RunOptions};
//!
//! let summary = report::run_reports(&reader, &exporter, &report::catalog(), &RunOptions::default())?;
//! println!("{} charts written", summary.exported.len());
//! ```

pub mod sql;

use crate::chart::{self, Chart, TimeInterval};
use crate::export::{ExportedChart, Exporter};
use crate::reader::{Params, Reader};
use crate::transform::{self, Aggregation, DECILE_LABELS};
use crate::{naming, DataFrame, Result, SalesvizError};
use chrono::{Datelike, NaiveDate};

/// Inclusive date range bound as `:start_date` / `:end_date`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// # Errors
    ///
    /// Returns `SalesvizError::ConfigError` if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SalesvizError::ConfigError(format!(
                "Date window starts after it ends ({} > {})",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Whole calendar years `first..=last`
    pub fn years(first: i32, last: i32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(first, 1, 1);
        let end = NaiveDate::from_ymd_opt(last, 12, 31);
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => Err(SalesvizError::ConfigError(format!(
                "Invalid year range {}..{}",
                first, last
            ))),
        }
    }

    pub fn params(&self) -> Params {
        Params::new()
            .with("start_date", self.start)
            .with("end_date", self.end)
    }

    /// Basename suffix: `2012` within one year, `2011_2012` across years
    pub fn suffix(&self) -> String {
        if self.start.year() == self.end.year() {
            self.start.year().to_string()
        } else {
            format!("{}_{}", self.start.year(), self.end.year())
        }
    }
}

/// State handed to a report while it runs
pub struct ReportContext<'a> {
    reader: &'a dyn Reader,
    exporter: &'a Exporter,
    window: Option<DateWindow>,
    exported: Vec<ExportedChart>,
}

impl<'a> ReportContext<'a> {
    fn query(&self, sql: &str) -> Result<DataFrame> {
        let params = self.window.map(|w| w.params()).unwrap_or_default();
        let df = self.reader.read_table(sql, &params)?;
        tracing::debug!("Query returned {} rows", df.height());
        Ok(df)
    }

    /// Export under `basename`, suffixed with the window's year span if any
    fn export(&mut self, chart: Chart, basename: &str) -> Result<()> {
        let basename = match &self.window {
            Some(window) => format!("{}_{}", basename, window.suffix()),
            None => basename.to_string(),
        };
        let exported = self.exporter.export(&chart, &basename)?;
        self.exported.push(exported);
        Ok(())
    }
}

type ReportFn = fn(&mut ReportContext<'_>) -> Result<()>;

/// One entry of the report catalog
#[derive(Clone)]
pub struct Report {
    pub name: &'static str,
    pub description: &'static str,
    /// Date window the query is restricted to, if it takes one
    pub window: Option<DateWindow>,
    build: ReportFn,
}

impl std::fmt::Debug for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Report")
            .field("name", &self.name)
            .field("window", &self.window)
            .finish()
    }
}

/// Selection and overrides for [`run_reports`]
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Report names to run; all when empty
    pub only: Vec<String>,
    /// Replaces the window of every windowed report
    pub window: Option<DateWindow>,
    /// Record a failing report and continue with the next one
    pub keep_going: bool,
}

/// Outcome of a run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: Vec<String>,
    pub exported: Vec<ExportedChart>,
    pub failed: Vec<(String, SalesvizError)>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

fn holiday(ctx: &mut ReportContext<'_>) -> Result<()> {
    let df = ctx.query(sql::SALES_BY_STORE_AND_HOLIDAY)?;
    let by_store = transform::aggregate(
        &df,
        &["store_id", "is_holiday"],
        &[Aggregation::sum("store_weekly_sales", "store_weekly_sales")],
    )?;
    ctx.export(
        chart::weekly_sales_by_store_and_holiday(&by_store)?,
        "weekly_sales_by_store_and_holiday",
    )
}

fn temperature(ctx: &mut ReportContext<'_>) -> Result<()> {
    let df = ctx.query(sql::SALES_AND_TEMPERATURE)?;
    let df = transform::add_calendar_fields(&df, "report_date")?;
    ctx.export(
        chart::weekly_sales_vs_temperature(&df)?,
        "weekly_sales_vs_temperature_by_year",
    )
}

fn store_size(ctx: &mut ReportContext<'_>) -> Result<()> {
    let df = ctx.query(sql::SALES_BY_STORE_SIZE)?;
    let sizes: Vec<f64> = crate::table::numeric_values(&df, "store_size")?
        .into_iter()
        .flatten()
        .collect();
    if let (Some(min), Some(max)) = (
        sizes.iter().copied().reduce(f64::min),
        sizes.iter().copied().reduce(f64::max),
    ) {
        tracing::info!("store_size ranges from {} to {}", min, max);
    }

    let sorted = transform::sort_by(&df, "store_size", false)?;
    ctx.export(chart::weekly_sales_by_store_size(&sorted)?, "weekly_sales_by_store_size")?;

    let binned = transform::bin_quantiles(
        &df,
        "store_size",
        DECILE_LABELS.len(),
        Some(&DECILE_LABELS[..]),
    )?;
    let by_bin = transform::aggregate(
        &binned.table,
        &[binned.bin_column.as_str()],
        &[Aggregation::sum("total_weekly_sales", "total_weekly_sales")],
    )?;
    ctx.export(
        chart::weekly_sales_by_store_size_bin(&by_bin, &binned.labels)?,
        "weekly_sales_by_store_size_bin",
    )
}

fn monthly_by_store_type(ctx: &mut ReportContext<'_>) -> Result<()> {
    let df = ctx.query(sql::SALES_BY_STORE_TYPE_AND_DATE)?;
    let df = transform::add_calendar_fields(&df, "report_date")?;
    let by_month = transform::aggregate(
        &df,
        &["store_type", naming::MONTH_COLUMN],
        &[Aggregation::sum("total_weekly_sales", "total_monthly_sales")],
    )?;
    ctx.export(chart::monthly_sales_by_store_type(&by_month)?, "monthly_sales_by_store_type")
}

fn markdown(ctx: &mut ReportContext<'_>) -> Result<()> {
    let df = ctx.query(sql::MARKDOWN_BY_YEAR)?;
    ctx.export(chart::yearly_markdown_sales(&df)?, "sql_markdown_sales")
}

fn store_type(ctx: &mut ReportContext<'_>) -> Result<()> {
    let df = ctx.query(sql::SALES_BY_STORE_TYPE_AND_STORE)?;
    // Store ids are categories, not quantities
    let df = transform::cast_to_string(&df, "store_id")?;
    let by_type = transform::aggregate(
        &df,
        &["store_type"],
        &[Aggregation::sum("total_weekly_sales", "total_weekly_sales")],
    )?;

    ctx.export(chart::sales_by_store_type(&by_type)?, "weekly_sales_by_store_type")?;
    ctx.export(chart::sales_by_store_and_type(&df)?, "sales_by_store_and_type")?;
    ctx.export(
        chart::sales_by_store_and_type_facet(&df)?,
        "sales_by_store_and_type_facet",
    )
}

fn fuel_price(ctx: &mut ReportContext<'_>) -> Result<()> {
    let df = ctx.query(sql::FUEL_PRICE_BY_DATE)?;
    let df = transform::add_calendar_fields(&df, "report_date")?;
    let average = [Aggregation::mean("fuel_price", "avg_fuel_price")];

    let by_year = transform::aggregate(&df, &[naming::YEAR_COLUMN], &average)?;
    let by_month = transform::aggregate(
        &df,
        &[naming::YEAR_COLUMN, naming::MONTH_COLUMN],
        &average,
    )?;
    let by_month =
        transform::with_year_month(&by_month, naming::YEAR_COLUMN, naming::MONTH_COLUMN)?;

    ctx.export(chart::fuel_price_by_year(&by_year)?, "fuel_price_by_year")?;
    ctx.export(chart::fuel_price_by_month(&by_month)?, "fuel_price_by_month")
}

fn sales_by_time(ctx: &mut ReportContext<'_>) -> Result<()> {
    let df = ctx.query(sql::SALES_BY_DATE)?;
    let df = transform::add_calendar_fields(&df, "report_date")?;
    let df = transform::add_day_field(&df, "report_date")?;
    let total = [Aggregation::sum("store_weekly_sales", "total_weekly_sales")];

    for (interval, basename) in [
        (TimeInterval::Year, "weekly_sales_by_year"),
        (TimeInterval::Month, "weekly_sales_by_month"),
        (TimeInterval::Day, "weekly_sales_by_day"),
    ] {
        let grouped = transform::aggregate(&df, &[interval.column()], &total)?;
        ctx.export(chart::sales_by_time(&grouped, interval)?, basename)?;
    }
    Ok(())
}

fn cpi(ctx: &mut ReportContext<'_>) -> Result<()> {
    let df = ctx.query(sql::SALES_AND_CPI)?;
    let by_cpi = transform::aggregate(
        &df,
        &["cpi"],
        &[Aggregation::sum("store_weekly_sales", "total_weekly_sales")],
    )?;
    ctx.export(chart::sales_by_cpi(&by_cpi)?, "weekly_sales_by_cpi")
}

fn dept(ctx: &mut ReportContext<'_>) -> Result<()> {
    let df = ctx.query(sql::SALES_BY_DEPT)?;
    ctx.export(chart::sales_by_dept(&df)?, "weekly_sales_by_dept")
}

/// The reports, in run order
pub fn catalog() -> Vec<Report> {
    let year_2012 = DateWindow::years(2012, 2012).ok();
    let years_2011_2012 = DateWindow::years(2011, 2012).ok();

    vec![
        Report {
            name: "weekly_sales_by_store_and_holiday",
            description: "Weekly sales by store & holiday",
            window: year_2012,
            build: holiday,
        },
        Report {
            name: "weekly_sales_vs_temperature",
            description: "Weekly sales vs temperature by week",
            window: years_2011_2012,
            build: temperature,
        },
        Report {
            name: "weekly_sales_by_store_size",
            description: "Weekly sales by store size, raw and in deciles",
            window: None,
            build: store_size,
        },
        Report {
            name: "monthly_sales_by_store_type",
            description: "Monthly sales by store type",
            window: None,
            build: monthly_by_store_type,
        },
        Report {
            name: "yearly_markdown_sales",
            description: "Markdown sales by year and markdown type",
            window: None,
            build: markdown,
        },
        Report {
            name: "sales_by_store_type",
            description: "Sales by store type: share, per store, faceted",
            window: None,
            build: store_type,
        },
        Report {
            name: "fuel_price",
            description: "Average fuel price by year and by month",
            window: None,
            build: fuel_price,
        },
        Report {
            name: "sales_by_time",
            description: "Sales by year, month and day of month",
            window: None,
            build: sales_by_time,
        },
        Report {
            name: "sales_by_cpi",
            description: "Sales by CPI",
            window: None,
            build: cpi,
        },
        Report {
            name: "sales_by_dept",
            description: "Sales by department",
            window: None,
            build: dept,
        },
    ]
}

/// Run `reports` in order against one reader.
///
/// By default the first failing report stops the run and its error is
/// returned. With `keep_going`, failures are collected in the summary and
/// the remaining reports still run.
///
/// # Errors
///
/// Returns `SalesvizError::ConfigError` for unknown names in
/// `options.only`, or the first report error when not keeping going.
pub fn run_reports(
    reader: &dyn Reader,
    exporter: &Exporter,
    reports: &[Report],
    options: &RunOptions,
) -> Result<RunSummary> {
    for name in &options.only {
        if !reports.iter().any(|r| r.name == name) {
            return Err(SalesvizError::ConfigError(format!(
                "Unknown report '{}'. Available reports: {}",
                name,
                reports
                    .iter()
                    .map(|r| r.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
    }

    let selected: Vec<&Report> = reports
        .iter()
        .filter(|r| options.only.is_empty() || options.only.iter().any(|n| n == r.name))
        .collect();

    tracing::info!("Generating {} report(s)...", selected.len());
    let mut summary = RunSummary::default();
    for (idx, report) in selected.iter().enumerate() {
        tracing::info!("{}) {}", idx + 1, report.description);

        let mut ctx = ReportContext {
            reader,
            exporter,
            window: report.window.map(|w| options.window.unwrap_or(w)),
            exported: Vec::new(),
        };
        match (report.build)(&mut ctx) {
            Ok(()) => {
                tracing::info!("done.");
                summary.completed.push(report.name.to_string());
                summary.exported.append(&mut ctx.exported);
            }
            Err(e) if options.keep_going => {
                tracing::error!("Report '{}' failed: {}", report.name, e);
                summary.exported.append(&mut ctx.exported);
                summary.failed.push((report.name.to_string(), e));
            }
            Err(e) => {
                tracing::error!("Report '{}' failed: {}", report.name, e);
                return Err(e);
            }
        }
    }

    tracing::info!(
        "All reports generated: {} chart(s), {} failure(s)",
        summary.exported.len(),
        summary.failed.len()
    );
    Ok(summary)
}

/// Run `reports`, then close `reader` whatever the outcome.
///
/// A report error takes precedence over a failure to close; the latter is
/// then only logged.
pub fn run_and_close(
    reader: &mut dyn Reader,
    exporter: &Exporter,
    reports: &[Report],
    options: &RunOptions,
) -> Result<RunSummary> {
    let outcome = run_reports(&*reader, exporter, reports, options);
    let closed = reader.close();
    match outcome {
        Ok(summary) => closed.map(|_| summary),
        Err(e) => {
            if let Err(close_err) = closed {
                tracing::warn!("Failed to close the warehouse session: {}", close_err);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::stub::StubReader;
    use crate::ParamValue;
    use polars::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cpi_and_dept_reader() -> StubReader {
        let mut reader = StubReader::new();
        reader.respond(
            "f.cpi",
            df! {
                "cpi" => [211.1f64, 215.3, 211.1],
                "store_weekly_sales" => [1.0f64, 2.0, 3.0],
            }
            .unwrap(),
        );
        reader.respond(
            "s.dept_id",
            df! {
                "dept_id" => [1i64, 2],
                "total_weekly_sales" => [5.0f64, 4.0],
            }
            .unwrap(),
        );
        reader
    }

    #[test]
    fn test_window_suffix_and_params() {
        let one_year = DateWindow::years(2012, 2012).unwrap();
        assert_eq!(one_year.suffix(), "2012");
        assert_eq!(one_year.end, date(2012, 12, 31));

        let span = DateWindow::new(date(2011, 1, 1), date(2012, 12, 31)).unwrap();
        assert_eq!(span.suffix(), "2011_2012");
        let params = span.params();
        assert_eq!(params.get("start_date"), Some(&ParamValue::Date(date(2011, 1, 1))));
        assert_eq!(params.get("end_date"), Some(&ParamValue::Date(date(2012, 12, 31))));

        assert!(DateWindow::new(date(2012, 2, 1), date(2012, 1, 1)).is_err());
    }

    #[test]
    fn test_catalog_names_are_unique() {
        let reports = catalog();
        assert_eq!(reports.len(), 10);
        let mut names: Vec<&str> = reports.iter().map(|r| r.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 10);
        assert_eq!(reports.iter().filter(|r| r.window.is_some()).count(), 2);
    }

    #[test]
    fn test_only_runs_selected_reports() {
        let dir = tempfile::tempdir().unwrap();
        let reader = cpi_and_dept_reader();
        let exporter = Exporter::new(dir.path()).without_image();
        let options = RunOptions {
            only: vec!["sales_by_cpi".to_string()],
            ..Default::default()
        };

        let summary = run_reports(&reader, &exporter, &catalog(), &options).unwrap();
        assert_eq!(summary.completed, vec!["sales_by_cpi".to_string()]);
        assert_eq!(summary.exported.len(), 1);
        assert!(dir.path().join("weekly_sales_by_cpi.html").exists());
        assert_eq!(reader.calls().len(), 1);
    }

    #[test]
    fn test_unknown_report_name_is_config_error() {
        let reader = StubReader::new();
        let exporter = Exporter::new("/nonexistent").without_image();
        let options = RunOptions {
            only: vec!["nope".to_string()],
            ..Default::default()
        };
        let err = run_reports(&reader, &exporter, &catalog(), &options).unwrap_err();
        assert!(matches!(err, SalesvizError::ConfigError(_)));
        assert!(err.to_string().contains("sales_by_dept"));
        assert!(reader.calls().is_empty());
    }

    #[test]
    fn test_first_failure_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let reader = cpi_and_dept_reader();
        let exporter = Exporter::new(dir.path()).without_image();

        // The first report has no canned result and fails
        let err = run_reports(&reader, &exporter, &catalog(), &RunOptions::default()).unwrap_err();
        assert!(matches!(err, SalesvizError::QueryError(_)));
        assert_eq!(reader.calls().len(), 1);
    }

    #[test]
    fn test_keep_going_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let reader = cpi_and_dept_reader();
        let exporter = Exporter::new(dir.path()).without_image();
        let options = RunOptions {
            keep_going: true,
            ..Default::default()
        };

        let summary = run_reports(&reader, &exporter, &catalog(), &options).unwrap();
        assert!(!summary.is_success());
        assert_eq!(summary.failed.len(), 8);
        assert_eq!(
            summary.completed,
            vec!["sales_by_cpi".to_string(), "sales_by_dept".to_string()]
        );
        assert_eq!(summary.exported.len(), 2);
        assert_eq!(reader.calls().len(), 10);
    }

    #[test]
    fn test_window_override_changes_params_and_basename() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = StubReader::new();
        reader.respond(
            "d.is_holiday",
            df! {
                "store_id" => [1i64],
                "is_holiday" => [false],
                "store_weekly_sales" => [10.0f64],
            }
            .unwrap(),
        );
        let exporter = Exporter::new(dir.path()).without_image();
        let options = RunOptions {
            only: vec!["weekly_sales_by_store_and_holiday".to_string()],
            window: Some(DateWindow::years(2010, 2011).unwrap()),
            keep_going: false,
        };

        run_reports(&reader, &exporter, &catalog(), &options).unwrap();
        assert!(dir
            .path()
            .join("weekly_sales_by_store_and_holiday_2010_2011.html")
            .exists());
        let calls = reader.calls();
        assert_eq!(
            calls[0].1.get("end_date"),
            Some(&ParamValue::Date(date(2011, 12, 31)))
        );
    }

    #[test]
    fn test_unwindowed_reports_bind_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let reader = cpi_and_dept_reader();
        let exporter = Exporter::new(dir.path()).without_image();
        let options = RunOptions {
            only: vec!["sales_by_dept".to_string()],
            window: Some(DateWindow::years(2010, 2010).unwrap()),
            keep_going: false,
        };
        run_reports(&reader, &exporter, &catalog(), &options).unwrap();
        assert!(reader.calls()[0].1.is_empty());
        assert!(dir.path().join("weekly_sales_by_dept.html").exists());
    }

    /// Serves nothing and fails to log out
    struct FailingLogout {
        closed: bool,
    }

    impl Reader for FailingLogout {
        fn read_table(&self, sql: &str, _params: &Params) -> Result<DataFrame> {
            Err(SalesvizError::QueryError(format!("no table for {}", sql.trim())))
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Err(SalesvizError::ConnectionError("logout rejected".to_string()))
        }
    }

    #[test]
    fn test_report_error_wins_over_close_error() {
        let mut reader = FailingLogout { closed: false };
        let exporter = Exporter::new("/nonexistent").without_image();

        let err = run_and_close(&mut reader, &exporter, &catalog(), &RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, SalesvizError::QueryError(_)));
        assert!(reader.closed);
    }

    #[test]
    fn test_close_error_surfaces_after_successful_run() {
        let mut reader = FailingLogout { closed: false };
        let exporter = Exporter::new("/nonexistent").without_image();
        let err = run_and_close(&mut reader, &exporter, &[], &RunOptions::default()).unwrap_err();
        assert!(matches!(err, SalesvizError::ConnectionError(_)));
        assert!(reader.closed);
    }

    #[test]
    fn test_run_and_close_closes_reader() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = cpi_and_dept_reader();
        let exporter = Exporter::new(dir.path()).without_image();
        let options = RunOptions {
            only: vec!["sales_by_dept".to_string()],
            ..Default::default()
        };

        let summary = run_and_close(&mut reader, &exporter, &catalog(), &options).unwrap();
        assert!(summary.is_success());
        assert!(reader.is_closed());
    }
}
