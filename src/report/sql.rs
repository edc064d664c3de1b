//! Warehouse queries behind the reports
//!
//! Tables are referenced unqualified and resolve against the session's
//! database and schema (`SF_DB`, `SF_SCHEMA`). Date windows are bound through
//! `:start_date` / `:end_date`.

/// Store, holiday flag and weekly sales inside a date window
pub const SALES_BY_STORE_AND_HOLIDAY: &str = "
SELECT
  f.store_id,
  d.is_holiday,
  f.store_weekly_sales
FROM WALMART_WEEKLY_REPORTS_FACT f
JOIN WALMART_DATE_DIM d
  ON d.date_id = f.date_id
WHERE d.report_date BETWEEN :start_date AND :end_date
";

/// Weekly sales and temperature inside a date window
pub const SALES_AND_TEMPERATURE: &str = "
SELECT
  d.report_date AS report_date,
  f.store_weekly_sales,
  f.store_temperature
FROM WALMART_WEEKLY_REPORTS_FACT f
JOIN WALMART_DATE_DIM d
  ON d.date_id = f.date_id
WHERE d.report_date BETWEEN :start_date AND :end_date
  AND f.store_weekly_sales IS NOT NULL
  AND f.store_temperature IS NOT NULL
";

/// Total sales per store size
pub const SALES_BY_STORE_SIZE: &str = "
SELECT
  SUM(f.store_weekly_sales) AS total_weekly_sales,
  s.store_size
FROM WALMART_WEEKLY_REPORTS_FACT f
JOIN WALMART_STORE_DIM s
  ON s.store_id = f.store_id
WHERE f.store_weekly_sales IS NOT NULL
  AND s.store_size IS NOT NULL
GROUP BY s.store_size
";

/// Total sales per store type and report date
pub const SALES_BY_STORE_TYPE_AND_DATE: &str = "
SELECT
  SUM(f.store_weekly_sales) AS total_weekly_sales,
  s.store_type,
  d.report_date
FROM WALMART_WEEKLY_REPORTS_FACT f
JOIN WALMART_STORE_DIM s
  ON s.store_id = f.store_id
JOIN WALMART_DATE_DIM d
  ON d.date_id = f.date_id
GROUP BY s.store_type, d.report_date
ORDER BY s.store_type, d.report_date
";

/// Markdown amounts per store, year and markdown type (wide columns unpivoted)
pub const MARKDOWN_BY_YEAR: &str = "
WITH src AS (
  SELECT
    YEAR(d.report_date) AS year,
    f.markdown1,
    f.markdown2,
    f.markdown3,
    f.markdown4,
    f.markdown5,
    f.store_id AS store_id
  FROM WALMART_WEEKLY_REPORTS_FACT f
  JOIN WALMART_DATE_DIM d
    ON f.date_id = d.date_id
)
SELECT
  year,
  markdown_type,
  SUM(markdown_sum) AS total_markdown_amount,
  store_id
FROM src
UNPIVOT (
  markdown_sum FOR markdown_type IN (markdown1, markdown2, markdown3, markdown4, markdown5)
)
GROUP BY store_id, markdown_type, year
ORDER BY store_id, year, markdown_type
";

/// Total sales per store, with the store's type
pub const SALES_BY_STORE_TYPE_AND_STORE: &str = "
SELECT
  s.store_type,
  s.store_id,
  SUM(f.store_weekly_sales) AS total_weekly_sales
FROM WALMART_WEEKLY_REPORTS_FACT f
JOIN WALMART_STORE_DIM s
  ON f.store_id = s.store_id
JOIN WALMART_DATE_DIM d
  ON d.date_id = f.date_id
WHERE f.store_weekly_sales IS NOT NULL
GROUP BY s.store_type, s.store_id
ORDER BY store_type, total_weekly_sales
";

/// Fuel price per report date
pub const FUEL_PRICE_BY_DATE: &str = "
SELECT
  d.report_date,
  f.fuel_price
FROM WALMART_WEEKLY_REPORTS_FACT f
JOIN WALMART_DATE_DIM d
  ON d.date_id = f.date_id
WHERE f.fuel_price IS NOT NULL
";

/// Weekly sales per report date
pub const SALES_BY_DATE: &str = "
SELECT
  d.report_date,
  f.store_weekly_sales
FROM WALMART_WEEKLY_REPORTS_FACT f
JOIN WALMART_DATE_DIM d
  ON d.date_id = f.date_id
WHERE f.store_weekly_sales IS NOT NULL
";

/// Weekly sales with the CPI of the week
pub const SALES_AND_CPI: &str = "
SELECT
  f.cpi,
  f.store_weekly_sales
FROM WALMART_WEEKLY_REPORTS_FACT f
WHERE f.store_weekly_sales IS NOT NULL
";

/// Total sales per department, largest first
pub const SALES_BY_DEPT: &str = "
SELECT
  s.dept_id,
  SUM(f.store_weekly_sales) AS total_weekly_sales
FROM WALMART_WEEKLY_REPORTS_FACT f
JOIN WALMART_STORE_DIM s
  ON s.dept_id = f.dept_id
WHERE f.store_weekly_sales IS NOT NULL
GROUP BY s.dept_id
ORDER BY total_weekly_sales DESC
";

/// Row count of the weekly fact table (connection check)
pub const FACT_ROW_COUNT: &str = "SELECT COUNT(*) AS row_count FROM WALMART_WEEKLY_REPORTS_FACT";
