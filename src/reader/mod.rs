//! Warehouse client abstraction for salesviz
//!
//! The reader module provides a pluggable interface for executing
//! parameterized SQL against a data warehouse and returning Polars
//! DataFrames for reshaping and charting.
//!
//! # Architecture
//!
//! All readers implement the `Reader` trait, which provides:
//! - Parameterized SQL execution → DataFrame conversion
//! - Row-oriented results for callers that want plain mappings
//! - Explicit connection release
//!
//! Parameters are always passed as named placeholders (`:start_date`) and
//! bound by the reader; values are never spliced into the SQL text.
//!
//! # Example
//!
//! ```rust,ignore
//! use salesviz::reader::{Params, Reader, SnowflakeReader};
//!
//! let mut reader = SnowflakeReader::connect(&settings)?;
//! let params = Params::new().with("start_date", "2012-01-01");
//! let df = reader.read_table("SELECT * FROM t WHERE d >= :start_date", &params)?;
//! reader.close()?;
//! ```

use crate::table::{self, Row};
use crate::{DataFrame, Result};

pub mod params;
pub mod snowflake;

pub use params::{bind_named, BoundStatement, ParamValue, Params};
pub use snowflake::SnowflakeReader;

/// Trait for warehouse readers
///
/// Readers execute SQL statements and return Polars DataFrames. A reader
/// owns a single connection, used sequentially by the current thread.
pub trait Reader {
    /// Execute a parameterized SQL statement and return the result as a DataFrame
    ///
    /// # Arguments
    ///
    /// * `sql` - The SQL statement, with `:name` placeholders
    /// * `params` - Values for the placeholders
    ///
    /// # Errors
    ///
    /// Returns `SalesvizError::QueryError` if:
    /// - A placeholder has no value
    /// - The SQL is invalid or references missing tables/columns
    ///
    /// Returns `SalesvizError::ConnectionError` if the connection is closed or lost.
    fn read_table(&self, sql: &str, params: &Params) -> Result<DataFrame>;

    /// Execute a parameterized SQL statement and return each row as a mapping
    /// from column name to value.
    fn execute(&self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        let df = self.read_table(sql, params)?;
        table::dataframe_to_rows(&df)
    }

    /// Release the underlying connection
    ///
    /// Further queries fail with a connection error. Calling `close` again is a no-op.
    fn close(&mut self) -> Result<()>;
}

/// In-memory reader serving canned tables, for driver and pipeline tests
#[cfg(test)]
pub(crate) mod stub {
    use super::*;
    use crate::SalesvizError;
    use std::cell::RefCell;

    /// Answers each statement with the first registered table whose key
    /// occurs in the SQL text, and records every call.
    pub struct StubReader {
        responses: Vec<(String, DataFrame)>,
        calls: RefCell<Vec<(String, Params)>>,
        closed: bool,
    }

    impl StubReader {
        pub fn new() -> Self {
            Self {
                responses: Vec::new(),
                calls: RefCell::new(Vec::new()),
                closed: false,
            }
        }

        pub fn respond(&mut self, key: &str, df: DataFrame) {
            self.responses.push((key.to_string(), df));
        }

        pub fn calls(&self) -> Vec<(String, Params)> {
            self.calls.borrow().clone()
        }

        pub fn is_closed(&self) -> bool {
            self.closed
        }
    }

    impl Reader for StubReader {
        fn read_table(&self, sql: &str, params: &Params) -> Result<DataFrame> {
            if self.closed {
                return Err(SalesvizError::ConnectionError(
                    "Connection is closed".to_string(),
                ));
            }
            // Binding still has to succeed, exactly as against the warehouse
            bind_named(sql, params)?;
            self.calls
                .borrow_mut()
                .push((sql.to_string(), params.clone()));

            self.responses
                .iter()
                .find(|(key, _)| sql.contains(key.as_str()))
                .map(|(_, df)| df.clone())
                .ok_or_else(|| {
                    SalesvizError::QueryError(format!("No canned result for SQL: {}", sql))
                })
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }
}
