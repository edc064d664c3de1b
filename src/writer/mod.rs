//! Output writer abstraction layer for salesviz
//!
//! The writer module provides a pluggable interface for generating chart
//! documents from a bound [`Chart`] (spec + data).
//!
//! # Architecture
//!
//! All writers implement the `Writer` trait, which provides:
//! - Chart → Output conversion
//! - Validation for writer compatibility
//!
//! Static images come from an [`ImageRenderer`], which turns a finished
//! Vega-Lite document into a PNG file.
//!
//! # Example
//!
//! ```rust,ignore
//! use salesviz::writer::{HtmlWriter, Writer};
//!
//! let html = HtmlWriter::new().write(&chart)?;
//! std::fs::write("chart.html", html)?;
//! ```

use crate::chart::Chart;
use crate::Result;
use std::path::Path;

pub mod html;
pub mod image;
pub mod vegalite;

pub use html::HtmlWriter;
pub use image::VlConvertRenderer;
pub use vegalite::VegaLiteWriter;

/// Trait for chart output writers
///
/// # Associated Types
///
/// * `Output` - The type returned by `write()`
pub trait Writer {
    /// The output type produced by this writer.
    type Output;

    /// Generate output for a chart
    ///
    /// # Errors
    ///
    /// Returns `SalesvizError::WriterError` if the chart is incompatible with
    /// this writer or serialization fails.
    fn write(&self, chart: &Chart) -> Result<Self::Output>;

    /// Validate that a chart can be rendered by this writer without
    /// generating output.
    fn validate(&self, chart: &Chart) -> Result<()>;
}

/// Renders a Vega-Lite document to a PNG file
pub trait ImageRenderer {
    /// Write `spec_json` rendered as PNG to `path`.
    ///
    /// On error the file at `path` may be missing or incomplete.
    fn render_png(&self, spec_json: &str, path: &Path) -> Result<()>;
}
