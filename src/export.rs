//! Chart export to the output directory
//!
//! Every chart becomes `<basename>.html` (always) and `<basename>.png`
//! (best effort). A failing or missing image renderer is logged and leaves
//! the HTML export successful.

use crate::chart::Chart;
use crate::naming;
use crate::writer::{HtmlWriter, ImageRenderer, VegaLiteWriter, VlConvertRenderer, Writer};
use crate::{Result, SalesvizError};
use std::path::{Path, PathBuf};

/// Files written for one chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedChart {
    pub html: PathBuf,
    /// Absent when the image could not be rendered
    pub image: Option<PathBuf>,
}

/// Writes charts into one output directory
pub struct Exporter {
    output_dir: PathBuf,
    vegalite: VegaLiteWriter,
    html: HtmlWriter,
    renderer: Option<Box<dyn ImageRenderer>>,
}

impl Exporter {
    /// Exporter using `vl-convert` from `PATH` for images, when installed.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let renderer = match VlConvertRenderer::from_path() {
            Ok(renderer) => Some(Box::new(renderer) as Box<dyn ImageRenderer>),
            Err(e) => {
                tracing::debug!("No image renderer: {}", e);
                None
            }
        };
        Self {
            output_dir: output_dir.into(),
            vegalite: VegaLiteWriter::new(),
            html: HtmlWriter::new(),
            renderer,
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn ImageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// HTML only
    pub fn without_image(mut self) -> Self {
        self.renderer = None;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Export `chart` as `<basename>.html` and, best effort, `<basename>.png`.
    ///
    /// # Errors
    ///
    /// Returns `SalesvizError::ExportError` if the output directory cannot be
    /// created or the HTML file cannot be written, and writer errors for
    /// charts that cannot be rendered. Image failures are not errors.
    pub fn export(&self, chart: &Chart, basename: &str) -> Result<ExportedChart> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            SalesvizError::ExportError(format!(
                "Failed to create output directory {}: {}",
                self.output_dir.display(),
                e
            ))
        })?;

        let spec_json = self.vegalite.write(chart)?;
        let html_path = self
            .output_dir
            .join(naming::artifact_file(basename, naming::HTML_EXTENSION));
        tracing::info!("Saving {}", html_path.display());
        std::fs::write(&html_path, self.html.page(chart.title(), &spec_json)).map_err(|e| {
            SalesvizError::ExportError(format!("Failed to write {}: {}", html_path.display(), e))
        })?;

        let image = self.export_image(&spec_json, basename);
        Ok(ExportedChart {
            html: html_path,
            image,
        })
    }

    fn export_image(&self, spec_json: &str, basename: &str) -> Option<PathBuf> {
        let png_path = self
            .output_dir
            .join(naming::artifact_file(basename, naming::PNG_EXTENSION));
        let Some(renderer) = &self.renderer else {
            tracing::warn!(
                "Skipping {}: no image renderer available",
                png_path.display()
            );
            return None;
        };

        match renderer.render_png(spec_json, &png_path) {
            Ok(()) => {
                tracing::info!("Saved {}", png_path.display());
                Some(png_path)
            }
            Err(e) => {
                tracing::warn!("Error saving {}: {}", png_path.display(), e);
                if png_path.exists() {
                    if let Err(e) = std::fs::remove_file(&png_path) {
                        tracing::warn!("Failed to remove partial {}: {}", png_path.display(), e);
                    }
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart;
    use crate::writer::html::read_embedded_spec;
    use polars::prelude::*;

    /// Writes a stand-in PNG
    struct FakeRenderer;

    impl ImageRenderer for FakeRenderer {
        fn render_png(&self, _spec_json: &str, path: &Path) -> Result<()> {
            std::fs::write(path, b"\x89PNG").map_err(|e| SalesvizError::ExportError(e.to_string()))
        }
    }

    /// Leaves a partial file behind, then fails
    struct PartialRenderer;

    impl ImageRenderer for PartialRenderer {
        fn render_png(&self, _spec_json: &str, path: &Path) -> Result<()> {
            std::fs::write(path, b"\x89P").map_err(|e| SalesvizError::ExportError(e.to_string()))?;
            Err(SalesvizError::ExportError("renderer crashed".to_string()))
        }
    }

    fn cpi_chart() -> Chart {
        let df = df! {
            "cpi" => [211.1f64, 215.3],
            "total_weekly_sales" => [30.0f64, 30.0],
        }
        .unwrap();
        chart::sales_by_cpi(&df).unwrap()
    }

    #[test]
    fn test_export_creates_nested_directory_and_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("reports").join("2012");
        let exporter = Exporter::new(&output).with_renderer(Box::new(FakeRenderer));

        let exported = exporter.export(&cpi_chart(), "weekly_sales_by_cpi").unwrap();
        assert_eq!(exported.html, output.join("weekly_sales_by_cpi.html"));
        assert_eq!(exported.image, Some(output.join("weekly_sales_by_cpi.png")));
        assert!(exported.html.exists());
        assert!(output.join("weekly_sales_by_cpi.png").exists());
    }

    #[test]
    fn test_failing_renderer_keeps_html_and_removes_partial_png() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path()).with_renderer(Box::new(PartialRenderer));

        let exported = exporter.export(&cpi_chart(), "weekly_sales_by_cpi").unwrap();
        assert!(exported.image.is_none());
        assert!(!dir.path().join("weekly_sales_by_cpi.png").exists());

        let html = std::fs::read_to_string(&exported.html).unwrap();
        assert_eq!(read_embedded_spec(&html).unwrap()["title"], "Sales by CPI");
    }

    #[test]
    fn test_without_image_writes_html_only() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path()).without_image();
        let exported = exporter.export(&cpi_chart(), "cpi").unwrap();
        assert!(exported.html.exists());
        assert!(exported.image.is_none());
    }

    #[test]
    fn test_unwritable_output_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let exporter = Exporter::new(blocker.join("sub")).without_image();
        let err = exporter.export(&cpi_chart(), "cpi").unwrap_err();
        assert!(matches!(err, SalesvizError::ExportError(_)));
    }
}
