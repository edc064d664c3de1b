//! PNG rendering through the external `vl-convert` tool

use crate::writer::ImageRenderer;
use crate::{Result, SalesvizError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

const VL_CONVERT_BIN: &str = "vl-convert";
const DEFAULT_SCALE: f64 = 2.0;

/// Renders PNGs with `vl-convert vl2png`
#[derive(Debug, Clone)]
pub struct VlConvertRenderer {
    program: PathBuf,
    scale: f64,
}

impl VlConvertRenderer {
    /// Locate `vl-convert` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns `SalesvizError::ExportError` when the tool is not installed.
    pub fn from_path() -> Result<Self> {
        which::which(VL_CONVERT_BIN)
            .map(Self::with_program)
            .map_err(|e| {
                SalesvizError::ExportError(format!(
                    "'{}' not found on PATH: {}",
                    VL_CONVERT_BIN, e
                ))
            })
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            scale: DEFAULT_SCALE,
        }
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

impl ImageRenderer for VlConvertRenderer {
    fn render_png(&self, spec_json: &str, path: &Path) -> Result<()> {
        let mut input = tempfile::Builder::new()
            .prefix("salesviz-")
            .suffix(".vl.json")
            .tempfile()
            .map_err(|e| SalesvizError::ExportError(format!("Failed to create temp file: {}", e)))?;
        input
            .write_all(spec_json.as_bytes())
            .and_then(|_| input.flush())
            .map_err(|e| SalesvizError::ExportError(format!("Failed to write temp file: {}", e)))?;

        let output = Command::new(&self.program)
            .arg("vl2png")
            .arg("--input")
            .arg(input.path())
            .arg("--output")
            .arg(path)
            .arg("--scale")
            .arg(self.scale.to_string())
            .output()
            .map_err(|e| {
                SalesvizError::ExportError(format!(
                    "Failed to run {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(SalesvizError::ExportError(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if !path.exists() {
            return Err(SalesvizError::ExportError(format!(
                "{} reported success but wrote no image",
                self.program.display()
            )));
        }
        Ok(())
    }
}
