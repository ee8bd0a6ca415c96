//! EPS → PDF conversion and PDF thumbnails.
//!
//! [`Rasterizer`] is the seam between analysis and the external tools.
//! [`GhostscriptRasterizer`] shells out to `gs` for the conversion and uses
//! pdfium for the thumbnail. Tests substitute their own implementation.

use crate::config::AnalysisConfig;
use crate::error::RasterError;
use crate::pipeline::render::{render_thumbnail, Thumbnail};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, info};

/// Longest stderr excerpt kept in a [`RasterError::ToolFailed`].
const STDERR_TAIL: usize = 512;

/// Produces the PDF and thumbnail for a margined EPS.
pub trait Rasterizer: Send + Sync {
    /// Convert `eps_path` to a PDF at `out_path`.
    fn eps_to_pdf(
        &self,
        eps_path: &Path,
        out_path: &Path,
    ) -> impl Future<Output = Result<PathBuf, RasterError>> + Send;

    /// Render page 1 of `pdf_path` to a PNG at `out_path`, longest edge at
    /// most `max_pixels`.
    fn thumbnail(
        &self,
        pdf_path: &Path,
        out_path: &Path,
        max_pixels: u32,
    ) -> impl Future<Output = Result<Thumbnail, RasterError>> + Send;
}

/// Ghostscript for conversion, pdfium for thumbnails.
#[derive(Debug, Clone)]
pub struct GhostscriptRasterizer {
    /// Ghostscript executable.
    pub binary: String,
    /// Per-run timeout in seconds.
    pub timeout_secs: u64,
    /// pdfium library used for thumbnails.
    pub pdfium_library: Option<PathBuf>,
}

impl GhostscriptRasterizer {
    pub fn new(binary: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            binary: binary.into(),
            timeout_secs,
            pdfium_library: None,
        }
    }

    /// The tool, timeout and pdfium library named in `config`.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.ghostscript.clone(), config.tool_timeout_secs)
            .with_pdfium_library(config.pdfium_library.clone())
    }

    pub fn with_pdfium_library(mut self, library: Option<PathBuf>) -> Self {
        self.pdfium_library = library;
        self
    }

    /// Ghostscript arguments for a cropped, single-file PDF conversion.
    fn args(eps_path: &Path, out_path: &Path) -> Vec<String> {
        vec![
            "-dNOPAUSE".into(),
            "-dBATCH".into(),
            "-dSAFER".into(),
            "-dEPSCrop".into(),
            "-sDEVICE=pdfwrite".into(),
            format!("-sOutputFile={}", out_path.display()),
            eps_path.display().to_string(),
        ]
    }
}

impl Rasterizer for GhostscriptRasterizer {
    async fn eps_to_pdf(&self, eps_path: &Path, out_path: &Path) -> Result<PathBuf, RasterError> {
        let args = Self::args(eps_path, out_path);
        debug!("{} {}", self.binary, args.join(" "));

        let run = tokio::process::Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(Duration::from_secs(self.timeout_secs), run)
            .await
            .map_err(|_| RasterError::Timeout {
                tool: self.binary.clone(),
                secs: self.timeout_secs,
            })?
            .map_err(|e| RasterError::ToolMissing {
                tool: self.binary.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(RasterError::ToolFailed {
                tool: self.binary.clone(),
                status: output.status.code().unwrap_or(-1),
                stderr: stderr_tail(&output.stderr),
            });
        }
        if !out_path.is_file() {
            return Err(RasterError::WriteFailed {
                path: out_path.to_path_buf(),
                detail: format!("{} reported success but wrote nothing", self.binary),
            });
        }

        info!("Converted {} → {}", eps_path.display(), out_path.display());
        Ok(out_path.to_path_buf())
    }

    async fn thumbnail(
        &self,
        pdf_path: &Path,
        out_path: &Path,
        max_pixels: u32,
    ) -> Result<Thumbnail, RasterError> {
        render_thumbnail(pdf_path, out_path, max_pixels, self.pdfium_library.as_deref()).await
    }
}

/// Last [`STDERR_TAIL`] bytes of stderr, trimmed, on a char boundary.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let mut start = text.len().saturating_sub(STDERR_TAIL);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
