//! Configuration types for page-geometry analysis.
//!
//! Everything the service used to keep in globals (output directories, the
//! margin constant, the A4 fallback) lives in [`AnalysisConfig`] and is passed
//! to each call. Built via [`AnalysisConfigBuilder`].

use crate::error::PageBoxError;
use crate::extract::pdf::PdfFallbackPolicy;
use crate::margin::DEFAULT_MARGIN_MM;
use crate::output::DocumentKind;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for analysing EPS and PDF documents.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use pagebox::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .margin_mm(3.0)
///     .default_a4(true)
///     .output_root("/tmp/pagebox")
///     .build()
///     .unwrap();
/// assert_eq!(config.margin_mm, 3.0);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Margin added to each side of an EPS bounding box, in mm. Default: 2.0.
    ///
    /// Zero disables injection entirely.
    pub margin_mm: f64,

    /// PDF fallback tiers and labels.
    pub pdf_policy: PdfFallbackPolicy,

    /// Which library reads PDF page boxes. Default: [`PdfBackend::Pdfium`].
    pub pdf_backend: PdfBackend,

    /// Explicit pdfium library file. If None, binds to `./` then the system library.
    pub pdfium_library: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Treat every input as this kind instead of detecting it.
    pub kind: Option<DocumentKind>,

    /// Where margined EPS files are written. Default: `modified`.
    pub modified_dir: PathBuf,

    /// Where converted PDFs are written. Default: `pdfs`.
    pub pdf_dir: PathBuf,

    /// Where PNG thumbnails are written. Default: `thumbnails`.
    pub thumbnail_dir: PathBuf,

    /// Run the rasterizer on margined EPS files. Default: true.
    pub rasterize: bool,

    /// Render a PNG thumbnail of the converted PDF. Default: true.
    pub thumbnail: bool,

    /// Embed the thumbnail in the report as base64. Default: false.
    pub inline_thumbnail: bool,

    /// Longest thumbnail edge in pixels. Default: 512.
    pub thumbnail_max_pixels: u32,

    /// Ghostscript executable. Default: `gs`.
    pub ghostscript: String,

    /// qpdf executable, used when `pdf_backend` is [`PdfBackend::Qpdf`]. Default: `qpdf`.
    pub qpdf: String,

    /// Timeout for each external tool run, in seconds. Default: 60.
    pub tool_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Documents analysed at once by [`crate::analyze::analyze_many`]. Default: 4.
    pub concurrency: usize,

    /// Optional progress callback for batch analysis.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            margin_mm: DEFAULT_MARGIN_MM,
            pdf_policy: PdfFallbackPolicy::default(),
            pdf_backend: PdfBackend::default(),
            pdfium_library: None,
            password: None,
            kind: None,
            modified_dir: PathBuf::from("modified"),
            pdf_dir: PathBuf::from("pdfs"),
            thumbnail_dir: PathBuf::from("thumbnails"),
            rasterize: true,
            thumbnail: true,
            inline_thumbnail: false,
            thumbnail_max_pixels: 512,
            ghostscript: "gs".to_string(),
            qpdf: "qpdf".to_string(),
            tool_timeout_secs: 60,
            download_timeout_secs: 120,
            concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("margin_mm", &self.margin_mm)
            .field("pdf_policy", &self.pdf_policy)
            .field("pdf_backend", &self.pdf_backend)
            .field("pdfium_library", &self.pdfium_library)
            .field("kind", &self.kind)
            .field("modified_dir", &self.modified_dir)
            .field("pdf_dir", &self.pdf_dir)
            .field("thumbnail_dir", &self.thumbnail_dir)
            .field("rasterize", &self.rasterize)
            .field("thumbnail", &self.thumbnail)
            .field("ghostscript", &self.ghostscript)
            .field("qpdf", &self.qpdf)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AnalysisProgressCallback>"),
            )
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether margin injection is enabled.
    pub fn margin_enabled(&self) -> bool {
        self.margin_mm > 0.0
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn margin_mm(mut self, mm: f64) -> Self {
        self.config.margin_mm = mm;
        self
    }

    pub fn pdf_policy(mut self, policy: PdfFallbackPolicy) -> Self {
        self.config.pdf_policy = policy;
        self
    }

    pub fn use_page_size(mut self, v: bool) -> Self {
        self.config.pdf_policy.use_page_size = v;
        self
    }

    pub fn default_a4(mut self, v: bool) -> Self {
        self.config.pdf_policy.default_a4 = v;
        self
    }

    pub fn distinct_labels(mut self, v: bool) -> Self {
        self.config.pdf_policy.distinct_labels = v;
        self
    }

    pub fn pdf_backend(mut self, backend: PdfBackend) -> Self {
        self.config.pdf_backend = backend;
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn kind(mut self, kind: DocumentKind) -> Self {
        self.config.kind = Some(kind);
        self
    }

    /// Put `modified/`, `pdfs/` and `thumbnails/` under one directory.
    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.config.modified_dir = root.join("modified");
        self.config.pdf_dir = root.join("pdfs");
        self.config.thumbnail_dir = root.join("thumbnails");
        self
    }

    pub fn modified_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.modified_dir = dir.into();
        self
    }

    pub fn pdf_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdf_dir = dir.into();
        self
    }

    pub fn thumbnail_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.thumbnail_dir = dir.into();
        self
    }

    pub fn rasterize(mut self, v: bool) -> Self {
        self.config.rasterize = v;
        self
    }

    pub fn thumbnail(mut self, v: bool) -> Self {
        self.config.thumbnail = v;
        self
    }

    pub fn inline_thumbnail(mut self, v: bool) -> Self {
        self.config.inline_thumbnail = v;
        self
    }

    pub fn thumbnail_max_pixels(mut self, px: u32) -> Self {
        self.config.thumbnail_max_pixels = px;
        self
    }

    pub fn ghostscript(mut self, bin: impl Into<String>) -> Self {
        self.config.ghostscript = bin.into();
        self
    }

    pub fn qpdf(mut self, bin: impl Into<String>) -> Self {
        self.config.qpdf = bin.into();
        self
    }

    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tool_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, PageBoxError> {
        let c = &self.config;
        if !c.margin_mm.is_finite() || !(0.0..=50.0).contains(&c.margin_mm) {
            return Err(PageBoxError::InvalidConfig(format!(
                "margin must be 0–50 mm, got {}",
                c.margin_mm
            )));
        }
        if c.thumbnail_max_pixels < 16 {
            return Err(PageBoxError::InvalidConfig(format!(
                "thumbnail size must be ≥ 16 px, got {}",
                c.thumbnail_max_pixels
            )));
        }
        if c.tool_timeout_secs == 0 || c.download_timeout_secs == 0 {
            return Err(PageBoxError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.ghostscript.trim().is_empty() || c.qpdf.trim().is_empty() {
            return Err(PageBoxError::InvalidConfig(
                "tool names must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Library used to read PDF page boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PdfBackend {
    /// pdfium via `pdfium-render`; also reports the intrinsic page size. (default)
    #[default]
    Pdfium,
    /// `qpdf --json`; reads boxes from the page dictionaries, no page size.
    Qpdf,
}
