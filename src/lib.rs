//! # pagebox
//!
//! Read the physical page size of EPS and PDF files, and add a print margin
//! to an EPS bounding box.
//!
//! ## Why this crate?
//!
//! Print workflows need to know how big a piece of artwork is before it is
//! placed, and EPS artwork is usually cropped flush to its ink. This crate
//! reads the size each format declares (the EPS `%%BoundingBox`, the PDF
//! TrimBox or MediaBox) in millimetres, and can rewrite an EPS so its
//! bounding box carries a fixed margin on every side without touching the
//! drawing itself.
//!
//! ## Pipeline Overview
//!
//! ```text
//! EPS / PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL, detect kind
//!  ├─ 2. Extract   %%BoundingBox, or TrimBox → MediaBox → page size → A4
//!  ├─ 3. Margin    rewrite %%BoundingBox grown by 2 mm per side (EPS)
//!  ├─ 4. Convert   margined EPS → PDF via Ghostscript (optional)
//!  ├─ 5. Thumbnail PDF page 1 → PNG via pdfium (optional)
//!  └─ 6. Report    dimensions, provenance, artifact paths
//! ```
//!
//! Steps 2 and 3 are pure and available on their own through
//! [`analyze_eps_bytes`] and [`analyze_pdf_provider`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagebox::{analyze, AnalysisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalysisConfig::builder().output_root("out").build()?;
//!     let report = analyze("logo.eps", &config).await?;
//!     println!(
//!         "{} x {} mm ({})",
//!         report.dimensions.width_mm, report.dimensions.height_mm, report.source
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagebox` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pagebox = { version = "0.1", default-features = false }
//! ```
//!
//! ## External tools
//!
//! | Tool | Needed for |
//! |------|-----------|
//! | libpdfium | PDF analysis with [`PdfBackend::Pdfium`], thumbnails |
//! | `qpdf` | PDF analysis with [`PdfBackend::Qpdf`] |
//! | `gs` | EPS → PDF conversion |
//!
//! EPS analysis and margin injection need none of them.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod backend;
pub mod config;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod margin;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{
    analyze, analyze_eps_bytes, analyze_many, analyze_many_with, analyze_pdf_provider,
    analyze_sync, analyze_with,
};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, PdfBackend};
pub use error::{GeometryError, PageBoxError, RasterError};
pub use extract::pdf::{PageBoxProvider, PageGeometry, PdfFallbackPolicy};
pub use geometry::{BoundingBox, Dimensions, Extraction, GeometrySource};
pub use margin::{inject_margin, MarginedDocument};
pub use output::{AnalysisReport, DocumentKind, EpsAnalysis};
pub use pipeline::rasterize::{GhostscriptRasterizer, Rasterizer};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
