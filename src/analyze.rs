//! Analysis entry points.
//!
//! [`analyze_eps_bytes`] and [`analyze_pdf_provider`] are the pure core: no
//! file system, no subprocesses. [`analyze`] wraps them with input
//! resolution, margined-file output and rasterization, and
//! [`analyze_many`] runs that over a batch with bounded concurrency.
//!
//! Only geometry is fatal. A missing Ghostscript or an unrenderable PDF is
//! recorded in [`AnalysisReport::raster_error`] and the report is still
//! returned.

use crate::backend::{pdfium, qpdf};
use crate::config::{AnalysisConfig, PdfBackend};
use crate::error::{GeometryError, PageBoxError, RasterError};
use crate::extract::eps;
use crate::extract::pdf::{resolve_geometry, PageBoxProvider, PdfFallbackPolicy};
use crate::geometry::Extraction;
use crate::margin::inject_margin;
use crate::output::{AnalysisReport, DocumentKind, EpsAnalysis};
use crate::pipeline::encode::to_base64;
use crate::pipeline::input;
use crate::pipeline::rasterize::{GhostscriptRasterizer, Rasterizer};
use futures::stream::{self, StreamExt};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Give up looking for a free artifact name after this many suffixes.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Extract EPS dimensions and, when the margin is enabled, the margined copy.
///
/// A document without a `%%BoundingBox` fails here before injection is
/// attempted, so `margined` is only `None` when the margin is disabled.
pub fn analyze_eps_bytes(bytes: &[u8], config: &AnalysisConfig) -> Result<EpsAnalysis, GeometryError> {
    let extraction = eps::extract(bytes)?;
    let margined = if config.margin_enabled() {
        inject_margin(bytes, &extraction.raw_box, config.margin_mm)
    } else {
        None
    };
    Ok(EpsAnalysis {
        extraction,
        margined,
    })
}

/// Resolve first-page PDF dimensions from any page-box provider.
pub fn analyze_pdf_provider<P: PageBoxProvider + ?Sized>(
    provider: &P,
    policy: &PdfFallbackPolicy,
) -> Result<Extraction, GeometryError> {
    resolve_geometry(provider, policy)
}

/// Analyse one EPS or PDF file or URL.
///
/// For EPS with the margin enabled, the margined copy is written to
/// `config.modified_dir` and, when `config.rasterize` is set, converted to a
/// PDF and a thumbnail with Ghostscript and pdfium.
///
/// # Errors
/// Returns `Err(PageBoxError)` when the input cannot be read or its geometry
/// cannot be determined. Rasterization failures are not errors.
pub async fn analyze(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, PageBoxError> {
    let rasterizer = GhostscriptRasterizer::from_config(config);
    analyze_with(input_str, config, &rasterizer).await
}

/// [`analyze`] with a caller-supplied [`Rasterizer`].
pub async fn analyze_with<R: Rasterizer>(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
    rasterizer: &R,
) -> Result<AnalysisReport, PageBoxError> {
    let start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting analysis: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let path = resolved.path();

    // ── Step 2: Decide the kind ──────────────────────────────────────────
    let kind = match config.kind {
        Some(kind) => kind,
        None => DocumentKind::detect(&input::read_magic(path)?, path)?,
    };
    debug!("{} is {}", path.display(), kind);

    // ── Step 3: Extract, inject, rasterize ───────────────────────────────
    let mut report = match kind {
        DocumentKind::Eps => analyze_eps_file(path, config, rasterizer).await?,
        DocumentKind::Pdf => analyze_pdf_file(path, config).await?,
    };
    report.duration_ms = start.elapsed().as_millis() as u64;

    info!(
        "{}: {} {} x {} mm from {} ({}) in {}ms",
        input_str,
        report.kind,
        report.dimensions.width_mm,
        report.dimensions.height_mm,
        report.source,
        report.status_message(),
        report.duration_ms
    );
    Ok(report)
}

/// Analyse many inputs concurrently.
///
/// Results come back in input order. Progress callbacks fire as each input
/// finishes, which is completion order.
pub async fn analyze_many<S: AsRef<str>>(
    inputs: &[S],
    config: &AnalysisConfig,
) -> Vec<(String, Result<AnalysisReport, PageBoxError>)> {
    let rasterizer = GhostscriptRasterizer::from_config(config);
    analyze_many_with(inputs, config, &rasterizer).await
}

/// [`analyze_many`] with a caller-supplied [`Rasterizer`].
pub async fn analyze_many_with<S: AsRef<str>, R: Rasterizer>(
    inputs: &[S],
    config: &AnalysisConfig,
    rasterizer: &R,
) -> Vec<(String, Result<AnalysisReport, PageBoxError>)> {
    let total = inputs.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut results: Vec<(usize, String, Result<AnalysisReport, PageBoxError>)> =
        stream::iter(inputs.iter().enumerate().map(|(idx, input)| {
            let input = input.as_ref().to_string();
            async move {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_start(&input);
                }
                let result = analyze_with(&input, config, rasterizer).await;
                if let Some(ref cb) = config.progress_callback {
                    match &result {
                        Ok(report) => cb.on_file_complete(&input, report),
                        Err(e) => cb.on_file_error(&input, &e.to_string()),
                    }
                }
                (idx, input, result)
            }
        }))
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|(idx, _, _)| *idx);
    let success = results.iter().filter(|(_, _, r)| r.is_ok()).count();
    info!("Batch complete: {}/{} inputs analysed", success, total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, success);
    }

    results
        .into_iter()
        .map(|(_, input, result)| (input, result))
        .collect()
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, PageBoxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PageBoxError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(input_str, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn analyze_eps_file<R: Rasterizer>(
    path: &Path,
    config: &AnalysisConfig,
    rasterizer: &R,
) -> Result<AnalysisReport, PageBoxError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => PageBoxError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => PageBoxError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => PageBoxError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    })?;

    let analysis = analyze_eps_bytes(&bytes, config).map_err(|e| PageBoxError::geometry(path, e))?;
    let mut report = AnalysisReport::from_extraction(DocumentKind::Eps, &analysis.extraction);

    let Some(margined) = analysis.margined else {
        debug!("{}: margin disabled", path.display());
        return Ok(report);
    };

    let base = artifact_base(path);
    let modified_path = write_margined(&config.modified_dir, &base, margined.bytes).await?;
    info!("Wrote margined EPS: {}", modified_path.display());

    report.margin_applied = true;
    report.margined_box = Some(margined.bounding_box);
    report.modified_path = Some(modified_path.clone());

    if config.rasterize {
        if let Err(e) = rasterize_artifacts(rasterizer, &modified_path, &base, config, &mut report).await {
            warn!("Rasterization failed for {}: {}", path.display(), e);
            report.raster_error = Some(e);
        }
    }
    Ok(report)
}

async fn analyze_pdf_file(path: &Path, config: &AnalysisConfig) -> Result<AnalysisReport, PageBoxError> {
    let geometry = match config.pdf_backend {
        PdfBackend::Pdfium => {
            pdfium::load_first_page(
                path,
                config.password.as_deref(),
                config.pdfium_library.as_deref(),
            )
            .await?
        }
        PdfBackend::Qpdf => qpdf::run_qpdf(path, &config.qpdf, config.tool_timeout_secs).await?,
    };

    let extraction =
        analyze_pdf_provider(&geometry, &config.pdf_policy).map_err(|e| PageBoxError::geometry(path, e))?;
    Ok(AnalysisReport::from_extraction(DocumentKind::Pdf, &extraction))
}

/// Convert the margined EPS to PDF, then render its thumbnail.
async fn rasterize_artifacts<R: Rasterizer>(
    rasterizer: &R,
    eps_path: &Path,
    base: &str,
    config: &AnalysisConfig,
    report: &mut AnalysisReport,
) -> Result<(), RasterError> {
    let pdf_target = free_target(&config.pdf_dir, base, "pdf").await?;
    let pdf_path = rasterizer.eps_to_pdf(eps_path, &pdf_target).await?;
    report.pdf_path = Some(pdf_path.clone());

    if !config.thumbnail {
        return Ok(());
    }

    let png_target = free_target(&config.thumbnail_dir, base, "png").await?;
    let thumb = rasterizer
        .thumbnail(&pdf_path, &png_target, config.thumbnail_max_pixels)
        .await?;
    if config.inline_thumbnail {
        report.thumbnail_base64 = Some(to_base64(&thumb.png));
    }
    report.thumbnail_path = Some(thumb.path);
    Ok(())
}

/// `<unix-millis>_<stem>`, with the stem reduced to file-name-safe characters.
fn artifact_base(input: &Path) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let stem: String = input
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') { c } else { '_' })
        .collect();
    if stem.is_empty() {
        millis.to_string()
    } else {
        format!("{millis}_{stem}")
    }
}

fn candidate(dir: &Path, base: &str, ext: &str, attempt: u32) -> PathBuf {
    if attempt == 0 {
        dir.join(format!("{base}.{ext}"))
    } else {
        dir.join(format!("{base}-{attempt}.{ext}"))
    }
}

/// Create `dir` and pick a name in it that is not taken yet.
async fn free_target(dir: &Path, base: &str, ext: &str) -> Result<PathBuf, RasterError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| RasterError::WriteFailed {
            path: dir.to_path_buf(),
            detail: e.to_string(),
        })?;
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let target = candidate(dir, base, ext, attempt);
        if !tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Ok(target);
        }
    }
    Err(RasterError::WriteFailed {
        path: candidate(dir, base, ext, 0),
        detail: "no free file name".into(),
    })
}

/// Write `<base>_modified.eps` into `dir` atomically, never overwriting.
async fn write_margined(dir: &Path, base: &str, bytes: Vec<u8>) -> Result<PathBuf, PageBoxError> {
    let dir = dir.to_path_buf();
    let base = format!("{base}_modified");

    tokio::task::spawn_blocking(move || persist_new(&dir, &base, "eps", &bytes))
        .await
        .map_err(|e| PageBoxError::Internal(format!("write task panicked: {}", e)))?
}

/// Write to a temp file in `dir`, then link it under the first free name.
fn persist_new(dir: &Path, base: &str, ext: &str, bytes: &[u8]) -> Result<PathBuf, PageBoxError> {
    let write_failed = |path: PathBuf, source: std::io::Error| PageBoxError::OutputWriteFailed { path, source };

    std::fs::create_dir_all(dir).map_err(|e| write_failed(dir.to_path_buf(), e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| write_failed(dir.to_path_buf(), e))?;
    tmp.write_all(bytes)
        .map_err(|e| write_failed(tmp.path().to_path_buf(), e))?;

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let target = candidate(dir, base, ext, attempt);
        match tmp.persist_noclobber(&target) {
            Ok(_) => return Ok(target),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => tmp = e.file,
            Err(e) => return Err(write_failed(target, e.error)),
        }
    }
    Err(write_failed(
        candidate(dir, base, ext, 0),
        std::io::Error::new(std::io::ErrorKind::AlreadyExists, "no free file name"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::pdf::PageGeometry;
    use crate::geometry::GeometrySource;

    const EPS: &[u8] = b"%!PS-Adobe-3.0 EPSF-3.0\n%%BoundingBox: 0 0 100 100\n%%EndComments\n";

    #[test]
    fn eps_bytes_with_margin() {
        let a = analyze_eps_bytes(EPS, &AnalysisConfig::default()).unwrap();
        assert_eq!(a.extraction.source, GeometrySource::EpsBoundingBox);
        assert_eq!(a.extraction.dimensions.width_mm, 35.28);
        let m = a.margined.unwrap();
        assert_eq!((m.bounding_box.x1, m.bounding_box.x2), (-6.0, 106.0));
    }

    #[test]
    fn eps_bytes_without_margin() {
        let config = AnalysisConfig::builder().margin_mm(0.0).build().unwrap();
        let a = analyze_eps_bytes(EPS, &config).unwrap();
        assert!(a.margined.is_none());
    }

    #[test]
    fn eps_bytes_without_descriptor() {
        let err = analyze_eps_bytes(b"%!PS\nshowpage\n", &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, GeometryError::GeometryNotFound(_)));
    }

    #[test]
    fn eps_bytes_inverted_box() {
        let err = analyze_eps_bytes(b"%%BoundingBox: 50 50 10 10\n", &AnalysisConfig::default())
            .unwrap_err();
        assert!(matches!(err, GeometryError::InvalidGeometry { .. }));
    }

    #[test]
    fn pdf_provider_prefers_trim_box() {
        let g = PageGeometry {
            page_count: 1,
            trim_box: Some(vec![0.0, 0.0, 100.0, 200.0]),
            media_box: Some(vec![0.0, 0.0, 110.0, 210.0]),
            intrinsic_size: None,
        };
        let e = analyze_pdf_provider(&g, &PdfFallbackPolicy::default()).unwrap();
        assert_eq!(e.source, GeometrySource::TrimBox);
        assert_eq!(e.dimensions.height_mm, 70.56);
    }

    #[test]
    fn artifact_base_sanitises_stem() {
        let base = artifact_base(Path::new("/up/my logo (v2).eps"));
        let (millis, stem) = base.split_once('_').unwrap();
        assert!(millis.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(stem, "my_logo__v2_");
    }

    #[test]
    fn persist_new_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let first = persist_new(dir.path(), "1_a_modified", "eps", b"one").unwrap();
        let second = persist_new(dir.path(), "1_a_modified", "eps", b"two").unwrap();
        assert_eq!(first.file_name().unwrap(), "1_a_modified.eps");
        assert_eq!(second.file_name().unwrap(), "1_a_modified-1.eps");
        assert_eq!(std::fs::read(first).unwrap(), b"one");
        assert_eq!(std::fs::read(second).unwrap(), b"two");
    }

    #[tokio::test]
    async fn free_target_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("pdfs");
        let t = free_target(&nested, "1_a", "pdf").await.unwrap();
        assert!(nested.is_dir());
        assert_eq!(t, nested.join("1_a.pdf"));
    }
}
