//! Thumbnail rendering: first page of a PDF → PNG via pdfium.
//!
//! ## Why cap pixels, not DPI?
//!
//! EPS artwork ranges from stamp-sized logos to A0 posters. Capping the
//! longest edge keeps memory bounded regardless of physical size.

use crate::backend::pdfium::{bind_pdfium, open_document};
use crate::error::RasterError;
use crate::pipeline::encode::encode_png;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A rendered thumbnail: where it was written, and its PNG bytes.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub path: PathBuf,
    pub png: Vec<u8>,
}

/// Render page 1 of `pdf_path` to a PNG at `out_path`.
///
/// Runs inside `spawn_blocking` since pdfium is CPU-bound and not async-safe.
pub async fn render_thumbnail(
    pdf_path: &Path,
    out_path: &Path,
    max_pixels: u32,
    library: Option<&Path>,
) -> Result<Thumbnail, RasterError> {
    let pdf = pdf_path.to_path_buf();
    let out = out_path.to_path_buf();
    let lib = library.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || {
        render_thumbnail_blocking(&pdf, &out, max_pixels, lib.as_deref())
    })
    .await
    .map_err(|e| RasterError::RenderFailed {
        detail: format!("render task panicked: {}", e),
    })?
}

fn render_thumbnail_blocking(
    pdf_path: &Path,
    out_path: &Path,
    max_pixels: u32,
    library: Option<&Path>,
) -> Result<Thumbnail, RasterError> {
    let failed = |detail: String| RasterError::RenderFailed { detail };

    let pdfium = bind_pdfium(library).map_err(|e| failed(e.to_string()))?;
    let document = open_document(&pdfium, pdf_path, None).map_err(|e| failed(e.to_string()))?;
    let page = document
        .pages()
        .get(0)
        .map_err(|e| failed(format!("no first page: {:?}", e)))?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let image = page
        .render_with_config(&render_config)
        .map_err(|e| failed(format!("{:?}", e)))?
        .as_image();
    debug!(
        "Rendered thumbnail of {} → {}x{} px",
        pdf_path.display(),
        image.width(),
        image.height()
    );

    let png = encode_png(&image).map_err(|e| failed(e.to_string()))?;
    std::fs::write(out_path, &png).map_err(|e| RasterError::WriteFailed {
        path: out_path.to_path_buf(),
        detail: e.to_string(),
    })?;

    Ok(Thumbnail {
        path: out_path.to_path_buf(),
        png,
    })
}
