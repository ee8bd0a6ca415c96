//! pdfium-backed first-page geometry.
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and must not be driven from async tasks. Every entry point here is a
//! thin async wrapper that moves the work into `spawn_blocking`.

use crate::error::PageBoxError;
use crate::extract::pdf::{PageBoxProvider, PageGeometry};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bind to pdfium: an explicit library file, else `./`, else the system library.
pub fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, PageBoxError> {
    let bindings = match library {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| PageBoxError::PdfiumBindingFailed(e.to_string()))?;
    Ok(Pdfium::new(bindings))
}

/// Open a PDF, mapping pdfium's load errors onto [`PageBoxError`].
pub(crate) fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, PageBoxError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                PageBoxError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                PageBoxError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            PageBoxError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Unrotated `[0 0 w h]` box for a page whose displayed size is `size`.
fn inherited_media_box((width, height): (f64, f64), quarter_turn: bool) -> Vec<f64> {
    if quarter_turn {
        vec![0.0, 0.0, height, width]
    } else {
        vec![0.0, 0.0, width, height]
    }
}

fn rect_to_vec(rect: PdfRect) -> Vec<f64> {
    vec![
        rect.left().value as f64,
        rect.bottom().value as f64,
        rect.right().value as f64,
        rect.top().value as f64,
    ]
}

/// First page of an open pdfium document.
pub struct PdfiumFirstPage<'a> {
    page_count: usize,
    page: Option<PdfPage<'a>>,
}

impl<'a> PdfiumFirstPage<'a> {
    pub fn new(document: &PdfDocument<'a>) -> Self {
        let pages = document.pages();
        let page_count = pages.len() as usize;
        let page = if page_count > 0 { pages.get(0).ok() } else { None };
        Self { page_count, page }
    }
}

impl PageBoxProvider for PdfiumFirstPage<'_> {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn trim_box(&self) -> Option<Vec<f64>> {
        let page = self.page.as_ref()?;
        page.boundaries().trim().ok().map(|b| rect_to_vec(b.bounds))
    }

    /// pdfium only reads `/MediaBox` from the page's own dictionary. When it
    /// is missing there and the page has no CropBox either, the page size
    /// pdfium reports is the inherited MediaBox, so it is reported as one.
    fn media_box(&self) -> Option<Vec<f64>> {
        let page = self.page.as_ref()?;
        let boundaries = page.boundaries();
        if let Ok(b) = boundaries.media() {
            return Some(rect_to_vec(b.bounds));
        }
        if boundaries.crop().is_ok() {
            return None;
        }
        let size = self.intrinsic_size()?;
        let quarter_turn = matches!(
            page.rotation(),
            Ok(PdfPageRenderRotation::Degrees90 | PdfPageRenderRotation::Degrees270)
        );
        debug!("MediaBox not on page dictionary, using inherited page size");
        Some(inherited_media_box(size, quarter_turn))
    }

    fn intrinsic_size(&self) -> Option<(f64, f64)> {
        let page = self.page.as_ref()?;
        Some((page.width().value as f64, page.height().value as f64))
    }
}

impl PdfiumFirstPage<'_> {
    /// Copy the first page's geometry out of pdfium.
    fn snapshot(&self) -> PageGeometry {
        PageGeometry {
            page_count: self.page_count(),
            trim_box: self.trim_box(),
            media_box: self.media_box(),
            intrinsic_size: self.intrinsic_size(),
        }
    }
}

/// Read first-page TrimBox, MediaBox and page size of the PDF at `pdf_path`.
///
/// The pdfium handles do not outlive the blocking task, so the result is a
/// plain [`PageGeometry`] snapshot.
pub async fn load_first_page(
    pdf_path: &Path,
    password: Option<&str>,
    library: Option<&Path>,
) -> Result<PageGeometry, PageBoxError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());
    let lib: Option<PathBuf> = library.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || {
        load_first_page_blocking(&path, pwd.as_deref(), lib.as_deref())
    })
    .await
    .map_err(|e| PageBoxError::Internal(format!("pdfium task panicked: {}", e)))?
}

/// Blocking implementation of [`load_first_page`].
fn load_first_page_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    library: Option<&Path>,
) -> Result<PageGeometry, PageBoxError> {
    let pdfium = bind_pdfium(library)?;
    let document = open_document(&pdfium, pdf_path, password)?;
    let first = PdfiumFirstPage::new(&document);
    info!("PDF loaded: {} pages", first.page_count());

    let geometry = first.snapshot();
    debug!(
        "{}: TrimBox {:?}, MediaBox {:?}, size {:?}",
        pdf_path.display(),
        geometry.trim_box,
        geometry.media_box,
        geometry.intrinsic_size
    );
    Ok(geometry)
}
