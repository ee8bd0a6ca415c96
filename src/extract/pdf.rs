//! PDF geometry: pick the most authoritative box on the first page.
//!
//! ## Fallback chain
//!
//! ```text
//! TrimBox ──▶ MediaBox ──▶ page size ──▶ A4 default
//!  (final)    (medium)     (renderer)    (policy, off by default)
//! ```
//!
//! Production PDFs are frequently missing TrimBox; MediaBox is near-universal.
//! Falling back keeps most inputs answerable, at the cost of precision, so
//! every result records which tier won in [`GeometrySource`].
//!
//! A box that is present but malformed stops the chain with
//! [`GeometryError::MalformedBox`] instead of silently falling through: a
//! broken TrimBox means the producer intended a trim size we cannot read.

use crate::error::GeometryError;
use crate::geometry::{BoundingBox, Extraction, GeometrySource, A4_POINTS};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// First-page geometry as exposed by a PDF library.
///
/// Implemented once per backend (pdfium, qpdf JSON); the fallback logic in
/// [`resolve_geometry`] is shared by all of them. Box accessors return the
/// raw numeric array so that malformed boxes can be reported rather than
/// hidden by the backend.
pub trait PageBoxProvider {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// First-page `/TrimBox`, if present.
    fn trim_box(&self) -> Option<Vec<f64>>;

    /// First-page `/MediaBox`, if present.
    fn media_box(&self) -> Option<Vec<f64>>;

    /// First-page width and height in points as reported by the page object.
    fn intrinsic_size(&self) -> Option<(f64, f64)>;
}

/// Plain-data first-page geometry.
///
/// Backends that decode everything up front (qpdf) produce this directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub page_count: usize,
    pub trim_box: Option<Vec<f64>>,
    pub media_box: Option<Vec<f64>>,
    pub intrinsic_size: Option<(f64, f64)>,
}

impl PageBoxProvider for PageGeometry {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn trim_box(&self) -> Option<Vec<f64>> {
        self.trim_box.clone()
    }

    fn media_box(&self) -> Option<Vec<f64>> {
        self.media_box.clone()
    }

    fn intrinsic_size(&self) -> Option<(f64, f64)> {
        self.intrinsic_size
    }
}

/// Which fallback tiers are enabled and how they are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfFallbackPolicy {
    /// Use the page's own width/height when neither box is readable. Default: true.
    pub use_page_size: bool,

    /// Answer ISO A4 when the page carries no geometry at all. Default: false.
    pub default_a4: bool,

    /// Report the page-size and A4 tiers as `PageSize` / `Default`.
    /// When false both are reported as `MediaBox`. Default: true.
    pub distinct_labels: bool,
}

impl Default for PdfFallbackPolicy {
    fn default() -> Self {
        Self {
            use_page_size: true,
            default_a4: false,
            distinct_labels: true,
        }
    }
}

impl PdfFallbackPolicy {
    fn label(&self, source: GeometrySource) -> GeometrySource {
        match source {
            GeometrySource::PageSize | GeometrySource::Default if !self.distinct_labels => {
                GeometrySource::MediaBox
            }
            other => other,
        }
    }
}

/// Validate a raw box array: exactly four finite numbers.
///
/// Corners may come in either order, as PDF allows.
pub fn parse_box(which: &'static str, raw: &[f64]) -> Result<BoundingBox, GeometryError> {
    match raw {
        [x1, y1, x2, y2] if raw.iter().all(|v| v.is_finite()) => {
            Ok(BoundingBox::normalized(*x1, *y1, *x2, *y2))
        }
        [_, _, _, _] => Err(GeometryError::MalformedBox {
            which,
            detail: format!("non-finite value in {raw:?}"),
        }),
        _ => Err(GeometryError::MalformedBox {
            which,
            detail: format!("expected 4 numbers, got {}", raw.len()),
        }),
    }
}

/// Determine first-page dimensions using the fallback chain.
///
/// # Errors
/// - [`GeometryError::NoPageFound`] for a zero-page document
/// - [`GeometryError::MalformedBox`] when a present box is not 4 finite numbers
/// - [`GeometryError::GeometryNotFound`] when no tier applies
pub fn resolve_geometry<P: PageBoxProvider + ?Sized>(
    page: &P,
    policy: &PdfFallbackPolicy,
) -> Result<Extraction, GeometryError> {
    if page.page_count() == 0 {
        return Err(GeometryError::NoPageFound);
    }

    if let Some(raw) = page.trim_box() {
        let b = parse_box("TrimBox", &raw)?;
        debug!("Using TrimBox {}", b);
        return Ok(Extraction::from_box(b, GeometrySource::TrimBox));
    }

    if let Some(raw) = page.media_box() {
        let b = parse_box("MediaBox", &raw)?;
        debug!("TrimBox absent, using MediaBox {}", b);
        return Ok(Extraction::from_box(b, GeometrySource::MediaBox));
    }

    if policy.use_page_size {
        if let Some((w, h)) = page.intrinsic_size() {
            let b = parse_box("page size", &[0.0, 0.0, w, h])?;
            debug!("No page boxes, using page size {}x{}pt", w, h);
            return Ok(Extraction::from_box(
                b,
                policy.label(GeometrySource::PageSize),
            ));
        }
    }

    if policy.default_a4 {
        debug!("No page geometry, falling back to A4");
        return Ok(Extraction::from_box(
            A4_POINTS,
            policy.label(GeometrySource::Default),
        ));
    }

    Err(GeometryError::GeometryNotFound(
        "first page has no TrimBox, MediaBox or page size".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageGeometry {
        PageGeometry {
            page_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn trim_box_wins_over_media_box() {
        let p = PageGeometry {
            trim_box: Some(vec![0.0, 0.0, 100.0, 200.0]),
            media_box: Some(vec![0.0, 0.0, 110.0, 210.0]),
            ..page()
        };
        let e = resolve_geometry(&p, &PdfFallbackPolicy::default()).unwrap();
        assert_eq!(e.source, GeometrySource::TrimBox);
        assert_eq!(e.dimensions.width_mm, 35.28);
        assert_eq!(e.dimensions.height_mm, 70.56);
    }

    #[test]
    fn media_box_only() {
        let p = PageGeometry {
            media_box: Some(vec![0.0, 0.0, 595.0, 842.0]),
            ..page()
        };
        let e = resolve_geometry(&p, &PdfFallbackPolicy::default()).unwrap();
        assert_eq!(e.source, GeometrySource::MediaBox);
        assert_eq!(e.dimensions.width_mm, 209.9);
        assert_eq!(e.dimensions.height_mm, 297.04);
    }

    #[test]
    fn page_size_when_no_boxes() {
        let p = PageGeometry {
            intrinsic_size: Some((612.0, 792.0)),
            ..page()
        };
        let e = resolve_geometry(&p, &PdfFallbackPolicy::default()).unwrap();
        assert_eq!(e.source, GeometrySource::PageSize);
        assert_eq!(e.dimensions.width_mm, 215.9);
        assert_eq!(e.dimensions.height_mm, 279.4);
    }

    #[test]
    fn page_size_labelled_as_media_box_when_collapsed() {
        let p = PageGeometry {
            intrinsic_size: Some((612.0, 792.0)),
            ..page()
        };
        let policy = PdfFallbackPolicy {
            distinct_labels: false,
            ..Default::default()
        };
        let e = resolve_geometry(&p, &policy).unwrap();
        assert_eq!(e.source, GeometrySource::MediaBox);
    }

    #[test]
    fn page_size_tier_can_be_disabled() {
        let p = PageGeometry {
            intrinsic_size: Some((612.0, 792.0)),
            ..page()
        };
        let policy = PdfFallbackPolicy {
            use_page_size: false,
            ..Default::default()
        };
        let err = resolve_geometry(&p, &policy).unwrap_err();
        assert!(matches!(err, GeometryError::GeometryNotFound(_)));
    }

    #[test]
    fn a4_default_when_enabled() {
        let policy = PdfFallbackPolicy {
            default_a4: true,
            ..Default::default()
        };
        let e = resolve_geometry(&page(), &policy).unwrap();
        assert_eq!(e.source, GeometrySource::Default);
        assert_eq!(e.dimensions.width_mm, 209.9);
        assert_eq!(e.dimensions.height_mm, 297.04);
    }

    #[test]
    fn a4_default_collapsed_label() {
        let policy = PdfFallbackPolicy {
            default_a4: true,
            distinct_labels: false,
            ..Default::default()
        };
        let e = resolve_geometry(&page(), &policy).unwrap();
        assert_eq!(e.source, GeometrySource::MediaBox);
    }

    #[test]
    fn nothing_and_no_default_is_not_found() {
        let err = resolve_geometry(&page(), &PdfFallbackPolicy::default()).unwrap_err();
        assert!(matches!(err, GeometryError::GeometryNotFound(_)));
    }

    #[test]
    fn zero_pages_is_no_page_found_even_with_default() {
        let policy = PdfFallbackPolicy {
            default_a4: true,
            ..Default::default()
        };
        let err = resolve_geometry(&PageGeometry::default(), &policy).unwrap_err();
        assert_eq!(err, GeometryError::NoPageFound);
    }

    #[test]
    fn short_trim_box_is_malformed_not_skipped() {
        let p = PageGeometry {
            trim_box: Some(vec![0.0, 0.0, 100.0]),
            media_box: Some(vec![0.0, 0.0, 595.0, 842.0]),
            ..page()
        };
        let err = resolve_geometry(&p, &PdfFallbackPolicy::default()).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::MalformedBox { which: "TrimBox", .. }
        ));
    }

    #[test]
    fn infinite_media_box_is_malformed() {
        let p = PageGeometry {
            media_box: Some(vec![0.0, 0.0, f64::INFINITY, 842.0]),
            ..page()
        };
        let err = resolve_geometry(&p, &PdfFallbackPolicy::default()).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::MalformedBox { which: "MediaBox", .. }
        ));
    }

    #[test]
    fn inverted_pdf_box_is_normalized() {
        let p = PageGeometry {
            media_box: Some(vec![595.0, 842.0, 0.0, 0.0]),
            ..page()
        };
        let e = resolve_geometry(&p, &PdfFallbackPolicy::default()).unwrap();
        assert_eq!(e.raw_box, A4_POINTS);
    }

    #[test]
    fn offset_media_box_measures_extent() {
        let p = PageGeometry {
            media_box: Some(vec![-10.0, -10.0, 62.0, 62.0]),
            ..page()
        };
        let e = resolve_geometry(&p, &PdfFallbackPolicy::default()).unwrap();
        assert_eq!(e.dimensions.width_mm, 25.4);
    }
}
