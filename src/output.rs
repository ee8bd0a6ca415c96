//! Result types returned by the analysis entry points.
//!
//! [`AnalysisReport`] is what a response formatter serialises: dimensions,
//! provenance, whether a margin was applied, and where derived artifacts
//! were written. The library never builds an HTTP response itself.

use crate::error::RasterError;
use crate::geometry::{BoundingBox, Dimensions, Extraction, GeometrySource};
use crate::margin::MarginedDocument;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The two document kinds pagebox understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "EPS")]
    Eps,
    #[serde(rename = "PDF")]
    Pdf,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Eps => f.write_str("EPS"),
            DocumentKind::Pdf => f.write_str("PDF"),
        }
    }
}

/// Output of the pure EPS path: dimensions plus the optional margined copy.
#[derive(Debug, Clone, PartialEq)]
pub struct EpsAnalysis {
    pub extraction: Extraction,
    /// `None` when injection was disabled or skipped.
    pub margined: Option<MarginedDocument>,
}

/// Everything known about one analysed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub kind: DocumentKind,
    pub dimensions: Dimensions,
    pub source: GeometrySource,
    /// The box the dimensions were computed from, in points.
    pub raw_box: BoundingBox,
    /// True when a margined EPS was produced.
    pub margin_applied: bool,
    /// The enlarged box written into the margined EPS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margined_box: Option<BoundingBox>,
    /// Path of the margined EPS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_path: Option<PathBuf>,
    /// Path of the PDF converted from the margined EPS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<PathBuf>,
    /// Path of the PNG thumbnail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<PathBuf>,
    /// PNG thumbnail, base64, when inline thumbnails are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_base64: Option<String>,
    /// Why the PDF or thumbnail is missing, if it is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raster_error: Option<RasterError>,
    /// Wall-clock time spent on this document.
    #[serde(default)]
    pub duration_ms: u64,
}

impl AnalysisReport {
    /// A report with dimensions only; artifact fields are filled in later.
    pub fn new(kind: DocumentKind, raw_box: BoundingBox, source: GeometrySource) -> Self {
        Self::from_extraction(
            kind,
            &Extraction {
                dimensions: raw_box.dimensions(),
                source,
                raw_box,
            },
        )
    }

    pub fn from_extraction(kind: DocumentKind, extraction: &Extraction) -> Self {
        Self {
            kind,
            dimensions: extraction.dimensions,
            source: extraction.source,
            raw_box: extraction.raw_box,
            margin_applied: false,
            margined_box: None,
            modified_path: None,
            pdf_path: None,
            thumbnail_path: None,
            thumbnail_base64: None,
            raster_error: None,
            duration_ms: 0,
        }
    }

    /// One-line status suitable for a user-facing message.
    pub fn status_message(&self) -> &'static str {
        match (self.kind, self.margin_applied, self.raster_error.is_some()) {
            (DocumentKind::Pdf, _, _) => "analysed",
            (DocumentKind::Eps, false, _) => "processed without margin",
            (DocumentKind::Eps, true, true) => "processed with margin, conversion failed",
            (DocumentKind::Eps, true, false) => "processed with margin",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eps_report() -> AnalysisReport {
        let b = BoundingBox::new(0.0, 0.0, 595.0, 842.0).unwrap();
        AnalysisReport::new(DocumentKind::Eps, b, GeometrySource::EpsBoundingBox)
    }

    #[test]
    fn new_report_computes_dimensions() {
        let r = eps_report();
        assert_eq!(r.dimensions.width_mm, 209.9);
        assert!(!r.margin_applied);
        assert_eq!(r.status_message(), "processed without margin");
    }

    #[test]
    fn json_uses_source_and_kind_names() {
        let json = serde_json::to_value(eps_report()).unwrap();
        assert_eq!(json["kind"], "EPS");
        assert_eq!(json["source"], "EPSBoundingBox");
        assert_eq!(json["dimensions"]["height_mm"], 297.04);
        assert!(json.get("pdf_path").is_none());
    }

    #[test]
    fn raster_error_changes_status() {
        let mut r = eps_report();
        r.margin_applied = true;
        assert_eq!(r.status_message(), "processed with margin");
        r.raster_error = Some(RasterError::Timeout {
            tool: "gs".into(),
            secs: 5,
        });
        assert_eq!(r.status_message(), "processed with margin, conversion failed");
    }

    #[test]
    fn report_round_trips_through_json() {
        let mut r = eps_report();
        r.modified_path = Some(PathBuf::from("modified/1_logo_modified.eps"));
        let back: AnalysisReport =
            serde_json::from_str(&serde_json::to_string(&r).unwrap()).unwrap();
        assert_eq!(back, r);
    }
}
