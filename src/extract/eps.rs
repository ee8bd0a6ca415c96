//! EPS geometry: the `%%BoundingBox:` DSC header comment.
//!
//! The document is scanned as raw bytes rather than text. EPS files from
//! design tools routinely carry a DOS binary header and TIFF or WMF previews,
//! and decoding them as UTF-8 would either fail or mangle the very bytes the
//! margin injector must pass through.
//!
//! Only the first descriptor counts. `%%BoundingBox: (atend)` is not a match,
//! so a deferred header falls through to the trailer copy, which is what
//! DSC readers do as well.

use crate::error::GeometryError;
use crate::geometry::{BoundingBox, Extraction, GeometrySource};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::ops::Range;
use tracing::debug;

/// `%%BoundingBox:` followed by four integers. `%%HiResBoundingBox:` does not
/// match because the `%%` must sit directly before `BoundingBox`.
static BOUNDING_BOX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%%BoundingBox:[ \t]*(-?[0-9]+)[ \t]+(-?[0-9]+)[ \t]+(-?[0-9]+)[ \t]+(-?[0-9]+)")
        .expect("static regex")
});

/// A located `%%BoundingBox:` descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor<'a> {
    /// Byte range of the whole descriptor, from `%%` to the last digit.
    pub span: Range<usize>,
    fields: [&'a [u8]; 4],
}

impl Descriptor<'_> {
    /// Parse the four coordinates as integers.
    pub fn coordinates(&self) -> Result<[i64; 4], GeometryError> {
        let mut out = [0i64; 4];
        for (slot, raw) in out.iter_mut().zip(self.fields) {
            // The regex only admits ASCII digits and '-', so from_utf8 cannot fail.
            let text = std::str::from_utf8(raw).unwrap_or_default();
            *slot = text.parse().map_err(|_| GeometryError::MalformedBox {
                which: "%%BoundingBox",
                detail: format!("coordinate '{text}' is out of range"),
            })?;
        }
        Ok(out)
    }

    /// Parse the coordinates into a validated [`BoundingBox`].
    pub fn bounding_box(&self) -> Result<BoundingBox, GeometryError> {
        let [x1, y1, x2, y2] = self.coordinates()?;
        BoundingBox::new(x1 as f64, y1 as f64, x2 as f64, y2 as f64)
    }
}

/// Find the first `%%BoundingBox:` descriptor in `bytes`.
pub fn find_descriptor(bytes: &[u8]) -> Option<Descriptor<'_>> {
    let caps = BOUNDING_BOX_RE.captures(bytes)?;
    let whole = caps.get(0)?;
    let field = |i: usize| caps.get(i).map(|m| m.as_bytes()).unwrap_or_default();
    Some(Descriptor {
        span: whole.range(),
        fields: [field(1), field(2), field(3), field(4)],
    })
}

/// Extract page dimensions from an EPS document.
///
/// # Errors
/// - [`GeometryError::GeometryNotFound`] when no descriptor exists
/// - [`GeometryError::InvalidGeometry`] when `x2 < x1` or `y2 < y1`
/// - [`GeometryError::MalformedBox`] when a coordinate overflows
pub fn extract(bytes: &[u8]) -> Result<Extraction, GeometryError> {
    let descriptor = find_descriptor(bytes).ok_or_else(|| {
        GeometryError::GeometryNotFound("no %%BoundingBox descriptor in EPS header".into())
    })?;
    let raw_box = descriptor.bounding_box()?;
    debug!(
        "EPS %%BoundingBox {} at bytes {:?}",
        raw_box, descriptor.span
    );
    Ok(Extraction::from_box(raw_box, GeometrySource::EpsBoundingBox))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &[u8] = b"%!PS-Adobe-3.0 EPSF-3.0\n\
%%Creator: test\n\
%%BoundingBox: 0 0 595 842\n\
%%HiResBoundingBox: 0.000 0.000 595.276 841.890\n\
%%EndComments\n\
showpage\n";

    #[test]
    fn extracts_a4_box() {
        let e = extract(SIMPLE).unwrap();
        assert_eq!(e.source, GeometrySource::EpsBoundingBox);
        assert_eq!(e.dimensions.width_mm, 209.9);
        assert_eq!(e.dimensions.height_mm, 297.04);
        assert_eq!(e.raw_box, BoundingBox::new(0.0, 0.0, 595.0, 842.0).unwrap());
    }

    #[test]
    fn missing_descriptor_is_not_found() {
        let err = extract(b"%!PS-Adobe-3.0 EPSF-3.0\nshowpage\n").unwrap_err();
        assert!(matches!(err, GeometryError::GeometryNotFound(_)));
    }

    #[test]
    fn inverted_descriptor_is_invalid() {
        let err = extract(b"%%BoundingBox: 50 50 10 10\n").unwrap_err();
        assert_eq!(
            err,
            GeometryError::InvalidGeometry {
                x1: 50.0,
                y1: 50.0,
                x2: 10.0,
                y2: 10.0
            }
        );
    }

    #[test]
    fn first_descriptor_wins() {
        let doc = b"%%BoundingBox: 0 0 100 100\n%%Trailer\n%%BoundingBox: 0 0 200 200\n";
        let e = extract(doc).unwrap();
        assert_eq!(e.raw_box.x2, 100.0);
    }

    #[test]
    fn atend_falls_through_to_trailer() {
        let doc = b"%%BoundingBox: (atend)\n%%EndComments\n%%Trailer\n%%BoundingBox: 10 20 110 220\n";
        let e = extract(doc).unwrap();
        assert_eq!(e.raw_box, BoundingBox::new(10.0, 20.0, 110.0, 220.0).unwrap());
    }

    #[test]
    fn hires_only_is_not_found() {
        let err = extract(b"%%HiResBoundingBox: 0 0 100 100\n").unwrap_err();
        assert!(matches!(err, GeometryError::GeometryNotFound(_)));
    }

    #[test]
    fn negative_coordinates_parse() {
        let e = extract(b"%%BoundingBox: -6 -6 106 106\n").unwrap();
        assert_eq!(e.raw_box.x1, -6.0);
        assert_eq!(e.raw_box.width_pt(), 112.0);
    }

    #[test]
    fn overflowing_coordinate_is_malformed() {
        let err = extract(b"%%BoundingBox: 0 0 99999999999999999999 10\n").unwrap_err();
        assert!(matches!(err, GeometryError::MalformedBox { .. }));
    }

    #[test]
    fn tolerates_binary_preview() {
        let mut doc = vec![0xC5, 0xD0, 0xD3, 0xC6, 0x1E, 0x00, 0x00, 0x00];
        doc.extend_from_slice(&[0xFF, 0x00, 0x80, 0x9F]);
        doc.extend_from_slice(b"%!PS-Adobe-3.0 EPSF-3.0\n%%BoundingBox: 12 24 84 96\n");
        doc.extend_from_slice(&[0xFE, 0xFF, 0x00]);
        let e = extract(&doc).unwrap();
        assert_eq!(e.dimensions.width_mm, 25.4);
        assert_eq!(e.dimensions.height_mm, 25.4);
    }

    #[test]
    fn descriptor_span_covers_only_the_numbers() {
        let doc = b"xx%%BoundingBox: 1 2 3 4 trailing";
        let d = find_descriptor(doc).unwrap();
        assert_eq!(&doc[d.span.clone()], b"%%BoundingBox: 1 2 3 4");
        assert_eq!(d.coordinates().unwrap(), [1, 2, 3, 4]);
    }

    #[test]
    fn tabs_and_missing_space_after_colon() {
        let e = extract(b"%%BoundingBox:0\t0  72 72\n").unwrap();
        assert_eq!(e.dimensions.width_mm, 25.4);
    }
}
