//! Margin injection: enlarge an EPS `%%BoundingBox` in place.
//!
//! The descriptor is the only part of the document that changes. Everything
//! before and after it is copied byte-for-byte into a fresh buffer, so binary
//! previews and non-UTF-8 payloads survive. The DOS EPS header, if any, is
//! not patched for the length change, and `%%HiResBoundingBox` is left as is.
//!
//! Injection is not idempotent. Running it on an already-margined document
//! adds the margin again; callers track whether a document was margined.

use crate::extract::eps;
use crate::geometry::{mm_to_points, BoundingBox};
use tracing::debug;

/// Margin added on every side unless configured otherwise, in millimetres.
pub const DEFAULT_MARGIN_MM: f64 = 2.0;

/// An EPS document whose bounding box has been enlarged.
///
/// Owns its buffer; the input document is never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginedDocument {
    /// The rewritten document.
    pub bytes: Vec<u8>,
    /// The box written into the descriptor.
    pub bounding_box: BoundingBox,
}

/// Render a descriptor line for `b`. Coordinates are written as integers.
pub fn format_descriptor(b: &BoundingBox) -> String {
    format!(
        "%%BoundingBox: {} {} {} {}",
        b.x1 as i64, b.y1 as i64, b.x2 as i64, b.y2 as i64
    )
}

/// Replace the first `%%BoundingBox:` descriptor of `bytes` with `bbox`
/// grown by `margin_mm` on each side.
///
/// Returns `None` when the document has no descriptor; this is a skip, not a
/// failure, since dimensions are reported independently.
pub fn inject_margin(bytes: &[u8], bbox: &BoundingBox, margin_mm: f64) -> Option<MarginedDocument> {
    let descriptor = eps::find_descriptor(bytes)?;
    let span = descriptor.span;

    let enlarged = bbox.expanded(mm_to_points(margin_mm));
    let line = format_descriptor(&enlarged);
    debug!(
        "Replacing bytes {:?} with '{}' ({} mm margin)",
        span, line, margin_mm
    );

    let mut out = Vec::with_capacity(bytes.len() + line.len());
    out.extend_from_slice(&bytes[..span.start]);
    out.extend_from_slice(line.as_bytes());
    out.extend_from_slice(&bytes[span.end..]);

    Some(MarginedDocument {
        bytes: out,
        bounding_box: enlarged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::eps::extract;

    fn doc(bbox: &str) -> Vec<u8> {
        format!("%!PS-Adobe-3.0 EPSF-3.0\n%%BoundingBox: {bbox}\n%%EndComments\nshowpage\n")
            .into_bytes()
    }

    #[test]
    fn expands_unit_square() {
        let src = doc("0 0 100 100");
        let b = extract(&src).unwrap().raw_box;
        let m = inject_margin(&src, &b, DEFAULT_MARGIN_MM).unwrap();
        let text = String::from_utf8(m.bytes).unwrap();
        assert!(text.contains("%%BoundingBox: -6 -6 106 106\n"), "got: {text}");
        assert_eq!(m.bounding_box.x1, -6.0);
    }

    #[test]
    fn no_descriptor_is_a_skip() {
        let src = b"%!PS-Adobe-3.0 EPSF-3.0\nshowpage\n";
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        assert!(inject_margin(src, &b, DEFAULT_MARGIN_MM).is_none());
    }

    #[test]
    fn round_trip_adds_four_mm() {
        let src = doc("36 36 400 600");
        let before = extract(&src).unwrap();
        let m = inject_margin(&src, &before.raw_box, DEFAULT_MARGIN_MM).unwrap();
        let after = extract(&m.bytes).unwrap();
        let dw = after.dimensions.width_mm - before.dimensions.width_mm;
        let dh = after.dimensions.height_mm - before.dimensions.height_mm;
        // Integer coordinates always round 5.67pt up to 6pt per side.
        assert!((dw - 4.0).abs() <= 0.25, "width grew by {dw}");
        assert!((dh - 4.0).abs() <= 0.25, "height grew by {dh}");
    }

    #[test]
    fn injection_is_not_idempotent() {
        let src = doc("36 36 400 600");
        let before = extract(&src).unwrap();
        let once = inject_margin(&src, &before.raw_box, DEFAULT_MARGIN_MM).unwrap();
        let mid = extract(&once.bytes).unwrap();
        let twice = inject_margin(&once.bytes, &mid.raw_box, DEFAULT_MARGIN_MM).unwrap();
        let after = extract(&twice.bytes).unwrap();
        let dw = after.dimensions.width_mm - before.dimensions.width_mm;
        assert!((dw - 8.0).abs() <= 0.5, "width grew by {dw}");
        assert!(dw > 6.0, "second injection must add another margin");
    }

    #[test]
    fn surrounding_bytes_are_untouched() {
        let prefix: &[u8] = &[0xC5, 0xD0, 0xD3, 0xC6, 0x00, 0xFF, b'\n'];
        let suffix: &[u8] = &[b'\n', 0x89, b'P', b'N', b'G', 0x00, 0xFE];
        let mut src = prefix.to_vec();
        src.extend_from_slice(b"%%BoundingBox: 10 10 20 20");
        src.extend_from_slice(suffix);

        let b = extract(&src).unwrap().raw_box;
        let m = inject_margin(&src, &b, DEFAULT_MARGIN_MM).unwrap();
        assert!(m.bytes.starts_with(prefix));
        assert!(m.bytes.ends_with(suffix));
        assert_eq!(
            &m.bytes[prefix.len()..m.bytes.len() - suffix.len()],
            b"%%BoundingBox: 4 4 26 26"
        );
    }

    #[test]
    fn only_first_descriptor_is_rewritten() {
        let src = b"%%BoundingBox: 0 0 100 100\n%%Trailer\n%%BoundingBox: 0 0 100 100\n";
        let b = extract(src).unwrap().raw_box;
        let m = inject_margin(src, &b, DEFAULT_MARGIN_MM).unwrap();
        let text = String::from_utf8(m.bytes).unwrap();
        assert_eq!(
            text,
            "%%BoundingBox: -6 -6 106 106\n%%Trailer\n%%BoundingBox: 0 0 100 100\n"
        );
    }

    #[test]
    fn hires_line_is_left_alone() {
        let src = b"%%BoundingBox: 0 0 100 100\n%%HiResBoundingBox: 0.0 0.0 100.0 100.0\n";
        let b = extract(src).unwrap().raw_box;
        let m = inject_margin(src, &b, DEFAULT_MARGIN_MM).unwrap();
        let text = String::from_utf8(m.bytes).unwrap();
        assert!(text.ends_with("%%HiResBoundingBox: 0.0 0.0 100.0 100.0\n"));
    }

    #[test]
    fn zero_margin_rewrites_same_box() {
        let src = doc("1 2 3 4");
        let b = extract(&src).unwrap().raw_box;
        let m = inject_margin(&src, &b, 0.0).unwrap();
        assert_eq!(m.bytes, src);
    }

    #[test]
    fn input_is_not_modified() {
        let src = doc("0 0 100 100");
        let copy = src.clone();
        let b = extract(&src).unwrap().raw_box;
        let _ = inject_margin(&src, &b, DEFAULT_MARGIN_MM);
        assert_eq!(src, copy);
    }
}
