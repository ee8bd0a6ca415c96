//! Page geometry value types and unit conversion.
//!
//! Everything EPS and PDF say about page size is expressed in PostScript
//! points (1/72 inch). Callers almost always want millimetres, so the
//! conversion lives here once and every extractor goes through it.

use crate::error::GeometryError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// PostScript points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// ISO A4 in points, used by the last PDF fallback tier.
pub const A4_POINTS: BoundingBox = BoundingBox {
    x1: 0.0,
    y1: 0.0,
    x2: 595.0,
    y2: 842.0,
};

/// Convert points to millimetres (unrounded).
pub fn points_to_mm(pt: f64) -> f64 {
    pt * MM_PER_INCH / POINTS_PER_INCH
}

/// Convert millimetres to points (unrounded).
pub fn mm_to_points(mm: f64) -> f64 {
    mm * POINTS_PER_INCH / MM_PER_INCH
}

/// Round to two decimal places.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Round to the nearest integer with halves going toward +∞.
///
/// `f64::round` sends `-2.5` to `-3`; descriptors written by other tools send
/// it to `-2`, and margin output has to agree with them.
pub fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// A lower-left / upper-right rectangle in points.
///
/// Constructed through [`BoundingBox::new`], which rejects inverted boxes, or
/// [`BoundingBox::normalized`], which swaps corners instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// Build a box, failing with [`GeometryError::InvalidGeometry`] when
    /// `x2 < x1` or `y2 < y1`, or [`GeometryError::MalformedBox`] when a
    /// coordinate is not finite.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self, GeometryError> {
        let coords = [x1, y1, x2, y2];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(GeometryError::MalformedBox {
                which: "box",
                detail: format!("non-finite coordinate in {coords:?}"),
            });
        }
        if x2 < x1 || y2 < y1 {
            return Err(GeometryError::InvalidGeometry { x1, y1, x2, y2 });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// Build a box from any two opposite corners.
    ///
    /// PDF rectangles are allowed to list their corners in either order.
    pub fn normalized(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Width in points.
    pub fn width_pt(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Height in points.
    pub fn height_pt(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Physical size of this box, rounded to 0.01 mm.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width_mm: round2(points_to_mm(self.width_pt())),
            height_mm: round2(points_to_mm(self.height_pt())),
        }
    }

    /// Grow the box by `margin_pt` on every side, rounding each coordinate
    /// independently to a whole point.
    pub fn expanded(&self, margin_pt: f64) -> Self {
        Self {
            x1: round_half_up(self.x1 - margin_pt),
            y1: round_half_up(self.y1 - margin_pt),
            x2: round_half_up(self.x2 + margin_pt),
            y2: round_half_up(self.y2 + margin_pt),
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {} {}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Width and height of a page in millimetres, rounded to 0.01 mm.
///
/// Only obtainable from a [`BoundingBox`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width_mm: f64,
    pub height_mm: f64,
}

/// Which candidate box produced a [`Dimensions`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometrySource {
    /// PDF page `/TrimBox`.
    TrimBox,
    /// PDF page `/MediaBox`.
    MediaBox,
    /// Width/height reported by the page object itself.
    PageSize,
    /// Hard-coded ISO A4.
    Default,
    /// EPS `%%BoundingBox` header comment.
    #[serde(rename = "EPSBoundingBox")]
    EpsBoundingBox,
}

impl GeometrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometrySource::TrimBox => "TrimBox",
            GeometrySource::MediaBox => "MediaBox",
            GeometrySource::PageSize => "PageSize",
            GeometrySource::Default => "Default",
            GeometrySource::EpsBoundingBox => "EPSBoundingBox",
        }
    }
}

impl fmt::Display for GeometrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful geometry extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub dimensions: Dimensions,
    pub source: GeometrySource,
    pub raw_box: BoundingBox,
}

impl Extraction {
    pub(crate) fn from_box(raw_box: BoundingBox, source: GeometrySource) -> Self {
        Self {
            dimensions: raw_box.dimensions(),
            source,
            raw_box,
        }
    }
}
