//! Geometry extraction for the two supported document kinds.
//!
//! Both extractors are pure: they take bytes or already-decoded box values
//! and return an [`crate::geometry::Extraction`] or a
//! [`crate::error::GeometryError`]. File access, pdfium and qpdf live in
//! [`crate::backend`] and [`crate::pipeline`].
//!
//! 1. [`eps`] — first `%%BoundingBox:` header comment
//! 2. [`pdf`] — TrimBox → MediaBox → page size → A4, over a
//!    [`pdf::PageBoxProvider`]

pub mod eps;
pub mod pdf;
