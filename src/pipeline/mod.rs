//! The I/O around the pure extractors.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ margin ──▶ rasterize ──▶ render ──▶ encode
//! (URL/path) (core)     (core)     (gs → PDF)   (pdfium)   (base64)
//! ```
//!
//! 1. [`input`]     — canonicalise the user-supplied path or URL to a local
//!    file and detect whether it is EPS or PDF
//! 2. [`rasterize`] — convert a margined EPS to PDF with Ghostscript
//! 3. [`render`]    — rasterise page 1 of that PDF to a PNG thumbnail; runs
//!    in `spawn_blocking` because pdfium is not async-safe
//! 4. [`encode`]    — PNG-encode and base64-wrap the thumbnail
//!
//! Steps 2-4 are optional and never fatal for an analysis.

pub mod encode;
pub mod input;
pub mod rasterize;
pub mod render;
