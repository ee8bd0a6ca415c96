//! PDF page-box providers.
//!
//! Each backend turns a PDF file into something that implements
//! [`crate::extract::pdf::PageBoxProvider`]. The fallback chain itself is not
//! repeated here.
//!
//! - [`pdfium`] — reads boxes and the intrinsic page size through
//!   `pdfium-render`; blocking, so it runs in `spawn_blocking`
//! - [`qpdf`]   — reads the page dictionary out of `qpdf --json`, following
//!   `/Parent` for the inheritable MediaBox

pub mod pdfium;
pub mod qpdf;
