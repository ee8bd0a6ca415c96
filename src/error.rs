//! Error types for the pagebox library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`GeometryError`] — the document was read but its page geometry could
//!   not be determined. Produced by the pure extractors; never retried, since
//!   parsing is deterministic.
//!
//! * [`PageBoxError`] — **Fatal**: the analysis cannot produce dimensions at
//!   all (bad input file, unreadable PDF, geometry error). Returned as
//!   `Err(PageBoxError)` from the top-level `analyze*` functions.
//!
//! * [`RasterError`] — **Non-fatal**: dimensions are known but the PDF or
//!   thumbnail could not be produced. Stored inside
//!   [`crate::output::AnalysisReport`] so the caller still gets an answer.

use std::path::PathBuf;
use thiserror::Error;

/// Why page geometry could not be determined.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// No bounding-box descriptor (EPS) or usable box (PDF) was found.
    #[error("no page geometry found: {0}")]
    GeometryNotFound(String),

    /// A box was found but its upper-right corner lies below or left of its
    /// lower-left corner.
    #[error("invalid geometry [{x1} {y1} {x2} {y2}]: upper-right corner precedes lower-left")]
    InvalidGeometry { x1: f64, y1: f64, x2: f64, y2: f64 },

    /// The PDF has no pages.
    #[error("document has no pages")]
    NoPageFound,

    /// A box is present but is not exactly four finite numbers.
    #[error("malformed {which}: {detail}")]
    MalformedBox { which: &'static str, detail: String },
}

/// All fatal errors returned by the pagebox library.
#[derive(Debug, Error)]
pub enum PageBoxError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file is neither EPS nor PDF.
    #[error("Unsupported document '{path}': not EPS or PDF (first bytes: {magic:?})")]
    UnsupportedDocument { path: PathBuf, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not open the PDF.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium next to the binary or on the system library path,\n\
or point --pdfium-lib / PAGEBOX_PDFIUM_LIB at an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    /// `qpdf --json` could not be run or its output could not be read.
    #[error("qpdf failed on '{path}': {detail}")]
    QpdfFailed { path: PathBuf, detail: String },

    // ── Geometry errors ───────────────────────────────────────────────────
    /// The document was read but its page geometry could not be determined.
    #[error("Invalid file '{path}': {source}")]
    Geometry {
        path: PathBuf,
        #[source]
        source: GeometryError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PageBoxError {
    /// Attach a path to a [`GeometryError`].
    pub fn geometry(path: impl Into<PathBuf>, source: GeometryError) -> Self {
        PageBoxError::Geometry {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should be shown to the user as "invalid file"
    /// rather than as an environment or I/O problem.
    pub fn is_invalid_file(&self) -> bool {
        matches!(
            self,
            PageBoxError::Geometry { .. }
                | PageBoxError::UnsupportedDocument { .. }
                | PageBoxError::CorruptPdf { .. }
        )
    }
}

/// A non-fatal failure while producing the PDF or thumbnail for a margined
/// EPS.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum RasterError {
    /// The external tool could not be started.
    #[error("{tool} could not be started: {detail}")]
    ToolMissing { tool: String, detail: String },

    /// The external tool exited unsuccessfully.
    #[error("{tool} exited with status {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: i32,
        stderr: String,
    },

    /// The external tool did not finish in time.
    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    /// pdfium could not render the thumbnail.
    #[error("thumbnail rendering failed: {detail}")]
    RenderFailed { detail: String },

    /// A derived artifact could not be written.
    #[error("failed to write '{path}': {detail}")]
    WriteFailed { path: PathBuf, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_geometry_display() {
        let e = GeometryError::InvalidGeometry {
            x1: 50.0,
            y1: 50.0,
            x2: 10.0,
            y2: 10.0,
        };
        assert!(e.to_string().contains("[50 50 10 10]"), "got: {e}");
    }

    #[test]
    fn geometry_error_carries_path() {
        let e = PageBoxError::geometry(
            "/tmp/logo.eps",
            GeometryError::GeometryNotFound("no %%BoundingBox".into()),
        );
        let msg = e.to_string();
        assert!(msg.contains("logo.eps"), "got: {msg}");
        assert!(msg.contains("%%BoundingBox"), "got: {msg}");
        assert!(e.is_invalid_file());
    }

    #[test]
    fn io_errors_are_not_invalid_file() {
        let e = PageBoxError::FileNotFound {
            path: PathBuf::from("missing.eps"),
        };
        assert!(!e.is_invalid_file());
    }

    #[test]
    fn raster_tool_failed_display() {
        let e = RasterError::ToolFailed {
            tool: "gs".into(),
            status: 1,
            stderr: "Unrecoverable error".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("gs"));
        assert!(msg.contains("status 1"));
    }

    #[test]
    fn raster_timeout_display() {
        let e = RasterError::Timeout {
            tool: "gs".into(),
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
    }
}
