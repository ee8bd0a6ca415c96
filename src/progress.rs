//! Progress-callback trait for batch analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to receive
//! events as [`crate::analyze::analyze_many`] works through its inputs.
//! The trait is `Send + Sync` because documents are analysed concurrently.
//!
//! # Example
//!
//! ```rust
//! use pagebox::{AnalysisConfig, AnalysisProgressCallback, AnalysisReport};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     margined: AtomicUsize,
//! }
//!
//! impl AnalysisProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, _input: &str, report: &AnalysisReport) {
//!         if report.margin_applied {
//!             self.margined.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { margined: AtomicUsize::new(0) });
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(counter as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::AnalysisReport;
use std::sync::Arc;

/// Called by batch analysis as it processes each input.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Per-file methods may be called concurrently from
/// different tasks; protect shared state accordingly.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once before any input is opened.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before an input is resolved.
    fn on_file_start(&self, input: &str) {
        let _ = input;
    }

    /// Called when an input produced dimensions.
    ///
    /// A report with a `raster_error` still counts as complete.
    fn on_file_complete(&self, input: &str, report: &AnalysisReport) {
        let _ = (input, report);
    }

    /// Called when an input failed fatally.
    fn on_file_error(&self, input: &str, error: &str) {
        let _ = (input, error);
    }

    /// Called once after every input has been attempted.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, GeometrySource};
    use crate::output::DocumentKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        batch_total: AtomicUsize,
    }

    impl AnalysisProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_files: usize) {
            self.batch_total.store(total_files, Ordering::SeqCst);
        }

        fn on_file_start(&self, _input: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _input: &str, _report: &AnalysisReport) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_error(&self, _input: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn report() -> AnalysisReport {
        let b = BoundingBox::new(0.0, 0.0, 72.0, 72.0).unwrap();
        AnalysisReport::new(DocumentKind::Eps, b, GeometrySource::EpsBoundingBox)
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_file_start("a.eps");
        cb.on_file_complete("a.eps", &report());
        cb.on_file_error("b.pdf", "no pages");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_batch_start(3);
        tracker.on_file_start("a.eps");
        tracker.on_file_complete("a.eps", &report());
        tracker.on_file_start("b.eps");
        tracker.on_file_complete("b.eps", &report());
        tracker.on_file_start("c.pdf");
        tracker.on_file_error("c.pdf", "document has no pages");

        assert_eq!(tracker.batch_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(1);
        cb.on_file_start("x.eps");
    }
}
