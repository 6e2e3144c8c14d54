//! Progress-callback trait for per-page pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline walks through a document.
//!
//! # Example
//!
//! ```rust
//! use blueprint_report::{PipelineConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct DetectionTally {
//!     seen: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for DetectionTally {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, detections: usize) {
//!         self.seen.fetch_add(detections, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}: {detections} objects");
//!     }
//! }
//!
//! let tally = Arc::new(DetectionTally { seen: AtomicUsize::new(0) });
//! let config = PipelineConfig::builder()
//!     .progress_callback(tally as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes each page.
///
/// Pages are processed in document order on the calling thread, but the
/// same callback may be shared by several concurrent runs, so
/// implementations must be `Send + Sync`. All methods default to no-ops.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once the document has been normalised into pages.
    fn on_document_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is sent to the detector.
    ///
    /// * `page_num`: 1-indexed page number
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page has been detected and annotated.
    ///
    /// * `detections`: retained detections on this page
    fn on_page_complete(&self, page_num: usize, total_pages: usize, detections: usize) {
        let _ = (page_num, total_pages, detections);
    }

    /// Called when a page fails; the run aborts right after.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once the report has been composed.
    fn on_document_complete(&self, total_pages: usize, total_detections: usize) {
        let _ = (total_pages, total_detections);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        detections: AtomicUsize,
        errors: AtomicUsize,
    }

    impl PipelineProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, detections: usize) {
            self.detections.fetch_add(detections, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_document_start(2);
        cb.on_page_start(1, 2);
        cb.on_page_complete(1, 2, 4);
        cb.on_page_error(2, 2, "boom");
        cb.on_document_complete(2, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page_start(1, 2);
        tracker.on_page_complete(1, 2, 3);
        tracker.on_page_start(2, 2);
        tracker.on_page_error(2, 2, "detector crashed");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.detections.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
