//! Error types for the blueprint-report library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BlueprintError`] is **fatal**: the document cannot be turned into a
//!   report (undecodable input, empty document, detector failure, report
//!   assembly failure). Returned as `Err(BlueprintError)` from
//!   [`crate::Pipeline::process_blocking`] and friends. A run that fails
//!   midway produces no counts and no report.
//!
//! * [`DispatchError`] is **non-fatal**: the report was produced but handing it
//!   to an external sink (mail relay, preview storage) failed. Stored inside
//!   [`crate::dispatch::DispatchReport`] next to the successful output.
//!
//! [`BlueprintError::InferenceUnavailable`] is special: it is only produced
//! while loading the detector at process start, and a host must refuse to
//! serve requests when it sees it.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the blueprint-report library.
#[derive(Debug, Error)]
pub enum BlueprintError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The bytes decode neither as a raster image nor as a paged document.
    #[error("Unsupported format: {detail}")]
    UnsupportedFormat { detail: String },

    /// Normalisation produced zero pages.
    #[error("Document contains no renderable pages")]
    EmptyDocument,

    /// pdfium failed on a page after the document itself opened fine.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// A paged document arrived but no PDF engine was bound at startup.
    #[error(
        "No PDF engine bound: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfEngineUnavailable(String),

    // ── Detector errors ───────────────────────────────────────────────────
    /// The detection backend could not be loaded at process start.
    #[error("Detector unavailable from '{path}': {reason}")]
    InferenceUnavailable { path: PathBuf, reason: String },

    /// A single detector call failed; the whole document is aborted.
    #[error("Inference failed on page {page}: {detail}")]
    InferenceError { page: usize, detail: String },

    // ── Report errors ─────────────────────────────────────────────────────
    /// An annotated page could not be embedded, or the PDF could not be written.
    #[error("Report composition failed: {detail}")]
    CompositionError { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error raised while handing a finished report to a sink.
///
/// The pipeline result is already complete when one of these happens, so it
/// is reported next to the output rather than replacing it.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Writing to the local filesystem failed.
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP request to the mail relay could not be completed.
    #[error("Mail relay request failed: {detail}")]
    Http { detail: String },

    /// The relay answered, but refused the message.
    #[error("Mail relay rejected the report with HTTP {status}")]
    Rejected { status: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_error_display() {
        let e = BlueprintError::InferenceError {
            page: 3,
            detail: "shape mismatch".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 3"), "got: {msg}");
        assert!(msg.contains("shape mismatch"));
    }

    #[test]
    fn inference_unavailable_mentions_path() {
        let e = BlueprintError::InferenceUnavailable {
            path: PathBuf::from("/models/best.rten"),
            reason: "file not found".into(),
        };
        assert!(e.to_string().contains("/models/best.rten"));
    }

    #[test]
    fn engine_unavailable_has_setup_hint() {
        let e = BlueprintError::PdfEngineUnavailable("not bound".into());
        assert!(e.to_string().contains("PDFIUM_LIB_PATH"));
    }

    #[test]
    fn rejected_display() {
        let e = DispatchError::Rejected { status: 502 };
        assert!(e.to_string().contains("502"));
    }
}
