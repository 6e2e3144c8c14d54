//! # blueprint-report
//!
//! Detect doors and windows on architectural drawings and produce an
//! annotated PDF report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (image or PDF)
//!  │
//!  ├─ 1. Normalise  decode the image, or rasterise every PDF page via pdfium
//!  ├─ 2. Detect     resize each page to 640×640, run the detector, keep score > 0.30
//!  ├─ 3. Annotate   green door / orange window outlines with captions
//!  ├─ 4. Aggregate  per-label counts over the whole document
//!  └─ 5. Compose    summary page + one page per annotated image
//! ```
//!
//! A run either succeeds completely or fails with a [`BlueprintError`];
//! there are no partial reports. Delivering the result (files, mail) is a
//! separate, non-fatal step in [`dispatch`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blueprint_report::{load_backend, BackendKind, DetectorConfig, Pipeline, PipelineConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Loaded once per process; a failure here means "do not serve".
//!     let backend = load_backend(&DetectorConfig::new(BackendKind::Rten, "models/best.rten"))?;
//!     let pipeline = Pipeline::new(backend, PipelineConfig::default());
//!
//!     let bytes = std::fs::read("plan.png")?;
//!     let output = pipeline.process_blocking(bytes, "plan.png", Some("Level 2"))?;
//!     println!("doors: {}, windows: {}", output.counts.door, output.counts.window);
//!     std::fs::write("report.pdf", &output.report_pdf)?;
//!     Ok(())
//! }
//! ```
//!
//! PDF uploads additionally need a bound pdfium library:
//! `Pipeline::new(..).with_pdf_engine(bind_pdfium(None)?)`.
//!
//! ## Feature Flags
//!
//! | Feature        | Default | Description |
//! |----------------|---------|-------------|
//! | `cli`          | on      | The `blueprint-report` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `rten-backend` | on      | Pure-Rust detector runtime for `.rten` models |
//! | `ort-backend`  | off     | ONNX Runtime detector for `.onnx` models |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod detection;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{load_backend, BackendError, DetectionBackend};
pub use config::{BackendKind, DetectorConfig, PipelineConfig, PipelineConfigBuilder};
pub use detection::{BoundingBox, Detection, Label, RawDetection};
pub use dispatch::{dispatch, DirectorySink, DispatchReport, MailRelaySink, PreviewStore, ReportSink};
pub use engine::bind_pdfium;
pub use error::{BlueprintError, DispatchError};
pub use output::{Counts, PageSummary, ProcessingOutput, ProcessingStats};
pub use process::Pipeline;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
