//! Pipeline stages for blueprint detection and reporting.
//!
//! Each submodule implements exactly one transformation step, so stages can
//! be tested on their own and the detector runtime can be swapped without
//! touching anything else.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ infer ──▶ annotate ──▶ aggregate ──▶ compose
//! (bytes)   (pages)    (640²)    (overlays)   (counts)      (PDF)
//! ```
//!
//! 1. [`input`]: classify the upload as a raster image or a paged document
//! 2. [`render`]: decode or rasterise into ordered RGB pages (pdfium for PDFs)
//! 3. [`infer`]: resize to the 640×640 frame, run the detector, apply the
//!    confidence threshold
//! 4. [`annotate`]: draw label-coloured outlines and captions on a copy of
//!    the frame; captions use the bitmap font in [`glyphs`]
//! 5. [`aggregate`]: fold per-page detections into per-label counts
//! 6. [`compose`]: summary page plus one page per annotated image
//!
//! [`encode`] holds the PNG and data-URI helpers shared by the later stages.

pub mod aggregate;
pub mod annotate;
pub mod compose;
pub mod encode;
pub mod glyphs;
pub mod infer;
pub mod input;
pub mod render;
