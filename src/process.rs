//! The end-to-end run: upload bytes in, counts + preview + report out.
//!
//! A [`Pipeline`] owns the process-wide resources (the detector and the
//! optional pdfium binding) and is shared across requests. Every run is
//! independent; there is no state carried between documents.
//!
//! Any stage failure aborts the whole run. A caller never sees partial
//! counts or a report that is missing pages.

use crate::backend::DetectionBackend;
use crate::config::PipelineConfig;
use crate::error::BlueprintError;
use crate::output::{PageSummary, ProcessingOutput, ProcessingStats};
use crate::pipeline::aggregate::aggregate;
use crate::pipeline::annotate::{annotate, AnnotatedPage};
use crate::pipeline::compose::compose_report;
use crate::pipeline::infer::{detect_page, NormalizedPage};
use crate::pipeline::input::Document;
use crate::pipeline::render;
use pdfium_render::prelude::Pdfium;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Detector, PDF engine and per-run settings, loaded once and reused.
///
/// `Send + Sync`: wrap it in an `Arc` to serve overlapping requests.
pub struct Pipeline {
    backend: Arc<dyn DetectionBackend>,
    pdfium: Option<Pdfium>,
    config: PipelineConfig,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("backend", &self.backend.name())
            .field("pdf_engine", &self.pdfium.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl Pipeline {
    /// A pipeline that accepts raster images only.
    ///
    /// Attach a PDF engine with [`Pipeline::with_pdf_engine`] to accept
    /// paged documents as well.
    pub fn new(backend: Arc<dyn DetectionBackend>, config: PipelineConfig) -> Self {
        Self {
            backend,
            pdfium: None,
            config,
        }
    }

    pub fn with_pdf_engine(mut self, pdfium: Pdfium) -> Self {
        self.pdfium = Some(pdfium);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one upload. `filename` only decides image vs. PDF handling.
    ///
    /// Synchronous and CPU-bound; see [`Pipeline::process`] for async hosts.
    pub fn process_blocking(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        comment: Option<&str>,
    ) -> Result<ProcessingOutput, BlueprintError> {
        let doc = Document::from_upload(bytes, filename);
        info!(
            "Processing '{}' ({:?}, {} bytes)",
            filename,
            doc.kind,
            doc.bytes.len()
        );
        self.process_document(&doc, comment)
    }

    /// Process an already classified document.
    pub fn process_document(
        &self,
        doc: &Document,
        comment: Option<&str>,
    ) -> Result<ProcessingOutput, BlueprintError> {
        let total_start = Instant::now();
        let cb = self.config.progress_callback.as_ref();

        // ── Step 1: Normalise ────────────────────────────────────────────────
        let render_start = Instant::now();
        let pages = render::normalize(doc, self.pdfium.as_ref(), self.config.dpi)?;
        let render_duration_ms = render_start.elapsed().as_millis() as u64;
        let total_pages = pages.len();

        if let Some(cb) = cb {
            cb.on_document_start(total_pages);
        }

        // ── Step 2: Detect + annotate, page by page, in order ────────────────
        let infer_start = Instant::now();
        let mut annotated: Vec<AnnotatedPage> = Vec::with_capacity(total_pages);
        for (idx, page) in pages.iter().enumerate() {
            let page_num = idx + 1;
            if let Some(cb) = cb {
                cb.on_page_start(page_num, total_pages);
            }

            let result = self.run_page(page, page_num);
            match result {
                Ok(page) => {
                    if let Some(cb) = cb {
                        cb.on_page_complete(page_num, total_pages, page.detections.len());
                    }
                    annotated.push(page);
                }
                Err(e) => {
                    warn!("Page {}/{} failed: {}", page_num, total_pages, e);
                    if let Some(cb) = cb {
                        cb.on_page_error(page_num, total_pages, &e.to_string());
                    }
                    return Err(e);
                }
            }
        }
        drop(pages);
        let inference_duration_ms = infer_start.elapsed().as_millis() as u64;

        // ── Step 3: Aggregate ────────────────────────────────────────────────
        let counts = aggregate(annotated.iter().map(|p| p.detections.as_slice()));
        info!(
            "Detected {} door(s), {} window(s) over {} page(s)",
            counts.door, counts.window, total_pages
        );

        // ── Step 4: Compose ──────────────────────────────────────────────────
        let compose_start = Instant::now();
        let images: Vec<&[u8]> = annotated.iter().map(|p| p.png.as_slice()).collect();
        let report_pdf = compose_report(&self.config.report_title, &counts, comment, &images)?;
        let compose_duration_ms = compose_start.elapsed().as_millis() as u64;

        let preview_png = annotated
            .first()
            .map(|p| p.png.clone())
            .ok_or(BlueprintError::EmptyDocument)?;

        let stats = ProcessingStats {
            total_pages,
            total_detections: counts.total(),
            render_duration_ms,
            inference_duration_ms,
            compose_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        if let Some(cb) = cb {
            cb.on_document_complete(total_pages, counts.total());
        }
        info!(
            "Report ready: {} pages, {} bytes, {}ms total",
            total_pages + 1,
            report_pdf.len(),
            stats.total_duration_ms
        );

        let pages = annotated
            .into_iter()
            .map(|p| PageSummary {
                page_num: p.page_num,
                detections: p.detections,
                annotated_png: p.png,
            })
            .collect();

        Ok(ProcessingOutput {
            counts,
            pages,
            preview_png,
            report_pdf,
            stats,
        })
    }

    /// Async wrapper around [`Pipeline::process_blocking`].
    ///
    /// Runs the CPU-bound work in place on the current worker thread via
    /// `block_in_place`, so it requires tokio's multi-threaded runtime.
    pub async fn process(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        comment: Option<&str>,
    ) -> Result<ProcessingOutput, BlueprintError> {
        tokio::task::block_in_place(|| self.process_blocking(bytes, filename, comment))
    }

    fn run_page(
        &self,
        page: &image::RgbImage,
        page_num: usize,
    ) -> Result<AnnotatedPage, BlueprintError> {
        let frame = NormalizedPage::from_page(page);
        let detections = detect_page(
            self.backend.as_ref(),
            &frame,
            page_num,
            self.config.confidence_threshold,
        )?;
        debug!("Page {}: {} detection(s)", page_num, detections.len());
        annotate(&frame, page_num, detections)
    }
}
