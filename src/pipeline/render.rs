//! Document normalisation: turn a [`Document`] into ordered RGB pages.
//!
//! Raster images decode through the `image` crate and become a single page.
//! PDFs are rasterised through pdfium at a fixed DPI, every page in order.
//! Either way the result is 8-bit RGB at the page's native resolution; the
//! resize to the inference frame happens later, in [`super::infer`].
//!
//! pdfium is CPU-bound and not async-safe, so this stage is synchronous.
//! Async callers go through [`crate::Pipeline::process`], which moves the
//! whole run onto a blocking thread.

use super::input::{Document, DocumentKind};
use crate::error::BlueprintError;
use image::RgbImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Normalise a document into a non-empty, ordered list of RGB pages.
///
/// `pdfium` is only consulted for [`DocumentKind::Paged`] documents.
pub fn normalize(
    doc: &Document,
    pdfium: Option<&Pdfium>,
    dpi: u32,
) -> Result<Vec<RgbImage>, BlueprintError> {
    let pages = match doc.kind {
        DocumentKind::Image => vec![decode_image(doc)?],
        DocumentKind::Paged => {
            if !doc.looks_like_pdf() {
                return Err(BlueprintError::UnsupportedFormat {
                    detail: format!("not a PDF (first bytes {:?})", doc.magic()),
                });
            }
            let pdfium = pdfium.ok_or_else(|| {
                BlueprintError::PdfEngineUnavailable(
                    "a PDF was submitted but no pdfium library is bound".into(),
                )
            })?;
            render_pdf(doc, pdfium, dpi)?
        }
    };

    if pages.is_empty() {
        return Err(BlueprintError::EmptyDocument);
    }

    info!("Normalised document into {} page(s)", pages.len());
    Ok(pages)
}

/// Decode a single raster image and convert it to RGB.
fn decode_image(doc: &Document) -> Result<RgbImage, BlueprintError> {
    let image = image::load_from_memory(&doc.bytes).map_err(|e| {
        let hint = if doc.looks_like_pdf() {
            " (the file is a PDF; upload it with a .pdf name)"
        } else {
            ""
        };
        BlueprintError::UnsupportedFormat {
            detail: format!(
                "cannot decode image (first bytes {:?}): {}{}",
                doc.magic(),
                e,
                hint
            ),
        }
    })?;

    debug!("Decoded image {}x{} px", image.width(), image.height());
    Ok(image.to_rgb8())
}

/// Rasterise every page of a PDF at `dpi`.
fn render_pdf(doc: &Document, pdfium: &Pdfium, dpi: u32) -> Result<Vec<RgbImage>, BlueprintError> {
    let document = pdfium
        .load_pdf_from_byte_slice(&doc.bytes, None)
        .map_err(|e| BlueprintError::UnsupportedFormat {
            detail: format!("cannot open PDF: {:?}", e),
        })?;

    // No size cap: large sheets render at the full DPI.
    let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut results = Vec::new();
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            BlueprintError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push(image.to_rgb8());
    }

    Ok(results)
}
