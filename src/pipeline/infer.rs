//! Inference adapter: page → 640×640 frame → backend → filtered detections.

use crate::backend::DetectionBackend;
use crate::detection::{filter_detections, Detection, INPUT_SIZE};
use crate::error::BlueprintError;
use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::debug;

/// A page resized to the square inference frame.
///
/// Only constructible through [`NormalizedPage::from_page`], so every value
/// is exactly `INPUT_SIZE` × `INPUT_SIZE`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPage(RgbImage);

impl NormalizedPage {
    /// Resize a native-resolution page to the inference frame.
    ///
    /// The aspect ratio is not preserved; box coordinates are only meaningful
    /// in the resized frame.
    pub fn from_page(page: &RgbImage) -> Self {
        if page.dimensions() == (INPUT_SIZE, INPUT_SIZE) {
            return NormalizedPage(page.clone());
        }
        NormalizedPage(imageops::resize(
            page,
            INPUT_SIZE,
            INPUT_SIZE,
            FilterType::Triangle,
        ))
    }

    pub fn image(&self) -> &RgbImage {
        &self.0
    }
}

/// Run the detector on one normalised page and keep detections above `threshold`.
///
/// Backend failures and out-of-table class indices become
/// [`BlueprintError::InferenceError`] for `page_num`.
pub fn detect_page(
    backend: &dyn DetectionBackend,
    page: &NormalizedPage,
    page_num: usize,
    threshold: f32,
) -> Result<Vec<Detection>, BlueprintError> {
    let rows = backend
        .detect(page.image())
        .map_err(|e| BlueprintError::InferenceError {
            page: page_num,
            detail: format!("{} backend: {}", backend.name(), e),
        })?;

    let detections = filter_detections(&rows, threshold).map_err(|detail| {
        BlueprintError::InferenceError {
            page: page_num,
            detail,
        }
    })?;

    debug!(
        "Page {}: {} raw rows, {} kept",
        page_num,
        rows.len(),
        detections.len()
    );
    Ok(detections)
}
