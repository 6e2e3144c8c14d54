//! Detection backends behind one contract.
//!
//! A backend takes a 640×640 RGB page and returns raw
//! `[x1, y1, x2, y2, confidence, class_index]` rows in that frame. It does
//! no thresholding and no label lookup; [`crate::detection::filter_detections`]
//! does that for every backend alike.
//!
//! Two runtimes are available, each behind a cargo feature:
//!
//! | Feature        | Backend                         | Model file |
//! |----------------|---------------------------------|------------|
//! | `rten-backend` | [`RtenBackend`] (default)       | `.rten`    |
//! | `ort-backend`  | [`OrtBackend`]                  | `.onnx`    |
//!
//! Backends are loaded once per process by [`load_backend`] and shared
//! read-only across pipeline runs, hence the `Send + Sync` bound.

#[cfg(feature = "ort-backend")]
mod ort_backend;
#[cfg(feature = "rten-backend")]
mod rten_backend;

#[cfg(feature = "ort-backend")]
pub use ort_backend::OrtBackend;
#[cfg(feature = "rten-backend")]
pub use rten_backend::RtenBackend;

use crate::config::{BackendKind, DetectorConfig};
use crate::detection::RawDetection;
use crate::error::BlueprintError;
use image::RgbImage;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Number of values per output row.
pub const ROW_WIDTH: usize = 6;

/// A failure inside a single backend call.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

/// A loaded, immutable object detector.
pub trait DetectionBackend: Send + Sync {
    /// Short runtime name for logs.
    fn name(&self) -> &'static str;

    /// Run the model on one page already resized to the inference frame.
    fn detect(&self, page: &RgbImage) -> Result<Vec<RawDetection>, BackendError>;
}

/// Load the backend described by `config`.
///
/// Any failure here is [`BlueprintError::InferenceUnavailable`]: a host
/// should treat it as fatal at startup.
pub fn load_backend(config: &DetectorConfig) -> Result<Arc<dyn DetectionBackend>, BlueprintError> {
    let path = config.model_path.as_path();
    if !path.is_file() {
        return Err(unavailable(path, "model file not found"));
    }

    let backend = match config.backend {
        BackendKind::Rten => load_rten(path)?,
        BackendKind::Ort => load_ort(path)?,
    };

    info!("Loaded {} detector from {}", backend.name(), path.display());
    Ok(backend)
}

#[cfg(feature = "rten-backend")]
fn load_rten(path: &Path) -> Result<Arc<dyn DetectionBackend>, BlueprintError> {
    Ok(Arc::new(RtenBackend::load(path)?))
}

#[cfg(not(feature = "rten-backend"))]
fn load_rten(path: &Path) -> Result<Arc<dyn DetectionBackend>, BlueprintError> {
    Err(unavailable(path, "built without the `rten-backend` feature"))
}

#[cfg(feature = "ort-backend")]
fn load_ort(path: &Path) -> Result<Arc<dyn DetectionBackend>, BlueprintError> {
    Ok(Arc::new(OrtBackend::load(path)?))
}

#[cfg(not(feature = "ort-backend"))]
fn load_ort(path: &Path) -> Result<Arc<dyn DetectionBackend>, BlueprintError> {
    Err(unavailable(path, "built without the `ort-backend` feature"))
}

pub(crate) fn unavailable(path: &Path, reason: impl Into<String>) -> BlueprintError {
    BlueprintError::InferenceUnavailable {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

// ── Tensor helpers shared by the runtimes ────────────────────────────────

/// Lay out an RGB page as a `[1, 3, H, W]` float tensor scaled to [0, 1].
pub fn to_nchw(page: &RgbImage) -> Vec<f32> {
    let (w, h) = page.dimensions();
    let plane = (w as usize) * (h as usize);
    let mut data = vec![0.0f32; 3 * plane];

    for (x, y, px) in page.enumerate_pixels() {
        let i = y as usize * w as usize + x as usize;
        for c in 0..3 {
            data[c * plane + i] = f32::from(px[c]) / 255.0;
        }
    }

    data
}

/// Split a `[1, N, 6]` (or `[N, 6]`) output tensor into rows.
pub fn decode_rows(shape: &[usize], data: &[f32]) -> Result<Vec<RawDetection>, BackendError> {
    let rows = match *shape {
        [1, n, ROW_WIDTH] | [n, ROW_WIDTH] => n,
        _ => {
            return Err(BackendError(format!(
                "unexpected output shape {:?}, expected [1, N, {}]",
                shape, ROW_WIDTH
            )))
        }
    };

    if data.len() != rows * ROW_WIDTH {
        return Err(BackendError(format!(
            "output holds {} values, shape {:?} needs {}",
            data.len(),
            shape,
            rows * ROW_WIDTH
        )));
    }

    Ok(data
        .chunks_exact(ROW_WIDTH)
        .filter_map(RawDetection::from_row)
        .collect())
}
