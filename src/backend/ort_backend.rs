//! ONNX Runtime backend (`ort`).
//!
//! Expects a model exported end-to-end (NMS inside the graph) so the session
//! returns final boxes as `[1, N, 6]` rows. A session run needs exclusive
//! access, so concurrent pipeline runs take turns on the mutex.

use super::{decode_rows, to_nchw, unavailable, BackendError, DetectionBackend};
use crate::detection::RawDetection;
use crate::error::BlueprintError;
use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// An ONNX Runtime session over a `.onnx` model.
pub struct OrtBackend {
    session: Mutex<Session>,
}

impl OrtBackend {
    pub fn load(path: &Path) -> Result<Self, BlueprintError> {
        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|e| unavailable(path, e.to_string()))?;
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl DetectionBackend for OrtBackend {
    fn name(&self) -> &'static str {
        "ort"
    }

    fn detect(&self, page: &RgbImage) -> Result<Vec<RawDetection>, BackendError> {
        let (w, h) = page.dimensions();
        let input = Tensor::from_array(([1usize, 3, h as usize, w as usize], to_nchw(page)))
            .map_err(|e| BackendError(format!("cannot build input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| BackendError("session mutex poisoned".into()))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| BackendError(format!("session run failed: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| BackendError(format!("output is not a float tensor: {e}")))?;

        let shape: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        debug!("ort output shape {:?}", shape);

        decode_rows(&shape, data)
    }
}
