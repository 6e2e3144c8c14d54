//! Pure-Rust tensor runtime backend (`rten`).
//!
//! The page is normalised by hand into a `[1, 3, 640, 640]` tensor and the
//! model's single output is decoded row by row.

use super::{decode_rows, to_nchw, unavailable, BackendError, DetectionBackend};
use crate::detection::RawDetection;
use crate::error::BlueprintError;
use image::RgbImage;
use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::{NdTensor, Tensor};
use std::path::Path;
use tracing::debug;

/// A `.rten` model loaded into memory.
pub struct RtenBackend {
    model: Model,
}

impl RtenBackend {
    pub fn load(path: &Path) -> Result<Self, BlueprintError> {
        let model = Model::load_file(path).map_err(|e| unavailable(path, e.to_string()))?;
        Ok(Self { model })
    }
}

impl DetectionBackend for RtenBackend {
    fn name(&self) -> &'static str {
        "rten"
    }

    fn detect(&self, page: &RgbImage) -> Result<Vec<RawDetection>, BackendError> {
        let (w, h) = page.dimensions();
        let input = NdTensor::from_data([1, 3, h as usize, w as usize], to_nchw(page));

        let output = self
            .model
            .run_one(input.view().into(), None)
            .map_err(|e| BackendError(format!("model run failed: {e}")))?;

        let output: Tensor<f32> = output
            .try_into()
            .map_err(|e| BackendError(format!("output is not a float tensor: {e:?}")))?;

        let shape = output.shape().to_vec();
        let data: Vec<f32> = output.iter().copied().collect();
        debug!("rten output shape {:?}", shape);

        decode_rows(&shape, &data)
    }
}
