//! Configuration types for a detection-to-report run.
//!
//! Per-run behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. The detector itself is described separately by
//! [`DetectorConfig`] because it is loaded once per process, not once per
//! document.
//!
//! The 640×640 inference frame and the label table are not configurable;
//! see [`crate::detection`].

use crate::detection::CONFIDENCE_THRESHOLD;
use crate::error::BlueprintError;
use crate::progress::PipelineProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default DPI for rasterising paged documents.
pub const DEFAULT_DPI: u32 = 150;

/// Default report title printed on the summary page.
pub const DEFAULT_REPORT_TITLE: &str = "Blueprint Detection Report";

/// Configuration for one pipeline run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use blueprint_report::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .dpi(200)
///     .report_title("Level 2 plan")
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Rendering DPI for paged documents. Range: 72–400. Default: 150.
    ///
    /// Pages are resized to the 640×640 frame afterwards, so higher values
    /// mostly cost time; 150 keeps thin wall lines visible after the resize.
    pub dpi: u32,

    /// Minimum score (exclusive) a detection needs to be kept. Default: 0.30.
    pub confidence_threshold: f32,

    /// Title line on the report's summary page.
    pub report_title: String,

    /// Optional per-page progress events.
    pub progress_callback: Option<Arc<dyn PipelineProgressCallback>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            confidence_threshold: CONFIDENCE_THRESHOLD,
            report_title: DEFAULT_REPORT_TITLE.to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("dpi", &self.dpi)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("report_title", &self.report_title)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    pub fn report_title(mut self, title: impl Into<String>) -> Self {
        self.config.report_title = title.into();
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn PipelineProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, BlueprintError> {
        let c = &self.config;
        if !(0.0..=1.0).contains(&c.confidence_threshold) {
            return Err(BlueprintError::InvalidConfig(format!(
                "confidence threshold must be within 0–1, got {}",
                c.confidence_threshold
            )));
        }
        if c.report_title.trim().is_empty() {
            return Err(BlueprintError::InvalidConfig(
                "report title must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Detector ─────────────────────────────────────────────────────────────

/// Which detection runtime executes the model.
///
/// Both variants honour the same contract (640×640 RGB in, raw
/// `[x1, y1, x2, y2, confidence, class]` rows out); only the runtime differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Pure-Rust tensor runtime, `.rten` model files. (default)
    #[default]
    Rten,
    /// ONNX Runtime session, `.onnx` model files exported with NMS.
    Ort,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Rten => f.write_str("rten"),
            BackendKind::Ort => f.write_str("ort"),
        }
    }
}

/// Where the detector's weights live and which runtime loads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub backend: BackendKind,
    pub model_path: PathBuf,
}

impl DetectorConfig {
    pub fn new(backend: BackendKind, model_path: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            model_path: model_path.into(),
        }
    }
}
