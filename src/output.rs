//! Output types of a pipeline run.

use crate::detection::{Detection, Label};
use crate::pipeline::encode;
use serde::{Deserialize, Serialize};

/// Per-label detection totals for one document.
///
/// Both labels are always present; a document without detections reports
/// zero for each rather than omitting a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub door: usize,
    pub window: usize,
}

impl Counts {
    pub fn get(&self, label: Label) -> usize {
        match label {
            Label::Door => self.door,
            Label::Window => self.window,
        }
    }

    pub fn increment(&mut self, label: Label) {
        match label {
            Label::Door => self.door += 1,
            Label::Window => self.window += 1,
        }
    }

    /// Sum over all labels.
    pub fn total(&self) -> usize {
        self.door + self.window
    }

    /// `(label, count)` pairs in class-index order.
    pub fn iter(&self) -> impl Iterator<Item = (Label, usize)> + '_ {
        Label::ALL.into_iter().map(|l| (l, self.get(l)))
    }
}

/// Result for one annotated page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    /// 1-indexed page number in the original document.
    pub page_num: usize,

    /// Retained detections, in the frame of the 640×640 annotated image.
    pub detections: Vec<Detection>,

    /// The annotated page, PNG-encoded.
    #[serde(skip)]
    pub annotated_png: Vec<u8>,
}

/// Timing and volume statistics of one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub total_pages: usize,
    pub total_detections: usize,
    pub render_duration_ms: u64,
    pub inference_duration_ms: u64,
    pub compose_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a pipeline run hands back to its caller.
///
/// The core never writes files: persisting the preview and delivering the
/// report are the caller's job (see [`crate::dispatch`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOutput {
    pub counts: Counts,
    pub pages: Vec<PageSummary>,

    /// The first annotated page, PNG-encoded.
    #[serde(skip)]
    pub preview_png: Vec<u8>,

    /// The composed multi-page PDF report.
    #[serde(skip)]
    pub report_pdf: Vec<u8>,

    pub stats: ProcessingStats,
}

impl ProcessingOutput {
    /// The preview as a `data:image/png;base64,…` URI, ready to embed in HTML.
    pub fn preview_data_uri(&self) -> String {
        encode::png_data_uri(&self.preview_png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_counts_keep_both_keys() {
        let json = serde_json::to_value(Counts::default()).unwrap();
        assert_eq!(json, serde_json::json!({ "door": 0, "window": 0 }));
    }

    #[test]
    fn increment_and_total() {
        let mut c = Counts::default();
        c.increment(Label::Door);
        c.increment(Label::Window);
        c.increment(Label::Window);
        assert_eq!(c.get(Label::Door), 1);
        assert_eq!(c.get(Label::Window), 2);
        assert_eq!(c.total(), 3);
        assert_eq!(
            c.iter().collect::<Vec<_>>(),
            vec![(Label::Door, 1), (Label::Window, 2)]
        );
    }
}
