//! Detection data model: labels, boxes, and the backend-agnostic filter.
//!
//! Backends only produce [`RawDetection`] rows in the 640×640 input frame.
//! Turning a row into a [`Detection`] (threshold, class lookup, corner to
//! `(x, y, width, height)` conversion) happens here, identically for every
//! backend.

use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side length of the square frame every page is resized to before inference.
///
/// All bounding boxes are expressed in this frame.
pub const INPUT_SIZE: u32 = 640;

/// Detections must score strictly above this to be kept.
pub const CONFIDENCE_THRESHOLD: f32 = 0.30;

/// The two object classes the detector was trained on.
///
/// The set is closed: class indices map through [`Label::from_index`] and
/// anything outside the table is rejected rather than guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Door,
    Window,
}

impl Label {
    /// Every label, in class-index order.
    pub const ALL: [Label; 2] = [Label::Door, Label::Window];

    /// Map a model class index to a label.
    pub fn from_index(index: usize) -> Option<Label> {
        Label::ALL.get(index).copied()
    }

    /// Model class index of this label.
    pub fn index(self) -> usize {
        match self {
            Label::Door => 0,
            Label::Window => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Door => "door",
            Label::Window => "window",
        }
    }

    /// Overlay color: door `#10B981`, window `#F97316`.
    pub fn color(self) -> Rgb<u8> {
        match self {
            Label::Door => Rgb([0x10, 0xB9, 0x81]),
            Label::Window => Rgb([0xF9, 0x73, 0x16]),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned box in the 640×640 frame, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Build a box from corner coordinates, clamped to the input frame.
    ///
    /// The origin is the near corner truncated toward zero; the extent is
    /// the corner difference truncated toward zero, capped so that
    /// `x + width <= INPUT_SIZE` and never negative.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let clamp = |v: f32| -> f32 {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(0.0, INPUT_SIZE as f32)
            }
        };
        let extent = |near: f32, far: f32, origin: u32| -> u32 {
            ((far - near).max(0.0) as u32).min(INPUT_SIZE - origin)
        };
        let (x1, y1, x2, y2) = (clamp(x1), clamp(y1), clamp(x2), clamp(y2));
        let (x, y) = (x1 as u32, y1 as u32);
        BoundingBox {
            x,
            y,
            width: extent(x1, x2, x),
            height: extent(y1, y2, y),
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// One output row of a detection backend, before filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_index: f32,
}

impl RawDetection {
    /// Read a row laid out as `[x1, y1, x2, y2, confidence, class_index]`.
    pub fn from_row(row: &[f32]) -> Option<Self> {
        match *row {
            [x1, y1, x2, y2, confidence, class_index] => Some(RawDetection {
                x1,
                y1,
                x2,
                y2,
                confidence,
                class_index,
            }),
            _ => None,
        }
    }
}

/// A labelled, scored box that survived the confidence filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: Label,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    /// Caption drawn above the box, e.g. `door 0.87`.
    pub fn caption(&self) -> String {
        format!("{} {:.2}", self.label, self.confidence)
    }
}

/// Turn backend rows into detections.
///
/// Rows scoring at or below `threshold` are dropped (NaN never passes);
/// the surviving rows keep their backend order. A surviving row whose class
/// index falls outside the label table is an error, not a silent drop.
pub fn filter_detections(rows: &[RawDetection], threshold: f32) -> Result<Vec<Detection>, String> {
    let mut detections = Vec::with_capacity(rows.len());

    for row in rows {
        if row.confidence.is_nan() || row.confidence <= threshold {
            continue;
        }

        let label = class_label(row.class_index)
            .ok_or_else(|| format!("class index {} is outside the label table", row.class_index))?;

        detections.push(Detection {
            label,
            confidence: row.confidence,
            bbox: BoundingBox::from_corners(row.x1, row.y1, row.x2, row.y2),
        });
    }

    Ok(detections)
}

fn class_label(class_index: f32) -> Option<Label> {
    if !class_index.is_finite() || class_index < 0.0 {
        return None;
    }
    Label::from_index(class_index.trunc() as usize)
}
