//! Annotation: draw detections onto a copy of the normalised page.

use super::encode::encode_png;
use super::glyphs;
use super::infer::NormalizedPage;
use crate::detection::{BoundingBox, Detection};
use crate::error::BlueprintError;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

/// Outline thickness in pixels, drawn inward from the box edge.
pub const STROKE_WIDTH: u32 = 3;

/// Distance from the box's top edge up to the caption's top row.
pub const CAPTION_OFFSET: i32 = 10;

/// A page with its overlays, plus the detections that produced them.
#[derive(Debug, Clone)]
pub struct AnnotatedPage {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    pub png: Vec<u8>,
    pub detections: Vec<Detection>,
}

/// Render `detections` onto a copy of `page` and PNG-encode the result.
///
/// The input page is left untouched and the detections pass through unchanged.
pub fn annotate(
    page: &NormalizedPage,
    page_num: usize,
    detections: Vec<Detection>,
) -> Result<AnnotatedPage, BlueprintError> {
    let canvas = draw_detections(page.image(), &detections);
    let png = encode_png(&canvas).map_err(|e| {
        BlueprintError::Internal(format!("PNG encoding of page {page_num} failed: {e}"))
    })?;

    Ok(AnnotatedPage {
        page_num,
        png,
        detections,
    })
}

/// Draw every detection onto a fresh copy of `page`.
pub fn draw_detections(page: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = page.clone();
    for det in detections {
        let color = det.label.color();
        draw_outline(&mut canvas, &det.bbox, color);
        draw_caption(&mut canvas, &det.bbox, &det.caption(), color);
    }
    canvas
}

/// Outline covering pixel columns `x..=x+width` and rows `y..=y+height`,
/// thickened inward. Boxes thinner than the stroke end up solid.
fn draw_outline(canvas: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    for inset in 0..STROKE_WIDTH {
        let w = (bbox.width + 1).saturating_sub(2 * inset);
        let h = (bbox.height + 1).saturating_sub(2 * inset);
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((bbox.x + inset) as i32, (bbox.y + inset) as i32).of_size(w, h);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

fn draw_caption(canvas: &mut RgbImage, bbox: &BoundingBox, caption: &str, color: Rgb<u8>) {
    let top = bbox.y as i32 - CAPTION_OFFSET;
    glyphs::draw_text(canvas, bbox.x as i32, top, caption, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Label, INPUT_SIZE};

    const PAPER: Rgb<u8> = Rgb([255, 255, 255]);

    fn blank() -> NormalizedPage {
        NormalizedPage::from_page(&RgbImage::from_pixel(INPUT_SIZE, INPUT_SIZE, PAPER))
    }

    fn det(label: Label, x: u32, y: u32, w: u32, h: u32) -> Detection {
        Detection {
            label,
            confidence: 0.87,
            bbox: BoundingBox {
                x,
                y,
                width: w,
                height: h,
            },
        }
    }

    #[test]
    fn outline_is_three_pixels_thick() {
        let d = det(Label::Door, 100, 100, 50, 40);
        let out = draw_detections(blank().image(), &[d]);
        let green = Label::Door.color();

        // Left edge, mid-height: three inked columns, then paper.
        for x in 100..103 {
            assert_eq!(*out.get_pixel(x, 120), green, "x={x}");
        }
        assert_eq!(*out.get_pixel(103, 120), PAPER);
        assert_eq!(*out.get_pixel(99, 120), PAPER);

        // Right edge includes x + width.
        assert_eq!(*out.get_pixel(150, 120), green);
        assert_eq!(*out.get_pixel(148, 120), green);
        assert_eq!(*out.get_pixel(147, 120), PAPER);

        // Interior untouched.
        assert_eq!(*out.get_pixel(125, 120), PAPER);
    }

    #[test]
    fn caption_sits_above_the_box_in_label_color() {
        let d = det(Label::Window, 200, 300, 60, 60);
        let out = draw_detections(blank().image(), &[d]);
        let orange = Label::Window.color();

        let caption_pixels = (290..297)
            .flat_map(|y| (200..260).map(move |x| (x, y)))
            .filter(|&(x, y)| *out.get_pixel(x, y) == orange)
            .count();
        assert!(caption_pixels > 0);
    }

    #[test]
    fn source_page_is_not_mutated() {
        let page = blank();
        let before = page.clone();
        let _ = annotate(&page, 1, vec![det(Label::Door, 10, 10, 20, 20)]).unwrap();
        assert_eq!(page, before);
    }

    #[test]
    fn detections_pass_through() {
        let dets = vec![
            det(Label::Door, 0, 0, 10, 10),
            det(Label::Window, 630, 630, 10, 10),
        ];
        let annotated = annotate(&blank(), 3, dets.clone()).unwrap();
        assert_eq!(annotated.detections, dets);
        assert_eq!(annotated.page_num, 3);

        let decoded = image::load_from_memory(&annotated.png).unwrap();
        assert_eq!(decoded.width(), INPUT_SIZE);
        assert_eq!(decoded.height(), INPUT_SIZE);
    }

    #[test]
    fn degenerate_boxes_do_not_panic() {
        let dets = vec![
            det(Label::Door, 0, 0, 0, 0),
            det(Label::Window, 639, 639, 1, 1),
            det(Label::Door, 640, 640, 0, 0),
        ];
        let _ = draw_detections(blank().image(), &dets);
    }

    #[test]
    fn annotation_is_deterministic() {
        let dets = vec![det(Label::Door, 40, 40, 100, 30)];
        let a = annotate(&blank(), 1, dets.clone()).unwrap();
        let b = annotate(&blank(), 1, dets).unwrap();
        assert_eq!(a.png, b.png);
    }
}
