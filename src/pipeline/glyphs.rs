//! Built-in 5×7 bitmap glyphs for annotation captions.
//!
//! Captions come from a closed alphabet (`door`, `window`, a space, digits
//! and a decimal point), so a tiny fixed bitmap font covers them completely
//! and keeps annotated pages byte-for-byte reproducible without any font
//! file on disk. Characters outside the set advance the pen but draw nothing.

use image::{Rgb, RgbImage};

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: usize = 7;

/// Horizontal distance between the left edges of consecutive glyphs.
const ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Row bitmaps, top row first; bit 4 is the leftmost column.
fn glyph(c: char) -> Option<[u8; GLYPH_HEIGHT]> {
    let rows = match c {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        'd' => [0x01, 0x01, 0x0D, 0x13, 0x11, 0x11, 0x0F],
        'i' => [0x04, 0x00, 0x0C, 0x04, 0x04, 0x04, 0x0E],
        'n' => [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11],
        'o' => [0x00, 0x00, 0x0E, 0x11, 0x11, 0x11, 0x0E],
        'r' => [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10],
        'w' => [0x00, 0x00, 0x11, 0x11, 0x15, 0x15, 0x0A],
        _ => return None,
    };
    Some(rows)
}

/// Draw `text` with its top-left corner at `(x, y)`, clipping at the edges.
pub fn draw_text(img: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
    let (w, h) = (img.width() as i64, img.height() as i64);

    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else { continue };
        let left = x as i64 + i as i64 * ADVANCE as i64;

        for (row, bits) in rows.iter().enumerate() {
            let py = y as i64 + row as i64;
            if !(0..h).contains(&py) {
                continue;
            }
            for col in 0..GLYPH_WIDTH {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                let px = left + col as i64;
                if (0..w).contains(&px) {
                    img.put_pixel(px as u32, py as u32, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INK: Rgb<u8> = Rgb([255, 0, 0]);

    fn inked(img: &RgbImage) -> usize {
        img.pixels().filter(|p| **p == INK).count()
    }

    #[test]
    fn caption_alphabet_is_covered() {
        for c in "door window 0123456789.".chars().filter(|c| *c != ' ') {
            assert!(glyph(c).is_some(), "missing glyph for {c:?}");
        }
    }

    #[test]
    fn drawing_stays_inside_its_cell() {
        let mut img = RgbImage::new(40, 20);
        draw_text(&mut img, 2, 3, "10", INK);
        for (x, y, p) in img.enumerate_pixels() {
            if *p == INK {
                assert!((2..2 + 11).contains(&x), "x={x}");
                assert!((3..3 + 7).contains(&y), "y={y}");
            }
        }
        assert!(inked(&img) > 0);
    }

    #[test]
    fn text_is_clipped_at_edges() {
        let mut img = RgbImage::new(8, 8);
        draw_text(&mut img, -3, -4, "window 0.99", INK);
        draw_text(&mut img, 6, 6, "8", INK);
        assert!(inked(&img) > 0);
    }

    #[test]
    fn unknown_characters_draw_nothing() {
        let mut img = RgbImage::new(20, 10);
        draw_text(&mut img, 0, 0, "?%X", INK);
        assert_eq!(inked(&img), 0);
    }
}
