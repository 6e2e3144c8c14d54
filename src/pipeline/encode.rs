//! Image encoding: annotated pages → PNG bytes.
//!
//! PNG keeps the one-pixel label glyphs and thin outlines exact; JPEG ringing
//! would smear them. Encoding is deterministic, so identical inputs give
//! byte-identical pages.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Encode an RGB page as PNG.
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    debug!("Encoded {}x{} page → {} bytes PNG", img.width(), img.height(), buf.len());
    Ok(buf)
}

/// Wrap PNG bytes as a `data:` URI.
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn encode_small_image() {
        let img = RgbImage::from_pixel(10, 10, Rgb([255, 0, 0]));
        let png = encode_png(&img).expect("encode should succeed");
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
        let back = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(back, img);
    }

    #[test]
    fn data_uri_round_trips() {
        let uri = png_data_uri(&[1, 2, 3]);
        let b64 = uri.strip_prefix("data:image/png;base64,").unwrap();
        assert_eq!(STANDARD.decode(b64).unwrap(), vec![1, 2, 3]);
    }
}
