//! Test fixtures: encoded images and non-image blobs.

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// PNG of the given size. The pixel pattern depends on the size so different sizes
/// hash differently.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 40) as u8, (y * 40) as u8, (width + height) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .expect("Failed to encode PNG");
    out.into_inner()
}

pub fn text_file() -> Vec<u8> {
    b"plain text attachment\n".to_vec()
}
