//! Image detection and dimension extraction.

use std::io::Cursor;

use bytes::Bytes;
use image::ImageReader;

use crate::error::UploadError;

/// Extensions treated as raster images.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "ico", "tif", "tiff",
];

/// Reads image headers to find width and height.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageInspector;

impl ImageInspector {
    pub fn new() -> Self {
        Self
    }

    /// Width and height of an encoded image.
    ///
    /// Only the header is decoded. The work runs on the blocking pool because some
    /// formats have to scan a fair amount of data before dimensions are known.
    pub async fn dimensions(&self, data: Bytes) -> Result<(u32, u32), UploadError> {
        let size = data.len();
        let result = tokio::task::spawn_blocking(move || read_dimensions(&data))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Image inspection task failed");
                UploadError::DimensionsNotFound
            })?;

        match result {
            Some((width, height)) if width > 0 && height > 0 => Ok((width, height)),
            _ => {
                tracing::debug!(size_bytes = size, "Could not read image dimensions");
                Err(UploadError::DimensionsNotFound)
            }
        }
    }

    pub fn is_image_extension(extension: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&extension.to_lowercase().as_str())
    }

    /// Canonical extension for the image format the magic bytes announce.
    pub fn sniff_extension(data: &[u8]) -> Option<&'static str> {
        let format = image::guess_format(data).ok()?;
        let extension = format.extensions_str().first().copied()?;
        Self::is_image_extension(extension).then_some(extension)
    }

    /// True when either the extension or the content says "image".
    pub fn is_image(extension: Option<&str>, data: &[u8]) -> bool {
        extension.is_some_and(Self::is_image_extension) || Self::sniff_extension(data).is_some()
    }
}

fn read_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
