use std::io::Cursor;
use std::path::Path;

use glitchlab_core::buffer::PixelBuffer;
use image::{DynamicImage, ImageReader};

use crate::error::{MediaError, Result};

/// Load an image file into the 3-channel model. Alpha is dropped, grayscale
/// is expanded and deeper samples are reduced to 8 bits.
#[tracing::instrument(level = "debug")]
pub fn load_image(path: &Path) -> Result<PixelBuffer> {
    let reader = ImageReader::open(path)
        .map_err(|e| MediaError::OpenFailed(format!("{}: {e}", path.display())))?
        .with_guessed_format()?;
    if reader.format().is_none() {
        return Err(MediaError::UnsupportedFormat(path.display().to_string()));
    }
    let image = reader
        .decode()
        .map_err(|e| MediaError::DecodeError(format!("{}: {e}", path.display())))?;
    into_buffer(image)
}

/// Decode an in-memory encoded image. The format is sniffed from the bytes.
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    if reader.format().is_none() {
        return Err(MediaError::UnsupportedFormat(
            "unrecognized image data".into(),
        ));
    }
    let image = reader
        .decode()
        .map_err(|e| MediaError::DecodeError(e.to_string()))?;
    into_buffer(image)
}

fn into_buffer(image: DynamicImage) -> Result<PixelBuffer> {
    let rgb = image.into_rgb8();
    let (width, height) = rgb.dimensions();
    tracing::debug!(width, height, "decoded image");
    Ok(PixelBuffer::from_rgb_vec(width, height, rgb.into_raw())?)
}
