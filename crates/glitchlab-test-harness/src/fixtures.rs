use std::path::{Path, PathBuf};

use glitchlab_core::buffer::PixelBuffer;
use image::RgbImage;

/// Write `buffer` as a PNG named `{name}.png` under `output_dir`.
pub fn write_test_png(output_dir: &Path, name: &str, buffer: &PixelBuffer) -> PathBuf {
    let output_path = output_dir.join(format!("{name}.png"));
    let image = RgbImage::from_raw(buffer.width(), buffer.height(), buffer.as_raw().to_vec())
        .expect("buffer length matches its dimensions");
    image
        .save(&output_path)
        .expect("failed to write test image");
    assert!(output_path.exists(), "test image was not created: {name}");
    output_path
}

/// Write an RGBA PNG, for exercising the alpha-dropping load path.
pub fn write_test_rgba_png(output_dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let output_path = output_dir.join(format!("{name}.png"));
    let image = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 20) as u8, (y * 20) as u8, 90, 128])
    });
    image
        .save(&output_path)
        .expect("failed to write test image");
    output_path
}

/// Get a temporary directory for test fixtures that persists for the test run.
pub fn fixture_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}
