use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

use glitchlab_core::buffer::PixelBuffer;
use glitchlab_core::editor::Editor;
use glitchlab_core::CoreError;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tiff::TiffEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::error::{MediaError, Result};

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Output format, chosen explicitly at save time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg {
        quality: u8,
    },
    Bmp,
    Tiff,
}

impl SaveFormat {
    /// Format implied by a file extension, if it names one we write.
    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.to_ascii_lowercase().parse().ok()
    }

    /// Same format with a different JPEG quality. Other formats ignore it.
    pub fn with_quality(self, quality: u8) -> Self {
        match self {
            SaveFormat::Jpeg { .. } => SaveFormat::Jpeg { quality },
            other => other,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg { .. } => "jpg",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tiff => "tiff",
        }
    }
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveFormat::Jpeg { quality } => write!(f, "jpeg (quality {quality})"),
            other => f.write_str(other.extension()),
        }
    }
}

impl FromStr for SaveFormat {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "png" => Ok(SaveFormat::Png),
            "jpeg" | "jpg" => Ok(SaveFormat::Jpeg {
                quality: DEFAULT_JPEG_QUALITY,
            }),
            "bmp" => Ok(SaveFormat::Bmp),
            "tiff" | "tif" => Ok(SaveFormat::Tiff),
            other => Err(MediaError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Encode `buffer` to `path` in `format`. An existing file is overwritten.
///
/// Nothing is written when the format is rejected up front. A file left
/// half-written by a failed encode is removed.
#[tracing::instrument(
    level = "debug",
    skip(buffer),
    fields(width = buffer.width(), height = buffer.height())
)]
pub fn save_image(buffer: &PixelBuffer, path: &Path, format: SaveFormat) -> Result<()> {
    if buffer.is_empty() {
        return Err(MediaError::EncodeError("cannot encode an empty image".into()));
    }
    if let SaveFormat::Jpeg { quality } = format {
        if !(1..=100).contains(&quality) {
            return Err(MediaError::EncodeError(format!(
                "jpeg quality {quality} is outside 1-100"
            )));
        }
    }

    let file = File::create(path)?;
    if let Err(e) = encode(buffer, BufWriter::new(file), format) {
        if let Err(cleanup) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), %cleanup, "could not remove partial file");
        }
        return Err(e);
    }
    tracing::info!(path = %path.display(), %format, "image saved");
    Ok(())
}

fn encode(buffer: &PixelBuffer, mut writer: BufWriter<File>, format: SaveFormat) -> Result<()> {
    let (data, width, height) = (buffer.as_raw(), buffer.width(), buffer.height());
    let color = ExtendedColorType::Rgb8;

    match format {
        SaveFormat::Png => PngEncoder::new(&mut writer).write_image(data, width, height, color)?,
        SaveFormat::Jpeg { quality } => JpegEncoder::new_with_quality(&mut writer, quality)
            .write_image(data, width, height, color)?,
        SaveFormat::Bmp => BmpEncoder::new(&mut writer).write_image(data, width, height, color)?,
        SaveFormat::Tiff => TiffEncoder::new(&mut writer).write_image(data, width, height, color)?,
    }

    writer
        .into_inner()
        .map_err(|e| MediaError::Io(e.into_error()))?;
    Ok(())
}

/// Save the editor's current buffer. The editor itself is not touched.
pub fn save_current(editor: &Editor, path: &Path, format: SaveFormat) -> Result<()> {
    let current = editor.current().ok_or(CoreError::NoImageLoaded)?;
    save_image(current, path, format)
}
