use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to open file: {0}")]
    OpenFailed(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("encode error: {0}")]
    EncodeError(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Core(#[from] glitchlab_core::CoreError),
}

pub type Result<T> = std::result::Result<T, MediaError>;
