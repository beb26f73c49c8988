use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid parameter `{name}` for {effect}: {reason}")]
    InvalidParameter {
        effect: String,
        name: String,
        reason: String,
    },

    #[error("unsupported {kind}: {name}")]
    UnsupportedVariant { kind: &'static str, name: String },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("no image loaded")]
    NoImageLoaded,

    #[error("RGB data length {actual} doesn't match {width}x{height}x3")]
    BufferSizeMismatch {
        width: u32,
        height: u32,
        actual: usize,
    },

    #[error("effect record not found: {0}")]
    RecordNotFound(Uuid),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn invalid_parameter(
        effect: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CoreError::InvalidParameter {
            effect: effect.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(kind: &'static str, name: impl Into<String>) -> Self {
        CoreError::UnsupportedVariant {
            kind,
            name: name.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
