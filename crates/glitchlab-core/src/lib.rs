pub mod buffer;
pub mod commands;
pub mod editor;
pub mod effects;
pub mod error;
pub mod pipeline;
pub mod waveform;

pub use buffer::{Axis, Channel, PixelBuffer, Plane, Region, Selection};
pub use commands::{EffectHistory, HistoryEntry, SnapshotPolicy};
pub use editor::{Editor, EditorSettings, EditorState};
pub use effects::{
    EffectRecord, EffectType, ParameterDefinition, ParameterType, ParameterValue, Parameters,
};
pub use error::{CoreError, Result};
pub use pipeline::{EffectContext, EffectRegistry, PixelEffect};
