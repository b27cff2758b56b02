// Preset module - Share strings and built-in presets

pub mod library;
pub mod serialization;
pub mod types;

pub use library::{builtin_presets, find_builtin};
pub use serialization::{normalize, parse_preset, share_string, to_preset};
pub use types::{BeatData, PresetData, TrackData};

/// Preset errors
///
/// Only surfaced by the parsing helpers. Loading through the engine turns
/// every one of them into a logged no-op.
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("Preset is empty")]
    Empty,

    #[error("Preset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Preset must be a JSON object")]
    NotAnObject,

    #[error("Preset meters exceed the maximum cycle length of {0} steps")]
    CycleTooLong(usize),
}
