// Sampler module - Percussion timbres, sample loading and playback

pub mod bank;
pub mod instrument;
pub mod loader;
pub mod timbre;
pub mod trigger;
pub mod voice;

pub use bank::{SampleBank, SampleMapping};
pub use instrument::{Instrument, SamplerInstrument};
pub use loader::{Sample, load_sample, synthesize_click};
pub use timbre::Timbre;
pub use trigger::SampleTrigger;

use std::path::PathBuf;

/// Sample loading errors
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Sample bank error: {0}")]
    Bank(#[from] serde_json::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Samples directory not found: {0}")]
    MissingDirectory(PathBuf),
}
