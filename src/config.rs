// Config - Engine settings stored as RON
// Every field has a default so partial files are accepted

use crate::sequencer::state::{Limits, RosterEntry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub limits: Limits,
    /// Tracks present at startup
    pub roster: Vec<RosterEntry>,
    /// Directory holding `<timbre>.wav` files or a `bank.json`
    pub samples_dir: Option<PathBuf>,
    /// Output gain (0.0 - 1.0)
    pub master_volume: f32,
    /// Sample rate used when no audio device decides it
    pub fallback_sample_rate: u32,
    /// Capacity of the step event channel
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            roster: RosterEntry::default_roster(),
            samples_dir: None,
            master_volume: 0.8,
            fallback_sample_rate: 48_000,
            event_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Default config location: `<config dir>/polyrhythm/config.ron`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("polyrhythm").join("config.ron"))
    }

    /// Loads and validates a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = ron::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the default config file, falling back to defaults when it is
    /// missing or unreadable
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Writes the config, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Rejects settings the engine cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        if limits.max_tracks == 0 {
            return Err(ConfigError::Invalid("max_tracks must be at least 1".to_string()));
        }
        if limits.max_beat_number == 0 {
            return Err(ConfigError::Invalid("max_beat_number must be at least 1".to_string()));
        }
        if limits.min_tempo == 0 || limits.min_tempo > limits.max_tempo {
            return Err(ConfigError::Invalid(format!(
                "tempo range {}..={} is empty",
                limits.min_tempo, limits.max_tempo
            )));
        }
        if limits.default_beat_number == 0 || limits.default_beat_number > limits.max_beat_number {
            return Err(ConfigError::Invalid(format!(
                "default_beat_number {} outside 1..={}",
                limits.default_beat_number, limits.max_beat_number
            )));
        }
        if limits.max_cycle_length < limits.max_beat_number as usize {
            return Err(ConfigError::Invalid(
                "max_cycle_length must fit at least one track".to_string(),
            ));
        }
        if self.fallback_sample_rate == 0 {
            return Err(ConfigError::Invalid("fallback_sample_rate must be positive".to_string()));
        }
        Ok(())
    }
}
