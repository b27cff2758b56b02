use super::SamplerError;
use super::loader::{Sample, load_sample};
use super::timbre::Timbre;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name of a bank inside a samples directory
pub const BANK_FILE_NAME: &str = "bank.json";

/// Serializable sample bank: which file plays for which timbre
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleBank {
    pub name: String,
    pub version: String,
    pub samples: Vec<SampleMapping>,
}

/// Mapping from a timbre to a sample file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMapping {
    pub timbre: Timbre,
    /// Path to the sample file, relative to the bank directory
    pub sample_path: PathBuf,
    /// Volume multiplier
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_volume() -> f32 {
    1.0
}

impl SampleBank {
    /// Create a new empty sample bank
    pub fn new(name: String) -> Self {
        Self {
            name,
            version: "1.0".to_string(),
            samples: Vec::new(),
        }
    }

    /// Adds a mapping, replacing any previous one for the same timbre
    pub fn add_mapping(&mut self, mapping: SampleMapping) {
        self.samples.retain(|m| m.timbre != mapping.timbre);
        self.samples.push(mapping);
    }

    pub fn get_mapping(&self, timbre: Timbre) -> Option<&SampleMapping> {
        self.samples.iter().find(|m| m.timbre == timbre)
    }

    pub fn remove_mapping(&mut self, timbre: Timbre) -> bool {
        let initial_len = self.samples.len();
        self.samples.retain(|m| m.timbre != timbre);
        self.samples.len() < initial_len
    }

    /// Save bank to JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SamplerError> {
        let json_str = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json_str)?;
        Ok(())
    }

    /// Load bank from JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SamplerError> {
        let json_str = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json_str)?)
    }

    /// Builds a bank from the WAV files found under `dir`
    ///
    /// A file is picked up when its stem is a timbre name (`wood.wav`,
    /// `kit/Metal.wav`). The first match in path order wins.
    pub fn scan_directory(dir: &Path) -> Self {
        let mut bank = Self::new(
            dir.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
        );

        let mut entries: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
            })
            .collect();
        entries.sort();

        for path in entries {
            let Some(timbre) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(Timbre::from_name)
            else {
                continue;
            };
            if bank.get_mapping(timbre).is_some() {
                continue;
            }
            let relative = path.strip_prefix(dir).unwrap_or(&path).to_path_buf();
            bank.add_mapping(SampleMapping {
                timbre,
                sample_path: relative,
                volume: 1.0,
            });
        }

        bank
    }

    /// Opens the bank of a samples directory
    /// Uses `bank.json` when present, otherwise scans for `<timbre>.wav` files
    pub fn open_directory(dir: &Path) -> Result<Self, SamplerError> {
        let bank_file = dir.join(BANK_FILE_NAME);
        if bank_file.is_file() {
            Self::load_from_file(bank_file)
        } else if dir.is_dir() {
            Ok(Self::scan_directory(dir))
        } else {
            Err(SamplerError::MissingDirectory(dir.to_path_buf()))
        }
    }

    /// Loads every mapped sample
    ///
    /// Files that fail to load are logged and skipped; their timbre keeps
    /// whatever voice it had before.
    pub fn load_samples(&self, base_dir: &Path) -> Vec<(Timbre, Sample)> {
        let mut loaded = Vec::with_capacity(self.samples.len());
        for mapping in &self.samples {
            let path = base_dir.join(&mapping.sample_path);
            match load_sample(&path) {
                Ok(mut sample) => {
                    sample.volume = mapping.volume;
                    loaded.push((mapping.timbre, sample));
                }
                Err(e) => log::warn!("Skipping {} sample {}: {}", mapping.timbre, path.display(), e),
            }
        }
        loaded
    }
}
