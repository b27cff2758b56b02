// Timeline - Tempo and step grid
// Converts BPM and note values into seconds and samples

use std::fmt;

/// Note value relative to a quarter-note beat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subdivision {
    Quarter,
    Eighth,
    Sixteenth,
}

impl Subdivision {
    /// Grid every track step sits on
    pub const STEP: Subdivision = Subdivision::Eighth;

    /// Notes of this value per quarter-note beat
    pub fn per_beat(&self) -> u32 {
        match self {
            Subdivision::Quarter => 1,
            Subdivision::Eighth => 2,
            Subdivision::Sixteenth => 4,
        }
    }
}

impl Default for Subdivision {
    fn default() -> Self {
        Subdivision::STEP
    }
}

impl fmt::Display for Subdivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.per_beat() * 4;
        write!(f, "{}n", n)
    }
}

/// Tempo in BPM (quarter notes per minute)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tempo {
    bpm: u32,
}

impl Tempo {
    /// Creates a tempo, zero is raised to 1 BPM
    pub fn new(bpm: u32) -> Self {
        Self { bpm: bpm.max(1) }
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Duration of one quarter-note beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm as f64
    }

    /// Duration of one note of the given value in seconds
    pub fn note_duration_seconds(&self, subdivision: Subdivision) -> f64 {
        self.beat_duration_seconds() / subdivision.per_beat() as f64
    }

    /// Duration of one note of the given value in samples
    pub fn note_duration_samples(&self, subdivision: Subdivision, sample_rate: f64) -> f64 {
        self.note_duration_seconds(subdivision) * sample_rate
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(120)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.bpm)
    }
}
