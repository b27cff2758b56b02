// Timbre - Closed percussion table
// Maps every selectable percussion sound to the note its voice is loaded under

use serde::{Deserialize, Serialize};
use std::fmt;

/// Percussion sound a track plays on its on-beats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timbre {
    Cardboard,
    Plastic,
    Wood,
    Metal,
    Glass,
    Shaker,
}

impl Timbre {
    /// Every timbre, in table order
    pub const ALL: [Timbre; 6] = [
        Timbre::Cardboard,
        Timbre::Plastic,
        Timbre::Wood,
        Timbre::Metal,
        Timbre::Glass,
        Timbre::Shaker,
    ];

    /// Default timbre for a new track, cycling through the table by track index
    pub fn round_robin(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    /// Name used in presets and sample file names
    pub fn name(&self) -> &'static str {
        match self {
            Timbre::Cardboard => "cardboard",
            Timbre::Plastic => "plastic",
            Timbre::Wood => "wood",
            Timbre::Metal => "metal",
            Timbre::Glass => "glass",
            Timbre::Shaker => "shaker",
        }
    }

    /// Case-insensitive lookup by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|timbre| timbre.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Table entry for this timbre
    pub fn spec(&self) -> &'static TimbreSpec {
        &TIMBRE_TABLE[*self as usize]
    }

    /// Note number the instrument holds this timbre's voice under
    pub fn note(&self) -> u8 {
        self.spec().note
    }
}

impl fmt::Display for Timbre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed parameters of one timbre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimbreSpec {
    /// Note number (0-127) in the instrument
    pub note: u8,
    /// Pitch of the built-in synthesized click, in Hz
    pub click_frequency: f32,
    /// Exponential decay rate of the synthesized click
    pub click_decay: f32,
    /// Peak amplitude of the synthesized click
    pub click_amplitude: f32,
}

/// Indexed by `Timbre as usize`
const TIMBRE_TABLE: [TimbreSpec; 6] = [
    TimbreSpec { note: 60, click_frequency: 180.0, click_decay: 14.0, click_amplitude: 0.8 },
    TimbreSpec { note: 62, click_frequency: 620.0, click_decay: 18.0, click_amplitude: 0.6 },
    TimbreSpec { note: 64, click_frequency: 950.0, click_decay: 22.0, click_amplitude: 0.6 },
    TimbreSpec { note: 65, click_frequency: 1760.0, click_decay: 6.0, click_amplitude: 0.4 },
    TimbreSpec { note: 67, click_frequency: 2640.0, click_decay: 9.0, click_amplitude: 0.35 },
    TimbreSpec { note: 69, click_frequency: 5200.0, click_decay: 30.0, click_amplitude: 0.3 },
];
