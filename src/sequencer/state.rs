// State - Aggregate sequencer state
// Immutable snapshot shared between the edit side and the clock

use super::lcm;
use super::track::Track;
use crate::sampler::timbre::Timbre;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configurable bounds of the sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_tracks: usize,
    pub max_beat_number: u32,
    pub min_tempo: u32,
    pub max_tempo: u32,
    pub default_tempo: u32,
    pub default_beat_number: u32,
    /// Largest cycle a combination of meters may produce
    pub max_cycle_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_tracks: 4,
            max_beat_number: 64,
            min_tempo: 30,
            max_tempo: 400,
            default_tempo: 120,
            default_beat_number: 4,
            max_cycle_length: 1 << 20,
        }
    }
}

impl Limits {
    pub fn clamp_tempo(&self, bpm: u32) -> u32 {
        bpm.clamp(self.min_tempo, self.max_tempo)
    }

    /// Clamps a beat number into range, `None` for zero
    pub fn clamp_beat_number(&self, beat_number: u32) -> Option<u32> {
        (beat_number > 0).then(|| beat_number.min(self.max_beat_number))
    }
}

/// One track of the starting roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub beat_number: u32,
    pub active: bool,
}

impl RosterEntry {
    pub fn new(beat_number: u32, active: bool) -> Self {
        Self {
            beat_number,
            active,
        }
    }

    /// Four tracks (4, 3, 4, 3), first two active
    pub fn default_roster() -> Vec<RosterEntry> {
        vec![
            Self::new(4, true),
            Self::new(3, true),
            Self::new(4, false),
            Self::new(3, false),
        ]
    }
}

/// Complete sequencer state
///
/// Tracks sit behind an `Arc` so a step advance only copies the header.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyrhythmState {
    pub tracks: Arc<Vec<Track>>,
    pub current_beat: usize,
    pub lcm: usize,
    pub tempo: u32,
    /// Bumped every time the position rewinds to a fresh cycle
    pub generation: u64,
    pub limits: Limits,
}

impl PolyrhythmState {
    /// Builds a state from a roster, truncated to `max_tracks`
    ///
    /// Entries whose meters would exceed the cycle limit are added inactive.
    pub fn with_roster(limits: Limits, roster: &[RosterEntry]) -> Self {
        let mut tracks: Vec<Track> = Vec::with_capacity(limits.max_tracks);
        for (index, entry) in roster.iter().take(limits.max_tracks).enumerate() {
            let beat_number = limits
                .clamp_beat_number(entry.beat_number)
                .unwrap_or(limits.default_beat_number);
            tracks.push(Track::new(index, beat_number, entry.active, Timbre::round_robin(index)));
            if entry.active && lcm::active_cycle_length(&tracks, limits.max_cycle_length).is_none() {
                if let Some(track) = tracks.last_mut() {
                    track.is_active = false;
                }
            }
        }

        let cycle = lcm::active_cycle_length(&tracks, limits.max_cycle_length).unwrap_or(1);
        lcm::rebuild(&mut tracks, cycle);

        let state = Self {
            tracks: Arc::new(tracks),
            current_beat: 0,
            lcm: cycle,
            tempo: limits.clamp_tempo(limits.default_tempo),
            generation: 0,
            limits,
        };
        state.debug_assert_invariants();
        state
    }

    /// State with the default four-track roster
    pub fn new(limits: Limits) -> Self {
        Self::with_roster(limits, &RosterEntry::default_roster())
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn active_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.is_active)
    }

    /// Tracks that sound at `step`
    pub fn sounding_at(&self, step: usize) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(move |t| t.sounds_at(step))
    }

    /// Checks every structural invariant, returning the first violation
    pub fn check_invariants(&self) -> Result<(), String> {
        let expected = lcm::active_cycle_length(&self.tracks, usize::MAX)
            .ok_or_else(|| "cycle length overflow".to_string())?;
        if self.lcm != expected {
            return Err(format!("lcm is {} but active meters give {}", self.lcm, expected));
        }
        if self.lcm > self.limits.max_cycle_length {
            return Err(format!("lcm {} above limit", self.lcm));
        }
        if self.tracks.len() > self.limits.max_tracks {
            return Err(format!("{} tracks above limit", self.tracks.len()));
        }
        if self.current_beat >= self.lcm {
            return Err(format!("current beat {} outside cycle {}", self.current_beat, self.lcm));
        }
        for track in self.tracks.iter() {
            if track.beats.len() != self.lcm {
                return Err(format!(
                    "track {} has {} beats, cycle is {}",
                    track.index,
                    track.beats.len(),
                    self.lcm
                ));
            }
            if track.beat_number == 0 || track.beat_number > self.limits.max_beat_number {
                return Err(format!("track {} beat number {}", track.index, track.beat_number));
            }
        }
        if !(self.limits.min_tempo..=self.limits.max_tempo).contains(&self.tempo) {
            return Err(format!("tempo {} outside range", self.tempo));
        }
        Ok(())
    }

    /// Equality that compares a shared track list by pointer first
    pub(crate) fn same_as(&self, other: &Self) -> bool {
        self.current_beat == other.current_beat
            && self.lcm == other.lcm
            && self.tempo == other.tempo
            && self.generation == other.generation
            && self.limits == other.limits
            && (Arc::ptr_eq(&self.tracks, &other.tracks) || self.tracks == other.tracks)
    }

    pub(crate) fn debug_assert_invariants(&self) {
        if cfg!(debug_assertions) {
            if let Err(violation) = self.check_invariants() {
                panic!("sequencer invariant violated: {violation}");
            }
        }
    }
}

impl Default for PolyrhythmState {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}
