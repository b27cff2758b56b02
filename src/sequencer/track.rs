// Track - One cycling rhythm line
// Holds the on/off pattern of a track over the shared cycle

use crate::sampler::timbre::Timbre;

/// A single step of a track pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Beat {
    pub is_on: bool,
}

impl Beat {
    pub const ON: Beat = Beat { is_on: true };
    pub const OFF: Beat = Beat { is_on: false };
}

/// Rotation direction for a track pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateDirection {
    /// Last step moves to the front
    Clockwise,
    /// First step moves to the back
    CounterClockwise,
}

/// Rhythm track
///
/// `beats` always spans the whole shared cycle, including while the track is
/// inactive. The owning state keeps that length in sync with its `lcm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Stable identity, never reused
    pub index: usize,
    /// Meter of the track: an on-beat every `beat_number` steps
    pub beat_number: u32,
    pub beats: Vec<Beat>,
    pub is_active: bool,
    pub is_mute: bool,
    pub sample: Timbre,
}

impl Track {
    /// Creates a track with an empty pattern (filled by the next rebuild)
    pub fn new(index: usize, beat_number: u32, is_active: bool, sample: Timbre) -> Self {
        Self {
            index,
            beat_number: beat_number.max(1),
            beats: Vec::new(),
            is_active,
            is_mute: false,
            sample,
        }
    }

    /// Downbeat pattern of the given length: on at every multiple of `beat_number`
    pub fn downbeat_pattern(beat_number: u32, cycle_length: usize) -> Vec<Beat> {
        let step = beat_number.max(1) as usize;
        (0..cycle_length)
            .map(|i| Beat { is_on: i % step == 0 })
            .collect()
    }

    /// Regenerates the pattern for a new cycle length
    /// Active tracks get their downbeat pattern, inactive tracks are cleared
    pub fn regenerate(&mut self, cycle_length: usize) {
        self.beats = if self.is_active {
            Self::downbeat_pattern(self.beat_number, cycle_length)
        } else {
            vec![Beat::OFF; cycle_length]
        };
    }

    /// Flips a step. Returns false if the step is out of range
    pub fn toggle_beat(&mut self, step: usize) -> bool {
        match self.beats.get_mut(step) {
            Some(beat) => {
                beat.is_on = !beat.is_on;
                true
            }
            None => false,
        }
    }

    pub fn rotate(&mut self, direction: RotateDirection) {
        if self.beats.is_empty() {
            return;
        }
        match direction {
            RotateDirection::Clockwise => self.beats.rotate_right(1),
            RotateDirection::CounterClockwise => self.beats.rotate_left(1),
        }
    }

    /// Turns every step off
    pub fn clear(&mut self) {
        self.beats.fill(Beat::OFF);
    }

    /// True if the step exists and is on
    pub fn is_on_at(&self, step: usize) -> bool {
        self.beats.get(step).is_some_and(|beat| beat.is_on)
    }

    /// True if the track sounds at this step (active, unmuted, step on)
    pub fn sounds_at(&self, step: usize) -> bool {
        self.is_active && !self.is_mute && self.is_on_at(step)
    }

    /// Number of on-beats in the pattern
    pub fn on_count(&self) -> usize {
        self.beats.iter().filter(|beat| beat.is_on).count()
    }
}
