// Sample trigger - Binds a track's timbre to the instrument

use super::instrument::Instrument;
use super::timbre::Timbre;
use crate::sequencer::clock::ClockTime;
use crate::sequencer::timeline::{Subdivision, Tempo};

/// Stateless binding from timbres to instrument notes
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleTrigger {
    /// Note value each hit is held for
    note_value: Subdivision,
}

impl SampleTrigger {
    pub fn new(note_value: Subdivision) -> Self {
        Self { note_value }
    }

    /// Hit length in frames at a tempo
    pub fn duration_samples(&self, tempo: u32, sample_rate: f64) -> u64 {
        Tempo::new(tempo)
            .note_duration_samples(self.note_value, sample_rate)
            .round() as u64
    }

    /// Plays `timbre` at `time`
    ///
    /// Returns false without sounding anything when the timbre's voice is not
    /// loaded yet.
    pub fn fire<I>(&self, instrument: &mut I, timbre: Timbre, tempo: u32, time: ClockTime) -> bool
    where
        I: Instrument + ?Sized,
    {
        let note = timbre.note();
        if !instrument.is_loaded(note) {
            log::trace!("No voice for {} yet, skipping hit", timbre);
            return false;
        }
        let duration = self.duration_samples(tempo, time.sample_rate);
        instrument.trigger(note, duration, time);
        true
    }
}
