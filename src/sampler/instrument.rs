// Instrument - Sound source the sequencer triggers
// The sampler instrument keeps one sample per note and a fixed voice pool

use super::bank::SampleBank;
use super::loader::{Sample, synthesize_click};
use super::timbre::Timbre;
use super::voice::SamplerVoice;
use crate::sequencer::clock::ClockTime;
use std::path::Path;
use std::sync::Arc;

/// Playable sound source
pub trait Instrument: Send {
    /// True if a voice is loaded for `note`
    fn is_loaded(&self, note: u8) -> bool;

    /// Plays `note` for `duration` frames starting at `time`
    fn trigger(&mut self, note: u8, duration: u64, time: ClockTime);

    /// Adds the output of the block starting at `block_start` into `out`
    fn render(&mut self, _block_start: u64, _out: &mut [f32], _channels: usize) {}
}

/// Maximum simultaneous hits
pub const MAX_VOICES: usize = 32;

pub struct SamplerInstrument {
    samples: Vec<Option<Arc<Sample>>>,
    voices: Vec<SamplerVoice>,
    output_rate: f64,
    master_volume: f32,
    age_counter: u64,
}

impl SamplerInstrument {
    /// Instrument with no samples loaded
    pub fn new(output_rate: f64) -> Self {
        Self {
            samples: vec![None; 128],
            voices: (0..MAX_VOICES).map(|_| SamplerVoice::new()).collect(),
            output_rate,
            master_volume: 0.8,
            age_counter: 0,
        }
    }

    /// Instrument with the synthesized click kit loaded for every timbre
    pub fn with_click_kit(output_rate: f64) -> Self {
        let mut instrument = Self::new(output_rate);
        let rate = output_rate.round().max(1.0) as u32;
        for timbre in Timbre::ALL {
            instrument.load_timbre(timbre, synthesize_click(timbre.name(), timbre.spec(), rate));
        }
        instrument
    }

    pub fn load_sample(&mut self, note: u8, sample: Sample) {
        if let Some(slot) = self.samples.get_mut(note as usize) {
            *slot = Some(Arc::new(sample));
        }
    }

    pub fn load_timbre(&mut self, timbre: Timbre, sample: Sample) {
        self.load_sample(timbre.note(), sample);
    }

    pub fn unload(&mut self, note: u8) {
        if let Some(slot) = self.samples.get_mut(note as usize) {
            *slot = None;
        }
    }

    /// Loads every sample of a bank over the current ones
    /// Returns how many timbres were replaced
    pub fn load_bank(&mut self, bank: &SampleBank, base_dir: &Path) -> usize {
        let loaded = bank.load_samples(base_dir);
        let count = loaded.len();
        for (timbre, sample) in loaded {
            self.load_timbre(timbre, sample);
        }
        count
    }

    /// True if every given timbre has a voice
    pub fn has_timbres<I>(&self, timbres: I) -> bool
    where
        I: IntoIterator<Item = Timbre>,
    {
        timbres.into_iter().all(|t| self.is_loaded(t.note()))
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn output_rate(&self) -> f64 {
        self.output_rate
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    pub fn stop_all(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.force_stop();
        }
    }

    /// Free voice, or the oldest one when the pool is full
    fn allocate_voice(&mut self) -> usize {
        if let Some(free) = self.voices.iter().position(|v| !v.is_active()) {
            return free;
        }
        self.voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| v.age())
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

impl Instrument for SamplerInstrument {
    fn is_loaded(&self, note: u8) -> bool {
        self.samples
            .get(note as usize)
            .is_some_and(|slot| slot.is_some())
    }

    fn trigger(&mut self, note: u8, duration: u64, time: ClockTime) {
        let Some(sample) = self.samples.get(note as usize).and_then(|s| s.clone()) else {
            return;
        };
        let index = self.allocate_voice();
        self.age_counter += 1;
        let output_rate = self.output_rate;
        let age = self.age_counter;
        self.voices[index].start(sample, note, output_rate, time.sample, duration, age);
    }

    fn render(&mut self, block_start: u64, out: &mut [f32], channels: usize) {
        let gain = self.master_volume;
        for voice in self.voices.iter_mut() {
            voice.render_into(block_start, out, channels, gain);
        }
    }
}
