// Sampler voice - One playing percussion hit
// Starts at an exact output frame, resamples by linear interpolation

use super::loader::Sample;
use std::sync::Arc;

/// Fade applied when the gate closes, in output frames
const RELEASE_FRAMES: u64 = 64;

pub struct SamplerVoice {
    sample: Option<Arc<Sample>>,
    position: f64,
    pitch_step: f64,
    /// Output frame the hit starts on
    start_at: u64,
    /// Gate length in output frames
    duration: u64,
    note: u8,
    age: u64,
    active: bool,
}

impl SamplerVoice {
    /// Idle voice
    pub fn new() -> Self {
        Self {
            sample: None,
            position: 0.0,
            pitch_step: 1.0,
            start_at: 0,
            duration: 0,
            note: 0,
            age: 0,
            active: false,
        }
    }

    /// Starts a hit of `sample` at output frame `start_at`
    pub fn start(
        &mut self,
        sample: Arc<Sample>,
        note: u8,
        output_rate: f64,
        start_at: u64,
        duration: u64,
        age: u64,
    ) {
        // Plays the file at its own speed whatever the output rate
        self.pitch_step = sample.sample_rate as f64 / output_rate.max(1.0);
        self.sample = Some(sample);
        self.position = 0.0;
        self.start_at = start_at;
        self.duration = duration.max(1);
        self.note = note;
        self.age = age;
        self.active = true;
    }

    pub fn force_stop(&mut self) {
        self.active = false;
        self.sample = None;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    /// Adds this voice into an interleaved block starting at `block_start`
    pub fn render_into(&mut self, block_start: u64, out: &mut [f32], channels: usize, gain: f32) {
        if !self.active {
            return;
        }
        let Some(sample) = self.sample.as_ref() else {
            self.active = false;
            return;
        };
        let channels = channels.max(1);
        let data = &sample.data;
        let gain = gain * sample.volume;

        for (offset, frame) in out.chunks_mut(channels).enumerate() {
            let now = block_start + offset as u64;
            if now < self.start_at {
                continue;
            }

            let elapsed = now - self.start_at;
            let envelope = if elapsed < self.duration {
                1.0
            } else {
                let released = elapsed - self.duration;
                if released >= RELEASE_FRAMES {
                    self.active = false;
                    break;
                }
                1.0 - released as f32 / RELEASE_FRAMES as f32
            };

            let pos_integer = self.position as usize;
            if pos_integer >= data.len() {
                self.active = false;
                break;
            }
            let pos_fractional = self.position.fract() as f32;
            let sample1 = data[pos_integer];
            let sample2 = data.get(pos_integer + 1).copied().unwrap_or(0.0);
            let value = (sample1 + (sample2 - sample1) * pos_fractional) * envelope * gain;

            for out_sample in frame.iter_mut() {
                *out_sample += value;
            }
            self.position += self.pitch_step;
        }

        if !self.active {
            self.sample = None;
        }
    }
}

impl Default for SamplerVoice {
    fn default() -> Self {
        Self::new()
    }
}
