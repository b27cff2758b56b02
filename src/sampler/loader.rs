// Loader - Percussion sample data
// Reads WAV files and synthesizes the built-in click kit

use super::SamplerError;
use super::timbre::TimbreSpec;
use hound::{SampleFormat, WavReader};
use std::f32::consts::PI;
use std::path::Path;

/// Mono sample held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub data: Vec<f32>,
    pub sample_rate: u32,
    /// Gain applied on playback
    pub volume: f32,
}

impl Sample {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.data.len() as f64 / self.sample_rate.max(1) as f64
    }
}

/// Loads a sample file, only WAV is supported
pub fn load_sample(path: &Path) -> Result<Sample, SamplerError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "wav" => load_wav(path),
        _ => Err(SamplerError::UnsupportedFormat(extension)),
    }
}

/// Loads a WAV file, mixing all channels down to mono
fn load_wav(path: &Path) -> Result<Sample, SamplerError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let data = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok(Sample {
        name: path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string(),
        data,
        sample_rate: spec.sample_rate,
        volume: 1.0,
    })
}

/// Synthesizes a short percussive click for a timbre
/// Decaying sine with a little noise at the attack
pub fn synthesize_click(name: &str, spec: &TimbreSpec, sample_rate: u32) -> Sample {
    const CLICK_DURATION_MS: usize = 120;

    let rate = sample_rate.max(1) as f32;
    let num_samples = sample_rate as usize * CLICK_DURATION_MS / 1000;
    let phase_increment = 2.0 * PI * spec.click_frequency / rate;

    // Small LCG so the kit is identical on every run
    let mut seed: u32 = 0x9E37_79B9 ^ u32::from(spec.note);
    let mut noise = move || {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (seed >> 8) as f32 / (1 << 23) as f32 - 1.0
    };

    let mut data = Vec::with_capacity(num_samples);
    for i in 0..num_samples {
        let t = i as f32 / rate;
        let envelope = (-t * spec.click_decay).exp();
        let attack = (-t * 400.0).exp();
        let tone = (i as f32 * phase_increment).sin();
        data.push((tone * envelope + noise() * attack * 0.3) * spec.click_amplitude);
    }

    Sample {
        name: name.to_string(),
        data,
        sample_rate,
        volume: 1.0,
    }
}
