// Audio output - cpal stream driving the engine
// The callback renders the engine in f32 and converts to the device format

use super::AudioError;
use crate::engine::PolyrhythmEngine;
use crate::sequencer::clock::ReadyFlag;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::{Arc, Mutex};

/// Scratch size reserved for the f32 mix, in samples
const SCRATCH_CAPACITY: usize = 8192;

/// Default output device with its preferred configuration
pub struct OutputDevice {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
}

impl OutputDevice {
    /// Opens the default output device of the default host
    pub fn open_default() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::Config(e.to_string()))?;

        Ok(Self {
            device,
            sample_format: supported.sample_format(),
            config: supported.into(),
        })
    }

    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "Unknown".to_string())
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> usize {
        self.config.channels as usize
    }
}

/// Running output stream; audio stops when dropped
pub struct AudioOutput {
    _stream: Stream,
    sample_rate: u32,
    channels: usize,
}

impl AudioOutput {
    /// Starts streaming `engine` to `device`
    ///
    /// `ready` is marked once the stream is playing, which unlocks the
    /// engine clock.
    pub fn start(
        device: OutputDevice,
        engine: Arc<Mutex<PolyrhythmEngine>>,
        ready: ReadyFlag,
    ) -> Result<Self, AudioError> {
        let channels = device.channels();
        let stream = match device.sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device.device, &device.config, channels, engine)?,
            SampleFormat::I16 => build_stream::<i16>(&device.device, &device.config, channels, engine)?,
            SampleFormat::U16 => build_stream::<u16>(&device.device, &device.config, channels, engine)?,
            other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        };

        stream.play().map_err(|e| AudioError::Stream(e.to_string()))?;
        ready.mark_ready();

        Ok(Self {
            _stream: stream,
            sample_rate: device.sample_rate(),
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    channels: usize,
    engine: Arc<Mutex<PolyrhythmEngine>>,
) -> Result<Stream, AudioError>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let mut scratch: Vec<f32> = Vec::with_capacity(SCRATCH_CAPACITY);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // No blocking lock in the callback: silence if an edit holds the engine
                let Ok(mut engine) = engine.try_lock() else {
                    for sample in data.iter_mut() {
                        *sample = Sample::from_sample::<f32>(0.0);
                    }
                    return;
                };

                scratch.resize(data.len(), 0.0);
                engine.process(&mut scratch, channels);
                for (out, &value) in data.iter_mut().zip(scratch.iter()) {
                    *out = T::from_sample(value);
                }
            },
            |err| log::warn!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::Stream(e.to_string()))
}
