// Polyrhythm engine - Library exports for the player, tests and benchmarks

pub mod audio;
pub mod config;
pub mod engine;
pub mod events;
pub mod preset;
pub mod sampler;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use config::{ConfigError, EngineConfig};
pub use engine::PolyrhythmEngine;
pub use events::{EngineEvent, EventConsumer, EventProducer, create_event_channel};
pub use preset::{PresetData, PresetError, builtin_presets};
pub use sampler::{Instrument, SampleTrigger, SamplerInstrument, Timbre};
pub use sequencer::{
    Action, Beat, Clock, ClockTime, Limits, PolyrhythmState, ReadyFlag, RosterEntry,
    RotateDirection, SampleClock, Scheduler, Store, Track, TransportState,
};
