// Engine - Public face of the polyrhythm sequencer
// Owns the store, the scheduler and the instrument; renders audio blocks

use crate::config::EngineConfig;
use crate::events::{EngineEvent, EventProducer};
use crate::preset::serialization::{parse_preset, share_string};
use crate::preset::{PresetData, find_builtin};
use crate::sampler::bank::SampleBank;
use crate::sampler::instrument::{Instrument, SamplerInstrument};
use crate::sampler::timbre::Timbre;
use crate::sampler::trigger::SampleTrigger;
use crate::sequencer::clock::{Clock, ReadyFlag, SampleClock};
use crate::sequencer::reducer::Action;
use crate::sequencer::scheduler::{Scheduler, TransportState};
use crate::sequencer::state::PolyrhythmState;
use crate::sequencer::store::Store;
use crate::sequencer::track::RotateDirection;
use ringbuf::traits::Producer;
use std::sync::Arc;

/// Polyrhythm sequencer engine
///
/// Edits can come through the engine itself or through a cloned [`Store`]
/// from another thread; the scheduler picks up cycle and tempo changes at
/// the start of the next audio block.
pub struct PolyrhythmEngine<C: Clock = SampleClock, I: Instrument = SamplerInstrument> {
    store: Store,
    scheduler: Scheduler<C>,
    instrument: I,
    trigger: SampleTrigger,
    events: Option<EventProducer>,
}

impl PolyrhythmEngine {
    /// Engine rendering at `sample_rate` with the built-in click kit, plus
    /// the configured sample directory loaded over it
    pub fn from_config(config: &EngineConfig, sample_rate: f64, ready: ReadyFlag) -> Self {
        let mut instrument = SamplerInstrument::with_click_kit(sample_rate);
        instrument.set_master_volume(config.master_volume);

        if let Some(dir) = &config.samples_dir {
            match SampleBank::open_directory(dir) {
                Ok(bank) => {
                    let count = instrument.load_bank(&bank, dir);
                    log::debug!("Loaded {} samples from {}", count, dir.display());
                }
                Err(e) => log::warn!("Using built-in kit: {}", e),
            }
        }

        let state = PolyrhythmState::with_roster(config.limits, &config.roster);
        Self::new(state, SampleClock::new(sample_rate, ready), instrument)
    }
}

impl<C: Clock, I: Instrument> PolyrhythmEngine<C, I> {
    pub fn new(state: PolyrhythmState, clock: C, instrument: I) -> Self {
        let store = Store::new(state);
        Self {
            scheduler: Scheduler::new(clock, store.clone()),
            store,
            instrument,
            trigger: SampleTrigger::default(),
            events: None,
        }
    }

    /// Sends hit notifications to `producer`
    pub fn with_events(mut self, producer: EventProducer) -> Self {
        self.events = Some(producer);
        self
    }

    /// Shared handle to the state, usable from any thread
    pub fn store(&self) -> Store {
        self.store.clone()
    }

    pub fn snapshot(&self) -> Arc<PolyrhythmState> {
        self.store.snapshot()
    }

    /// Applies an edit and reschedules if it changed the cycle or tempo
    pub fn dispatch(&mut self, action: Action) -> Arc<PolyrhythmState> {
        let state = self.store.dispatch(action);
        self.scheduler.sync();
        state
    }

    pub fn transport_state(&self) -> TransportState {
        self.scheduler.state()
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.state().is_playing()
    }

    pub fn scheduler(&self) -> &Scheduler<C> {
        &self.scheduler
    }

    pub fn instrument(&self) -> &I {
        &self.instrument
    }

    pub fn instrument_mut(&mut self) -> &mut I {
        &mut self.instrument
    }

    /// Requests playback; stays `Starting` until the clock and samples are ready
    pub fn start(&mut self) -> TransportState {
        let ready = self.assets_ready();
        self.scheduler.start(ready)
    }

    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    pub fn toggle_play(&mut self) -> TransportState {
        if self.scheduler.state().is_playing() {
            self.pause();
            self.scheduler.state()
        } else {
            self.start()
        }
    }

    pub fn add_track(&mut self) -> Arc<PolyrhythmState> {
        self.dispatch(Action::AddTrack)
    }

    pub fn toggle_active_track(&mut self, track: usize) -> Arc<PolyrhythmState> {
        self.dispatch(Action::ToggleActive(track))
    }

    pub fn toggle_mute_track(&mut self, track: usize) -> Arc<PolyrhythmState> {
        self.dispatch(Action::ToggleMute(track))
    }

    pub fn change_beat_number(&mut self, track: usize, beat_number: u32) -> Arc<PolyrhythmState> {
        self.dispatch(Action::ChangeBeatNumber { track, beat_number })
    }

    pub fn rotate_track(&mut self, track: usize, direction: RotateDirection) -> Arc<PolyrhythmState> {
        self.dispatch(Action::rotate(track, direction))
    }

    pub fn clear_track(&mut self, track: usize) -> Arc<PolyrhythmState> {
        self.dispatch(Action::ClearBeats(track))
    }

    pub fn set_tempo(&mut self, bpm: u32) -> Arc<PolyrhythmState> {
        self.dispatch(Action::ChangeTempo(bpm))
    }

    pub fn toggle_beat(&mut self, track: usize, step: usize) -> Arc<PolyrhythmState> {
        self.dispatch(Action::ToggleBeat { track, step })
    }

    pub fn change_sample(&mut self, track: usize, sample: Timbre) -> Arc<PolyrhythmState> {
        self.dispatch(Action::ChangeSample { track, sample })
    }

    /// Current state as a share string (JSON, not percent-encoded)
    pub fn share_url(&self) -> String {
        match share_string(&self.snapshot()) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Could not serialize state: {}", e);
                String::new()
            }
        }
    }

    /// Replaces the state from a share string
    ///
    /// Returns false and leaves everything untouched when the text is not a
    /// usable preset.
    pub fn load_from_url(&mut self, text: &str) -> bool {
        match parse_preset(text) {
            Ok(preset) => self.load_preset(preset),
            Err(e) => {
                log::debug!("Ignoring share string: {}", e);
                false
            }
        }
    }

    /// Replaces the state from preset data, restarting from the first step
    pub fn load_preset(&mut self, preset: PresetData) -> bool {
        let before = self.store.snapshot().generation;
        let after = self.dispatch(Action::LoadPreset(Box::new(preset)));
        after.generation != before
    }

    /// Loads a built-in preset by name
    pub fn load_builtin_preset(&mut self, name: &str) -> bool {
        match find_builtin(name) {
            Some(preset) => self.load_preset(preset),
            None => false,
        }
    }

    /// True if the instrument can play every active track
    pub fn assets_ready(&self) -> bool {
        self.store
            .snapshot()
            .active_tracks()
            .all(|track| self.instrument.is_loaded(track.sample.note()))
    }

    /// Renders one interleaved block
    ///
    /// Completes a pending start, applies reschedules, fires the ticks that
    /// fall inside the block and mixes the instrument into `out`.
    pub fn process(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frames = out.len() / channels;
        out.fill(0.0);

        if self.scheduler.state() == TransportState::Starting {
            let ready = self.assets_ready();
            if self.scheduler.poll_start(ready) == TransportState::Running {
                self.emit(EngineEvent::Started);
            }
        }
        self.scheduler.sync();

        let block_start = self.scheduler.clock().now().sample;
        let tempo = self.scheduler.clock().rate();
        let trigger = self.trigger;
        let instrument = &mut self.instrument;
        let events = &mut self.events;

        self.scheduler.process(frames, |track, step, time| {
            if trigger.fire(&mut *instrument, track.sample, tempo, time) {
                if let Some(events) = events.as_mut() {
                    let _ = events.try_push(EngineEvent::Hit {
                        track: track.index,
                        step,
                        sample: track.sample,
                        at: time.seconds(),
                    });
                }
            }
        });

        self.instrument.render(block_start, out, channels);
        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }

    fn emit(&mut self, event: EngineEvent) {
        if let Some(events) = self.events.as_mut() {
            let _ = events.try_push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::create_event_channel;
    use crate::sequencer::state::Limits;
    use ringbuf::traits::Consumer;

    fn engine() -> PolyrhythmEngine {
        let config = EngineConfig {
            fallback_sample_rate: 8_000,
            ..EngineConfig::default()
        };
        PolyrhythmEngine::from_config(&config, 8_000.0, ReadyFlag::unlocked())
    }

    #[test]
    fn test_toggle_play() {
        let mut engine = engine();
        assert_eq!(engine.toggle_play(), TransportState::Running);
        assert_eq!(engine.toggle_play(), TransportState::Stopped);
        assert_eq!(engine.toggle_play(), TransportState::Running);
    }

    #[test]
    fn test_process_renders_downbeat() {
        let mut engine = engine();
        engine.start();
        let mut out = vec![0.0; 512];
        engine.process(&mut out, 2);
        assert!(out.iter().any(|&s| s != 0.0));
        assert!(out.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_stopped_engine_is_silent() {
        let mut engine = engine();
        let mut out = vec![1.0; 256];
        engine.process(&mut out, 2);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_start_waits_for_samples() {
        let state = PolyrhythmState::new(Limits::default());
        let clock = SampleClock::new(8_000.0, ReadyFlag::unlocked());
        let mut engine = PolyrhythmEngine::new(state, clock, SamplerInstrument::new(8_000.0));
        assert_eq!(engine.start(), TransportState::Starting);

        let mut out = vec![0.0; 64];
        engine.process(&mut out, 1);
        assert_eq!(engine.transport_state(), TransportState::Starting);

        let click = crate::sampler::synthesize_click("cardboard", Timbre::Cardboard.spec(), 8_000);
        engine.instrument_mut().load_timbre(Timbre::Cardboard, click.clone());
        engine.instrument_mut().load_timbre(Timbre::Plastic, click);
        engine.process(&mut out, 1);
        assert_eq!(engine.transport_state(), TransportState::Running);
    }

    #[test]
    fn test_events_report_hits() {
        let (tx, mut rx) = create_event_channel(16);
        let mut engine = engine().with_events(tx);
        engine.start();
        let mut out = vec![0.0; 128];
        engine.process(&mut out, 1);

        let mut hits = Vec::new();
        while let Some(event) = rx.try_pop() {
            if let EngineEvent::Hit { track, step, .. } = event {
                hits.push((track, step));
            }
        }
        assert_eq!(hits, vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn test_hit_events_carry_the_sounded_step() {
        let (tx, mut rx) = create_event_channel(64);
        let mut engine = engine().with_events(tx);
        engine.start();
        // 8 kHz at 120 BPM: one step every 2000 frames
        let mut out = vec![0.0; 2_000];
        for _ in 0..12 {
            engine.process(&mut out, 1);
        }

        let mut steps = Vec::new();
        while let Some(event) = rx.try_pop() {
            if let EngineEvent::Hit { track: 0, step, .. } = event {
                steps.push(step);
            }
        }
        assert_eq!(steps, vec![0, 4, 8]);
    }

    #[test]
    fn test_share_and_load() {
        let mut engine = engine();
        engine.change_beat_number(0, 5);
        let shared = engine.share_url();

        let mut other = PolyrhythmEngine::from_config(
            &EngineConfig::default(),
            8_000.0,
            ReadyFlag::unlocked(),
        );
        assert!(other.load_from_url(&shared));
        assert_eq!(other.snapshot().lcm, 15);
        assert_eq!(other.snapshot().tracks, engine.snapshot().tracks);
    }

    #[test]
    fn test_malformed_share_is_noop() {
        let mut engine = engine();
        let before = engine.snapshot();
        assert!(!engine.load_from_url("not json"));
        assert!(!engine.load_from_url(""));
        assert!(!engine.load_from_url("[]"));
        assert_eq!(*engine.snapshot(), *before);
    }

    #[test]
    fn test_load_builtin() {
        let mut engine = engine();
        assert!(engine.load_builtin_preset("3:2 Polyrhythm"));
        assert_eq!(engine.snapshot().lcm, 6);
        assert!(!engine.load_builtin_preset("nope"));
    }
}
