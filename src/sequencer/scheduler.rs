// Scheduler - Step transport driven by the clock
// Advances the shared position on every eighth note and reports which tracks sound

use super::clock::{Clock, ClockTick, ClockTime, ScheduleHandle};
use super::reducer::Action;
use super::state::PolyrhythmState;
use super::store::Store;
use super::timeline::Subdivision;
use super::track::Track;

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    /// Start requested, waiting for the clock and the sample assets
    Starting,
    Running,
    /// Only observable while a reschedule is in progress
    PendingRestart,
}

impl TransportState {
    /// Running or about to be
    pub fn is_playing(&self) -> bool {
        matches!(
            self,
            TransportState::Starting | TransportState::Running | TransportState::PendingRestart
        )
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, TransportState::Stopped)
    }
}

/// Parameters the current repeat was armed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Armed {
    lcm: usize,
    tempo: u32,
    generation: u64,
}

impl Armed {
    fn of(state: &PolyrhythmState) -> Self {
        Self {
            lcm: state.lcm,
            tempo: state.tempo,
            generation: state.generation,
        }
    }
}

/// Step scheduler
///
/// Owns the clock. Never holds on to a state snapshot between ticks: each
/// tick reads the latest committed state, so edits made while running are
/// heard on the next step without rescheduling.
pub struct Scheduler<C: Clock> {
    clock: C,
    store: Store,
    state: TransportState,
    handle: Option<ScheduleHandle>,
    armed: Option<Armed>,
    /// Generation of the state last played, to tell a resume from a fresh cycle
    played_generation: Option<u64>,
    last_tick: Option<u64>,
    ticks: Vec<ClockTick>,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C, store: Store) -> Self {
        Self {
            clock,
            store,
            state: TransportState::Stopped,
            handle: None,
            armed: None,
            played_generation: None,
            last_tick: None,
            ticks: Vec::with_capacity(16),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Handle of the repeat currently armed
    pub fn handle(&self) -> Option<ScheduleHandle> {
        self.handle
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Requests playback
    ///
    /// Moves to `Starting` and immediately tries to complete the start.
    /// Has no effect unless stopped.
    pub fn start(&mut self, assets_ready: bool) -> TransportState {
        if self.state == TransportState::Stopped {
            self.state = TransportState::Starting;
        }
        self.poll_start(assets_ready)
    }

    /// Completes a pending start once the clock and the assets are ready
    pub fn poll_start(&mut self, assets_ready: bool) -> TransportState {
        if self.state != TransportState::Starting {
            return self.state;
        }
        if !assets_ready || !self.clock.is_ready() {
            return self.state;
        }
        if let Err(e) = self.clock.start() {
            log::debug!("Clock start deferred: {}", e);
            return self.state;
        }

        let snapshot = self.store.snapshot();
        let start_at = self.clock.now().sample;
        self.arm(&snapshot, start_at);
        self.state = TransportState::Running;
        self.state
    }

    /// Stops playback, keeping the position. Idempotent
    pub fn pause(&mut self) {
        self.disarm();
        self.clock.stop();
        self.state = TransportState::Stopped;
    }

    /// Reschedules if the cycle length, tempo or generation changed
    ///
    /// Returns true if a restart happened. Per-step edits never restart.
    pub fn sync(&mut self) -> bool {
        if self.state != TransportState::Running {
            return false;
        }
        let snapshot = self.store.snapshot();
        if self.armed == Some(Armed::of(&snapshot)) {
            return false;
        }
        self.restart(&snapshot);
        true
    }

    /// Cancels the old repeat, then arms a new one on the same grid phase
    fn restart(&mut self, snapshot: &PolyrhythmState) {
        self.state = TransportState::PendingRestart;
        self.disarm();

        self.clock.set_rate(snapshot.tempo);
        let now = self.clock.now().sample;
        let period = self.clock.interval_samples(Subdivision::STEP);
        let start_at = match self.last_tick {
            Some(last) => (last + period.round() as u64).max(now),
            None => now,
        };

        self.arm(snapshot, start_at);
        self.state = TransportState::Running;
    }

    fn arm(&mut self, snapshot: &PolyrhythmState, start_at: u64) {
        self.clock.set_rate(snapshot.tempo);
        let handle = self.clock.schedule_repeat(Subdivision::STEP, start_at);
        log::debug!(
            "Armed {:?} at sample {} (lcm {}, {} BPM)",
            handle,
            start_at,
            snapshot.lcm,
            snapshot.tempo
        );
        self.handle = Some(handle);
        self.armed = Some(Armed::of(snapshot));
    }

    fn disarm(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.clock.cancel(handle);
            log::debug!("Cancelled {:?}", handle);
        }
        self.armed = None;
    }

    /// Advances the clock by one audio block
    ///
    /// `on_trigger` is called for every track sounding on a tick, with the
    /// step that sounded and the exact clock time of that tick.
    pub fn process<F>(&mut self, frames: usize, mut on_trigger: F)
    where
        F: FnMut(&Track, usize, ClockTime),
    {
        self.ticks.clear();
        self.clock.advance(frames, &mut self.ticks);

        for i in 0..self.ticks.len() {
            let tick = self.ticks[i];
            if Some(tick.handle) != self.handle {
                continue;
            }
            self.on_tick(tick.time, &mut on_trigger);
        }
    }

    /// Steps the committed position and triggers what sounds there
    ///
    /// The step is resolved inside the store, so an edit committed since the
    /// last tick is never overwritten: a rewound cycle plays its downbeat.
    fn on_tick<F>(&mut self, time: ClockTime, on_trigger: &mut F)
    where
        F: FnMut(&Track, usize, ClockTime),
    {
        let committed = self.store.dispatch(Action::Tick {
            played_generation: self.played_generation,
        });
        self.played_generation = Some(committed.generation);
        self.last_tick = Some(time.sample);

        let step = committed.current_beat;
        for track in committed.sounding_at(step) {
            on_trigger(track, step, time);
        }
    }
}
