// Clock - Sample-accurate repeat scheduling
// Ticks are computed from the audio frame count, never from wall time

use super::timeline::{Subdivision, Tempo};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Point on the audio clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockTime {
    /// Frames since the clock was created
    pub sample: u64,
    pub sample_rate: f64,
}

impl ClockTime {
    pub fn seconds(&self) -> f64 {
        self.sample as f64 / self.sample_rate
    }
}

/// Identifies one scheduled repeat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleHandle(u64);

/// A repeat firing inside the processed block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockTick {
    pub handle: ScheduleHandle,
    pub time: ClockTime,
}

/// Clock errors
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("Audio clock is not ready (backend still locked)")]
    NotReady,
}

/// Readiness flag shared with the audio backend
///
/// Stays false until the backend has actually started producing audio.
#[derive(Debug, Clone, Default)]
pub struct ReadyFlag(Arc<AtomicBool>);

impl ReadyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag that is already set (offline rendering, tests)
    pub fn unlocked() -> Self {
        let flag = Self::new();
        flag.mark_ready();
        flag
    }

    pub fn mark_ready(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Timing source driving the scheduler
pub trait Clock: Send {
    /// True once the audio backend is unlocked
    fn is_ready(&self) -> bool;

    /// Starts delivering ticks
    fn start(&mut self) -> Result<(), ClockError>;

    /// Stops delivering ticks; scheduled repeats stay registered
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Tempo the intervals are derived from
    fn set_rate(&mut self, bpm: u32);

    fn rate(&self) -> u32;

    /// Registers a repeat at the given note value, first firing at `start_at`
    fn schedule_repeat(&mut self, interval: Subdivision, start_at: u64) -> ScheduleHandle;

    /// Removes a repeat. Returns false for an unknown handle
    fn cancel(&mut self, handle: ScheduleHandle) -> bool;

    /// Current position
    fn now(&self) -> ClockTime;

    /// Length of one note of the given value at the current rate, in frames
    fn interval_samples(&self, interval: Subdivision) -> f64;

    /// Moves time forward by `frames`, appending every tick that falls inside
    fn advance(&mut self, frames: usize, ticks: &mut Vec<ClockTick>);
}

#[derive(Debug, Clone)]
struct Repeat {
    handle: ScheduleHandle,
    interval: Subdivision,
    origin: f64,
    period: f64,
    fired: u64,
}

impl Repeat {
    /// Firing k is computed from the origin so errors never accumulate
    fn next_fire(&self) -> u64 {
        (self.origin + self.fired as f64 * self.period).round() as u64
    }
}

/// Clock counting audio frames
#[derive(Debug)]
pub struct SampleClock {
    sample_rate: f64,
    position: u64,
    bpm: u32,
    running: bool,
    ready: ReadyFlag,
    repeats: Vec<Repeat>,
    next_handle: u64,
}

impl SampleClock {
    pub fn new(sample_rate: f64, ready: ReadyFlag) -> Self {
        Self {
            sample_rate,
            position: 0,
            bpm: Tempo::default().bpm(),
            running: false,
            ready,
            repeats: Vec::with_capacity(4),
            next_handle: 1,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Handle to the readiness flag, for the audio backend
    pub fn ready_flag(&self) -> ReadyFlag {
        self.ready.clone()
    }

    /// Number of repeats currently registered
    pub fn scheduled_count(&self) -> usize {
        self.repeats.len()
    }

    fn period(&self, interval: Subdivision) -> f64 {
        Tempo::new(self.bpm)
            .note_duration_samples(interval, self.sample_rate)
            .max(1.0)
    }
}

impl Clock for SampleClock {
    fn is_ready(&self) -> bool {
        self.ready.is_ready()
    }

    fn start(&mut self) -> Result<(), ClockError> {
        if !self.ready.is_ready() {
            return Err(ClockError::NotReady);
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn set_rate(&mut self, bpm: u32) {
        if bpm == self.bpm {
            return;
        }
        self.bpm = bpm.max(1);

        // Keep each pending firing, space the following ones at the new rate
        for i in 0..self.repeats.len() {
            let period = self.period(self.repeats[i].interval);
            let repeat = &mut self.repeats[i];
            repeat.origin = repeat.next_fire() as f64;
            repeat.fired = 0;
            repeat.period = period;
        }
    }

    fn rate(&self) -> u32 {
        self.bpm
    }

    fn schedule_repeat(&mut self, interval: Subdivision, start_at: u64) -> ScheduleHandle {
        let handle = ScheduleHandle(self.next_handle);
        self.next_handle += 1;

        self.repeats.push(Repeat {
            handle,
            interval,
            origin: start_at.max(self.position) as f64,
            period: self.period(interval),
            fired: 0,
        });
        handle
    }

    fn cancel(&mut self, handle: ScheduleHandle) -> bool {
        let before = self.repeats.len();
        self.repeats.retain(|r| r.handle != handle);
        self.repeats.len() < before
    }

    fn now(&self) -> ClockTime {
        ClockTime {
            sample: self.position,
            sample_rate: self.sample_rate,
        }
    }

    fn interval_samples(&self, interval: Subdivision) -> f64 {
        self.period(interval)
    }

    fn advance(&mut self, frames: usize, ticks: &mut Vec<ClockTick>) {
        let block_end = self.position + frames as u64;

        if self.running {
            let first = ticks.len();
            for repeat in self.repeats.iter_mut() {
                loop {
                    let at = repeat.next_fire();
                    if at >= block_end {
                        break;
                    }
                    ticks.push(ClockTick {
                        handle: repeat.handle,
                        time: ClockTime {
                            sample: at.max(self.position),
                            sample_rate: self.sample_rate,
                        },
                    });
                    repeat.fired += 1;
                }
            }
            if self.repeats.len() > 1 {
                ticks[first..].sort_by_key(|tick| tick.time.sample);
            }
        }

        self.position = block_end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_clock(sample_rate: f64) -> SampleClock {
        let mut clock = SampleClock::new(sample_rate, ReadyFlag::unlocked());
        clock.start().unwrap();
        clock
    }

    #[test]
    fn test_start_requires_ready() {
        let ready = ReadyFlag::new();
        let mut clock = SampleClock::new(48_000.0, ready.clone());
        assert!(matches!(clock.start(), Err(ClockError::NotReady)));
        assert!(!clock.is_running());

        ready.mark_ready();
        assert!(clock.start().is_ok());
        assert!(clock.is_running());
    }

    #[test]
    fn test_eighth_notes_at_120() {
        let mut clock = running_clock(48_000.0);
        clock.set_rate(120);
        let handle = clock.schedule_repeat(Subdivision::Eighth, 0);

        let mut ticks = Vec::new();
        // One second holds four eighth notes at 120 BPM
        for _ in 0..100 {
            clock.advance(480, &mut ticks);
        }
        let samples: Vec<u64> = ticks.iter().map(|t| t.time.sample).collect();
        assert_eq!(samples, vec![0, 12_000, 24_000, 36_000]);
        assert!(ticks.iter().all(|t| t.handle == handle));
    }

    #[test]
    fn test_no_drift_over_long_run() {
        // 44.1 kHz at 130 BPM gives a fractional period
        let mut clock = running_clock(44_100.0);
        clock.set_rate(130);
        clock.schedule_repeat(Subdivision::Eighth, 0);

        let mut ticks = Vec::new();
        for _ in 0..10_000 {
            clock.advance(441, &mut ticks);
        }
        let period = 44_100.0 * 60.0 / 130.0 / 2.0;
        for (k, tick) in ticks.iter().enumerate() {
            let expected = (k as f64 * period).round() as u64;
            assert_eq!(tick.time.sample, expected);
        }
        assert_eq!(ticks.len(), (4_410_000.0 / period).ceil() as usize);
    }

    #[test]
    fn test_cancelled_handle_never_fires() {
        let mut clock = running_clock(1_000.0);
        clock.set_rate(60);
        let handle = clock.schedule_repeat(Subdivision::Quarter, 0);
        let mut ticks = Vec::new();
        clock.advance(10, &mut ticks);
        assert_eq!(ticks.len(), 1);

        assert!(clock.cancel(handle));
        assert!(!clock.cancel(handle));
        ticks.clear();
        clock.advance(5_000, &mut ticks);
        assert!(ticks.is_empty());
    }

    #[test]
    fn test_stopped_clock_keeps_time_without_ticks() {
        let mut clock = running_clock(1_000.0);
        clock.schedule_repeat(Subdivision::Eighth, 0);
        clock.stop();

        let mut ticks = Vec::new();
        clock.advance(2_000, &mut ticks);
        assert!(ticks.is_empty());
        assert_eq!(clock.now().sample, 2_000);
    }

    #[test]
    fn test_set_rate_keeps_pending_firing() {
        let mut clock = running_clock(1_000.0);
        clock.set_rate(60);
        clock.schedule_repeat(Subdivision::Quarter, 0);

        let mut ticks = Vec::new();
        clock.advance(1_500, &mut ticks);
        assert_eq!(ticks.len(), 2);

        // Pending firing at 2000 stays, then every 500 frames
        clock.set_rate(120);
        ticks.clear();
        clock.advance(1_500, &mut ticks);
        let samples: Vec<u64> = ticks.iter().map(|t| t.time.sample).collect();
        assert_eq!(samples, vec![2_000, 2_500]);
    }

    #[test]
    fn test_repeat_starts_at_requested_point() {
        let mut clock = running_clock(1_000.0);
        clock.set_rate(60);
        let mut ticks = Vec::new();
        clock.advance(100, &mut ticks);

        clock.schedule_repeat(Subdivision::Quarter, 750);
        clock.advance(1_000, &mut ticks);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].time.sample, 750);

        // A start point in the past is moved to now
        let late = clock.schedule_repeat(Subdivision::Quarter, 0);
        ticks.clear();
        clock.advance(1, &mut ticks);
        assert!(ticks.iter().any(|t| t.handle == late && t.time.sample == 1_100));
    }

    #[test]
    fn test_clock_time_seconds() {
        let time = ClockTime {
            sample: 24_000,
            sample_rate: 48_000.0,
        };
        assert!((time.seconds() - 0.5).abs() < 1e-12);
    }
}
