// Reducer - Pure state transitions
// Every edit to the sequencer goes through `transition`

use super::lcm;
use super::state::PolyrhythmState;
use super::track::{RotateDirection, Track};
use crate::preset::serialization::normalize;
use crate::preset::types::PresetData;
use crate::sampler::timbre::Timbre;
use std::sync::Arc;

/// Edits that can be applied to the sequencer
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ToggleBeat { track: usize, step: usize },
    ToggleActive(usize),
    ToggleMute(usize),
    ChangeBeatNumber { track: usize, beat_number: u32 },
    ChangeSample { track: usize, sample: Timbre },
    RotateCw(usize),
    RotateCcw(usize),
    ClearBeats(usize),
    ChangeTempo(u32),
    /// Moves the position to an absolute step
    AdvanceBeat(usize),
    /// One clock step, resolved against the committed state
    ///
    /// Advances by one when the position was last played at
    /// `played_generation`; otherwise the position was rewound since, and the
    /// step stays put so the downbeat sounds.
    Tick { played_generation: Option<u64> },
    AddTrack,
    LoadPreset(Box<PresetData>),
}

impl Action {
    /// Rotation action for a direction
    pub fn rotate(track: usize, direction: RotateDirection) -> Self {
        match direction {
            RotateDirection::Clockwise => Action::RotateCw(track),
            RotateDirection::CounterClockwise => Action::RotateCcw(track),
        }
    }

    /// True for edits that may change the cycle length
    pub fn rebuilds(&self) -> bool {
        matches!(
            self,
            Action::ToggleActive(_)
                | Action::ChangeBeatNumber { .. }
                | Action::AddTrack
                | Action::LoadPreset(_)
        )
    }
}

/// Computes the state following `action`
///
/// Invalid edits (unknown track, out-of-range step, full roster, cycle over
/// the limit, malformed preset) return an unchanged copy of `state`.
pub fn transition(state: &PolyrhythmState, action: Action) -> PolyrhythmState {
    let mut next = state.clone();

    match action {
        Action::ToggleBeat { track, step } => {
            edit_track(&mut next, track, |t| {
                t.toggle_beat(step);
            });
        }
        Action::ToggleMute(track) => {
            edit_track(&mut next, track, |t| t.is_mute = !t.is_mute);
        }
        Action::ChangeSample { track, sample } => {
            edit_track(&mut next, track, |t| t.sample = sample);
        }
        Action::RotateCw(track) => {
            edit_track(&mut next, track, |t| t.rotate(RotateDirection::Clockwise));
        }
        Action::RotateCcw(track) => {
            edit_track(&mut next, track, |t| t.rotate(RotateDirection::CounterClockwise));
        }
        Action::ClearBeats(track) => {
            edit_track(&mut next, track, Track::clear);
        }
        Action::ChangeTempo(bpm) => {
            next.tempo = next.limits.clamp_tempo(bpm);
        }
        Action::AdvanceBeat(step) => {
            next.current_beat = step % next.lcm.max(1);
        }
        Action::Tick { played_generation } => {
            if played_generation == Some(next.generation) {
                next.current_beat = (next.current_beat + 1) % next.lcm.max(1);
            }
        }
        Action::ToggleActive(track) => {
            if track >= next.tracks.len() {
                return next;
            }
            let mut tracks = next.tracks.as_ref().clone();
            tracks[track].is_active = !tracks[track].is_active;
            return rebuilt(state, tracks);
        }
        Action::ChangeBeatNumber { track, beat_number } => {
            let Some(beat_number) = next.limits.clamp_beat_number(beat_number) else {
                return next;
            };
            if track >= next.tracks.len() {
                return next;
            }
            let mut tracks = next.tracks.as_ref().clone();
            tracks[track].beat_number = beat_number;
            return rebuilt(state, tracks);
        }
        Action::AddTrack => {
            if next.tracks.len() >= next.limits.max_tracks {
                return next;
            }
            let index = next.tracks.len();
            let mut tracks = next.tracks.as_ref().clone();
            tracks.push(Track::new(
                index,
                next.limits.default_beat_number,
                true,
                Timbre::round_robin(index),
            ));
            return rebuilt(state, tracks);
        }
        Action::LoadPreset(preset) => match normalize(&preset, &state.limits) {
            Ok(mut loaded) => {
                loaded.generation = state.generation + 1;
                return loaded;
            }
            Err(e) => {
                log::warn!("Ignoring preset: {}", e);
                return next;
            }
        },
    }

    next.debug_assert_invariants();
    next
}

fn edit_track<F>(state: &mut PolyrhythmState, index: usize, edit: F)
where
    F: FnOnce(&mut Track),
{
    if index >= state.tracks.len() {
        return;
    }
    edit(&mut Arc::make_mut(&mut state.tracks)[index]);
}

/// Applies a roster edit that may change the cycle length
///
/// Patterns are regenerated and the position rewinds only when the cycle
/// length actually changes. Edits pushing the cycle over the limit are dropped.
fn rebuilt(state: &PolyrhythmState, mut tracks: Vec<Track>) -> PolyrhythmState {
    let Some(cycle) = lcm::active_cycle_length(&tracks, state.limits.max_cycle_length) else {
        log::debug!(
            "Edit rejected: cycle would exceed {} steps",
            state.limits.max_cycle_length
        );
        return state.clone();
    };

    lcm::rebuild(&mut tracks, cycle);
    let (current_beat, generation) = if cycle == state.lcm {
        (state.current_beat, state.generation)
    } else {
        (0, state.generation + 1)
    };

    let next = PolyrhythmState {
        tracks: Arc::new(tracks),
        current_beat,
        lcm: cycle,
        tempo: state.tempo,
        generation,
        limits: state.limits,
    };
    next.debug_assert_invariants();
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::state::{Limits, RosterEntry};
    use crate::sequencer::track::Beat;

    fn three_and_four() -> PolyrhythmState {
        PolyrhythmState::with_roster(
            Limits::default(),
            &[RosterEntry::new(3, true), RosterEntry::new(4, true)],
        )
    }

    #[test]
    fn test_toggle_beat_twice_restores() {
        let state = three_and_four();
        let once = transition(&state, Action::ToggleBeat { track: 0, step: 5 });
        assert_ne!(once, state);
        let twice = transition(&once, Action::ToggleBeat { track: 0, step: 5 });
        assert_eq!(twice, state);
    }

    #[test]
    fn test_toggle_beat_out_of_range_is_noop() {
        let state = three_and_four();
        assert_eq!(transition(&state, Action::ToggleBeat { track: 0, step: 12 }), state);
        assert_eq!(transition(&state, Action::ToggleBeat { track: 9, step: 0 }), state);
    }

    #[test]
    fn test_rotate_round_trip() {
        let state = transition(&three_and_four(), Action::ToggleBeat { track: 1, step: 1 });
        let rotated = transition(&state, Action::RotateCw(1));
        assert_ne!(rotated.tracks[1].beats, state.tracks[1].beats);
        assert_eq!(rotated.tracks[1].beats[0], state.tracks[1].beats[11]);
        let back = transition(&rotated, Action::RotateCcw(1));
        assert_eq!(back, state);
    }

    #[test]
    fn test_clear_then_toggle() {
        let state = transition(&three_and_four(), Action::ClearBeats(0));
        assert_eq!(state.tracks[0].on_count(), 0);
        let state = transition(&state, Action::ToggleBeat { track: 0, step: 7 });
        assert_eq!(state.tracks[0].on_count(), 1);
        assert!(state.tracks[0].is_on_at(7));
    }

    #[test]
    fn test_deactivate_shrinks_cycle() {
        let state = three_and_four();
        assert_eq!(state.lcm, 12);

        let state = transition(&state, Action::ToggleActive(0));
        assert_eq!(state.lcm, 4);
        assert_eq!(state.tracks[1].beats, vec![Beat::ON, Beat::OFF, Beat::OFF, Beat::OFF]);
        assert_eq!(state.tracks[0].beats.len(), 4);
        assert_eq!(state.tracks[0].on_count(), 0);
    }

    #[test]
    fn test_cycle_change_resets_position() {
        let state = transition(&three_and_four(), Action::AdvanceBeat(7));
        assert_eq!(state.current_beat, 7);
        let state = transition(&state, Action::ChangeBeatNumber { track: 0, beat_number: 5 });
        assert_eq!(state.lcm, 20);
        assert_eq!(state.current_beat, 0);
        assert_eq!(state.generation, 1);
    }

    #[test]
    fn test_same_cycle_keeps_position_and_regenerates() {
        let state = three_and_four();
        let state = transition(&state, Action::ClearBeats(0));
        let state = transition(&state, Action::AdvanceBeat(5));
        // 3 and 6 with 4 still give 12
        let state = transition(&state, Action::ChangeBeatNumber { track: 0, beat_number: 6 });
        assert_eq!(state.lcm, 12);
        assert_eq!(state.current_beat, 5);
        assert_eq!(state.generation, 0);
        assert_eq!(state.tracks[0].beats, Track::downbeat_pattern(6, 12));
    }

    #[test]
    fn test_change_beat_number_zero_and_clamp() {
        let state = three_and_four();
        assert_eq!(transition(&state, Action::ChangeBeatNumber { track: 0, beat_number: 0 }), state);

        let state = transition(&state, Action::ChangeBeatNumber { track: 0, beat_number: 99 });
        assert_eq!(state.tracks[0].beat_number, 64);
        assert_eq!(state.lcm, 64);
    }

    #[test]
    fn test_change_beat_number_inactive_keeps_cycle() {
        let state = PolyrhythmState::default();
        let next = transition(&state, Action::ChangeBeatNumber { track: 2, beat_number: 7 });
        assert_eq!(next.lcm, state.lcm);
        assert_eq!(next.tracks[2].beat_number, 7);
        assert_eq!(next.tracks[2].on_count(), 0);
    }

    #[test]
    fn test_change_beat_number_over_cycle_limit_rejected() {
        let limits = Limits {
            max_cycle_length: 24,
            ..Limits::default()
        };
        let state = PolyrhythmState::with_roster(
            limits,
            &[RosterEntry::new(3, true), RosterEntry::new(4, true)],
        );
        let next = transition(&state, Action::ChangeBeatNumber { track: 0, beat_number: 7 });
        assert_eq!(next, state);
        let next = transition(&state, Action::ChangeBeatNumber { track: 0, beat_number: 5 });
        assert_eq!(next.lcm, 20);
    }

    #[test]
    fn test_add_track() {
        let state = three_and_four();
        let state = transition(&state, Action::AddTrack);
        assert_eq!(state.tracks.len(), 3);
        let added = &state.tracks[2];
        assert_eq!(added.index, 2);
        assert_eq!(added.beat_number, 4);
        assert!(added.is_active);
        assert_eq!(added.sample, Timbre::round_robin(2));
        assert_eq!(state.lcm, 12);
    }

    #[test]
    fn test_add_track_at_capacity_is_noop() {
        let state = PolyrhythmState::default();
        assert_eq!(state.tracks.len(), 4);
        assert_eq!(transition(&state, Action::AddTrack), state);
    }

    #[test]
    fn test_tempo_clamped() {
        let state = three_and_four();
        assert_eq!(transition(&state, Action::ChangeTempo(5)).tempo, 30);
        assert_eq!(transition(&state, Action::ChangeTempo(180)).tempo, 180);
        assert_eq!(transition(&state, Action::ChangeTempo(9000)).tempo, 400);
    }

    #[test]
    fn test_mute_does_not_touch_pattern() {
        let state = three_and_four();
        let next = transition(&state, Action::ToggleMute(0));
        assert!(next.tracks[0].is_mute);
        assert!(next.tracks[0].is_active);
        assert_eq!(next.tracks[0].beats, state.tracks[0].beats);
        assert_eq!(next.lcm, state.lcm);
    }

    #[test]
    fn test_change_sample() {
        let next = transition(&three_and_four(), Action::ChangeSample { track: 1, sample: Timbre::Glass });
        assert_eq!(next.tracks[1].sample, Timbre::Glass);
    }

    #[test]
    fn test_advance_beat_wraps() {
        let state = transition(&three_and_four(), Action::AdvanceBeat(13));
        assert_eq!(state.current_beat, 1);
    }

    #[test]
    fn test_tick_advances_within_generation() {
        let state = transition(&three_and_four(), Action::AdvanceBeat(11));
        let state = transition(&state, Action::Tick { played_generation: Some(0) });
        assert_eq!(state.current_beat, 0);
        let state = transition(&state, Action::Tick { played_generation: Some(0) });
        assert_eq!(state.current_beat, 1);
    }

    #[test]
    fn test_first_tick_holds_downbeat() {
        let state = transition(&three_and_four(), Action::Tick { played_generation: None });
        assert_eq!(state.current_beat, 0);
    }

    #[test]
    fn test_tick_after_cycle_change_plays_step_zero() {
        // Position 7 was played, then a meter edit rewinds before the next tick
        let played = transition(&three_and_four(), Action::AdvanceBeat(7));
        let edited = transition(&played, Action::ChangeBeatNumber { track: 0, beat_number: 5 });
        let ticked = transition(
            &edited,
            Action::Tick { played_generation: Some(played.generation) },
        );
        assert_eq!(ticked.lcm, 20);
        assert_eq!(ticked.current_beat, 0);
        assert_eq!(ticked.generation, edited.generation);
    }

    #[test]
    fn test_load_preset_replaces_state() {
        let state = transition(&three_and_four(), Action::AdvanceBeat(3));
        let preset = crate::preset::find_builtin("3:2 Polyrhythm").unwrap();
        let next = transition(&state, Action::LoadPreset(Box::new(preset)));
        assert_eq!(next.lcm, 6);
        assert_eq!(next.current_beat, 0);
        assert_eq!(next.generation, state.generation + 1);
        assert_eq!(next.tracks.len(), 4);
    }

    #[test]
    fn test_load_preset_over_limit_is_noop() {
        let limits = Limits {
            max_cycle_length: 10,
            ..Limits::default()
        };
        let state = PolyrhythmState::with_roster(limits, &[RosterEntry::new(2, true)]);
        let preset = crate::preset::find_builtin("5:4 Polyrhythm").unwrap();
        assert_eq!(transition(&state, Action::LoadPreset(Box::new(preset))), state);
    }

    #[test]
    fn test_rebuild_flag() {
        assert!(Action::AddTrack.rebuilds());
        assert!(Action::ToggleActive(0).rebuilds());
        assert!(!Action::ToggleMute(0).rebuilds());
        assert!(!Action::ChangeTempo(90).rebuilds());
    }
}
