// Preset serialization - State to share string and back
// Loading normalizes whatever arrives into a state that satisfies every invariant

use super::PresetError;
use super::types::{BeatData, PresetData, TrackData};
use crate::sampler::timbre::Timbre;
use crate::sequencer::lcm;
use crate::sequencer::state::{Limits, PolyrhythmState};
use crate::sequencer::track::{Beat, Track};
use serde_json::Value;
use std::sync::Arc;

/// Captures the full sequencer state
pub fn to_preset(state: &PolyrhythmState) -> PresetData {
    PresetData {
        name: None,
        tempo: Some(state.tempo),
        tracks: state
            .tracks
            .iter()
            .map(|track| TrackData {
                index: Some(track.index),
                beat_number: Some(track.beat_number),
                is_active: Some(track.is_active),
                is_mute: Some(track.is_mute),
                sample_name: Some(track.sample.name().to_string()),
                beats: Some(track.beats.iter().map(|b| BeatData::Flag(b.is_on)).collect()),
            })
            .collect(),
    }
}

/// Share string for a state (compact JSON, not percent-encoded)
pub fn share_string(state: &PolyrhythmState) -> Result<String, PresetError> {
    Ok(serde_json::to_string(&to_preset(state))?)
}

/// Parses a share string
///
/// The top level must be a JSON object. Fields inside it are tolerant.
pub fn parse_preset(text: &str) -> Result<PresetData, PresetError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(PresetError::Empty);
    }

    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(PresetError::NotAnObject);
    }

    Ok(serde_json::from_value(value)?)
}

/// Builds a complete state from preset data
///
/// The result always has exactly `max_tracks` tracks. Missing slots are
/// filled with inactive defaults, missing fields take their defaults, and
/// patterns whose length disagrees with the cycle are regenerated.
pub fn normalize(data: &PresetData, limits: &Limits) -> Result<PolyrhythmState, PresetError> {
    let mut tracks = Vec::with_capacity(limits.max_tracks);
    let mut supplied: Vec<Option<Vec<Beat>>> = Vec::with_capacity(limits.max_tracks);

    for index in 0..limits.max_tracks {
        match data.tracks.get(index) {
            Some(entry) => {
                tracks.push(track_from_data(index, entry, limits));
                supplied.push(entry.beats.as_ref().map(|beats| {
                    beats.iter().map(|b| Beat { is_on: b.is_on() }).collect()
                }));
            }
            None => {
                tracks.push(Track::new(
                    index,
                    limits.default_beat_number,
                    false,
                    Timbre::round_robin(index),
                ));
                supplied.push(None);
            }
        }
    }

    let cycle = lcm::active_cycle_length(&tracks, limits.max_cycle_length)
        .ok_or(PresetError::CycleTooLong(limits.max_cycle_length))?;

    for (track, beats) in tracks.iter_mut().zip(supplied) {
        match beats {
            Some(beats) if beats.len() == cycle => track.beats = beats,
            _ => track.regenerate(cycle),
        }
    }

    let state = PolyrhythmState {
        tracks: Arc::new(tracks),
        current_beat: 0,
        lcm: cycle,
        tempo: limits.clamp_tempo(data.tempo.unwrap_or(limits.default_tempo)),
        generation: 0,
        limits: *limits,
    };
    state.debug_assert_invariants();
    Ok(state)
}

fn track_from_data(index: usize, entry: &TrackData, limits: &Limits) -> Track {
    let beat_number = entry
        .beat_number
        .and_then(|n| limits.clamp_beat_number(n))
        .unwrap_or(limits.default_beat_number);
    let sample = entry
        .sample_name
        .as_deref()
        .and_then(Timbre::from_name)
        .unwrap_or_else(|| Timbre::round_robin(index));

    let mut track = Track::new(index, beat_number, entry.is_active.unwrap_or(false), sample);
    track.is_mute = entry.is_mute.unwrap_or(false);
    track
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(matches!(parse_preset(""), Err(PresetError::Empty)));
        assert!(matches!(parse_preset("   "), Err(PresetError::Empty)));
        assert!(matches!(parse_preset("{tempo:"), Err(PresetError::Json(_))));
        assert!(matches!(parse_preset("[1,2]"), Err(PresetError::NotAnObject)));
        assert!(matches!(parse_preset("null"), Err(PresetError::NotAnObject)));
    }

    #[test]
    fn test_normalize_pads_to_max_tracks() {
        let data = parse_preset(
            r#"{"tempo":90,"tracks":[{"beatNumber":3,"isActive":true},{"beatNumber":5,"isActive":true}]}"#,
        )
        .unwrap();
        let state = normalize(&data, &Limits::default()).unwrap();

        assert_eq!(state.tracks.len(), 4);
        assert_eq!(state.lcm, 15);
        assert_eq!(state.tempo, 90);
        assert!(!state.tracks[2].is_active);
        assert!(!state.tracks[3].is_active);
        assert_eq!(state.tracks[2].beat_number, 4);
        assert_eq!(state.tracks[3].sample, Timbre::round_robin(3));
    }

    #[test]
    fn test_normalize_drops_extra_tracks() {
        let entries: Vec<String> = (0..6)
            .map(|_| r#"{"beatNumber":2,"isActive":true}"#.to_string())
            .collect();
        let json = format!(r#"{{"tracks":[{}]}}"#, entries.join(","));
        let state = normalize(&parse_preset(&json).unwrap(), &Limits::default()).unwrap();
        assert_eq!(state.tracks.len(), 4);
    }

    #[test]
    fn test_normalize_defaults() {
        let data = parse_preset(r#"{"tracks":[{"isActive":true,"sampleName":"cowbell","beatNumber":0}]}"#)
            .unwrap();
        let state = normalize(&data, &Limits::default()).unwrap();
        let track = &state.tracks[0];

        assert_eq!(state.tempo, 120);
        assert_eq!(track.beat_number, 4);
        assert_eq!(track.sample, Timbre::round_robin(0));
        assert!(!track.is_mute);
        assert_eq!(state.lcm, 4);
    }

    #[test]
    fn test_normalize_clamps_tempo_and_beat_number() {
        let data = parse_preset(r#"{"tempo":1000,"tracks":[{"beatNumber":500,"isActive":true}]}"#)
            .unwrap();
        let state = normalize(&data, &Limits::default()).unwrap();
        assert_eq!(state.tempo, 400);
        assert_eq!(state.tracks[0].beat_number, 64);
    }

    #[test]
    fn test_normalize_keeps_matching_beats() {
        let data = parse_preset(
            r#"{"tracks":[{"beatNumber":2,"isActive":true,"beats":[false,true]}]}"#,
        )
        .unwrap();
        let state = normalize(&data, &Limits::default()).unwrap();
        assert_eq!(state.tracks[0].beats, vec![Beat::OFF, Beat::ON]);
    }

    #[test]
    fn test_normalize_regenerates_mismatched_beats() {
        let data = parse_preset(
            r#"{"tracks":[{"beatNumber":2,"isActive":true,"beats":[false,true,true]},{"beatNumber":3,"isActive":true}]}"#,
        )
        .unwrap();
        let state = normalize(&data, &Limits::default()).unwrap();
        assert_eq!(state.lcm, 6);
        assert_eq!(state.tracks[0].beats, Track::downbeat_pattern(2, 6));
    }

    #[test]
    fn test_normalize_rejects_cycle_over_limit() {
        let limits = Limits {
            max_cycle_length: 50,
            ..Limits::default()
        };
        let data = parse_preset(
            r#"{"tracks":[{"beatNumber":7,"isActive":true},{"beatNumber":9,"isActive":true}]}"#,
        )
        .unwrap();
        assert!(matches!(normalize(&data, &limits), Err(PresetError::CycleTooLong(50))));
    }

    #[test]
    fn test_share_string_round_trip() {
        let state = PolyrhythmState::default();
        let text = share_string(&state).unwrap();
        let restored = normalize(&parse_preset(&text).unwrap(), &state.limits).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_share_string_shape() {
        let text = share_string(&PolyrhythmState::default()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["tempo"], 120);
        assert_eq!(value["tracks"][1]["beatNumber"], 3);
        assert_eq!(value["tracks"][1]["sampleName"], "plastic");
        assert_eq!(value["tracks"][0]["beats"].as_array().unwrap().len(), 12);
        assert_eq!(value["tracks"][0]["beats"][0], true);
    }
}
