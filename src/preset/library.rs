// Preset library - Built-in rhythms selectable by name

use super::types::{BeatData, PresetData, TrackData};
use crate::sampler::timbre::Timbre;

/// Track entry with an explicit pattern
fn track(index: usize, beat_number: u32, sample: Timbre, pattern: &[u8]) -> TrackData {
    TrackData {
        index: Some(index),
        beat_number: Some(beat_number),
        is_active: Some(true),
        is_mute: Some(false),
        sample_name: Some(sample.name().to_string()),
        beats: Some(pattern.iter().map(|&b| BeatData::Flag(b == 1)).collect()),
    }
}

/// Track entry whose pattern is generated on load
fn meter(index: usize, beat_number: u32, sample: Timbre) -> TrackData {
    TrackData {
        index: Some(index),
        beat_number: Some(beat_number),
        is_active: Some(true),
        is_mute: Some(false),
        sample_name: Some(sample.name().to_string()),
        beats: None,
    }
}

fn preset(name: &str, tempo: u32, tracks: Vec<TrackData>) -> PresetData {
    PresetData {
        name: Some(name.to_string()),
        tempo: Some(tempo),
        tracks,
    }
}

/// All built-in presets
pub fn builtin_presets() -> Vec<PresetData> {
    vec![
        preset(
            "3:2 Polyrhythm",
            120,
            vec![
                track(0, 3, Timbre::Cardboard, &[1, 0, 0, 1, 0, 0]),
                track(1, 2, Timbre::Plastic, &[1, 0, 1, 0, 1, 0]),
            ],
        ),
        preset(
            "4:3 Polyrhythm",
            100,
            vec![
                meter(0, 4, Timbre::Wood),
                meter(1, 3, Timbre::Metal),
            ],
        ),
        preset(
            "5:4 Polyrhythm",
            90,
            vec![
                meter(0, 5, Timbre::Cardboard),
                meter(1, 4, Timbre::Glass),
            ],
        ),
        preset(
            "Clave Over Six",
            110,
            vec![
                track(0, 2, Timbre::Wood, &[1, 0, 0, 1, 0, 0, 1, 0, 0, 0, 1, 0]),
                meter(1, 3, Timbre::Shaker),
                meter(2, 4, Timbre::Cardboard),
            ],
        ),
    ]
}

/// Case-insensitive lookup by preset name
pub fn find_builtin(name: &str) -> Option<PresetData> {
    builtin_presets().into_iter().find(|preset| {
        preset
            .name
            .as_deref()
            .is_some_and(|n| n.eq_ignore_ascii_case(name.trim()))
    })
}
