// Preset types - Shareable sequencer snapshot
// Every field is optional on input so partial or hand-edited presets still load

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Serialized sequencer state, as exchanged through share links
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetData {
    /// Display name (built-in presets only, ignored by the engine)
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tempo: Option<u32>,

    /// Raw track entries; a malformed entry becomes a default track
    #[serde(default, deserialize_with = "lenient_tracks")]
    pub tracks: Vec<TrackData>,
}

/// Serialized track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackData {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub beat_number: Option<u32>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub is_mute: Option<bool>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub sample_name: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub beats: Option<Vec<BeatData>>,
}

/// A step is either a bare flag or an `{ "isOn": bool }` object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BeatData {
    Flag(bool),
    Object {
        #[serde(rename = "isOn")]
        is_on: bool,
    },
}

impl BeatData {
    pub fn is_on(&self) -> bool {
        match *self {
            BeatData::Flag(is_on) | BeatData::Object { is_on } => is_on,
        }
    }
}

impl From<bool> for BeatData {
    fn from(is_on: bool) -> Self {
        BeatData::Flag(is_on)
    }
}

/// Deserializes a field, turning a value of the wrong shape into `None`
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Track list that keeps positions: entries that are not objects become defaults
fn lenient_tracks<'de, D>(deserializer: D) -> Result<Vec<TrackData>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(entries) = value else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .map(|entry| serde_json::from_value(entry).unwrap_or_default())
        .collect())
}
