use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreMetadata {
    pub time_signature: String,
    pub key_signature: String,
    /// Microseconds per quarter note.
    pub tempo: u32,
    pub ppq: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    pub id: String,
    pub midi: u8,
    pub ticks: u64,
    pub duration_ticks: u64,
    pub track: u32,
    pub channel: u8,
    pub velocity: u8,
    pub accidental: Option<String>,
    pub note_name_with_octave: String,
}

/// Response body of a successful conversion.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedScore {
    pub metadata: ScoreMetadata,
    pub all_parsed_notes: Vec<NoteEvent>,
}
