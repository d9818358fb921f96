use serde::{Deserialize, Serialize};

/// One or more pitches struck together at `offset_seconds` into the song.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NoteEvent {
    pub offset_seconds: f64,
    pub pitches: Vec<String>,
    pub duration_seconds: f64,
}

impl NoteEvent {
    pub fn new(offset_seconds: f64, pitches: &[&str], duration_seconds: f64) -> Self {
        Self {
            offset_seconds,
            pitches: pitches.iter().map(|p| p.to_string()).collect(),
            duration_seconds,
        }
    }

    pub fn is_chord(&self) -> bool {
        self.pitches.len() > 1
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: String,
    #[serde(default)]
    pub tempo_bpm: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Song {
    pub metadata: Metadata,
    pub events: Vec<NoteEvent>,
}

impl Song {
    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    /// Offset of the last event to spawn, or zero for an empty song.
    pub fn last_offset(&self) -> f64 {
        self.events
            .iter()
            .map(|e| e.offset_seconds)
            .fold(0.0, f64::max)
    }

    pub fn note_count(&self) -> usize {
        self.events.iter().map(|e| e.pitches.len()).sum()
    }
}
