use crate::model::song::{Metadata, NoteEvent, Song};
use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Songs available for play, in the order they were added.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    songs: Vec<Arc<Song>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding the songs that ship with the game.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert(fur_elise());
        catalog.insert(twinkle_twinkle());
        catalog
    }

    /// Adds a song, replacing any song with the same title.
    ///
    /// Events are stable-sorted by offset so the spawn cursor never has to look back.
    pub fn insert(&mut self, mut song: Song) -> Arc<Song> {
        let before = song.events.clone();
        song.events
            .sort_by(|a, b| a.offset_seconds.total_cmp(&b.offset_seconds));

        if before != song.events {
            debug!("Reordered events of '{}' by offset..!", song.title());
        }

        for event in song.events.iter_mut() {
            if event.offset_seconds < 0.0 {
                warn!(
                    "Clamping negative offset {:.3}s in '{}' to zero..!",
                    event.offset_seconds, song.metadata.title
                );
                event.offset_seconds = 0.0;
            }
        }

        let song = Arc::new(song);
        if let Some(slot) = self
            .songs
            .iter_mut()
            .find(|s| s.title() == song.title())
        {
            info!("Replacing song '{}'..!", song.title());
            *slot = Arc::clone(&song);
        } else {
            self.songs.push(Arc::clone(&song));
        }

        song
    }

    pub fn get(&self, title: &str) -> Option<Arc<Song>> {
        self.songs.iter().find(|s| s.title() == title).cloned()
    }

    pub fn titles(&self) -> Vec<&str> {
        self.songs.iter().map(|s| s.title()).collect()
    }

    pub fn songs(&self) -> &[Arc<Song>] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Reads a YAML song file (a list of songs) and adds every song in it.
    pub fn load_yaml<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read song file {}", path.display()))?;
        let songs = parse_song_yaml(&text)
            .with_context(|| format!("Failed to parse song file {}", path.display()))?;

        let count = songs.len();
        for song in songs {
            self.insert(song);
        }

        info!("Loaded {} song(s) from {}..!", count, path.display());
        Ok(count)
    }
}

pub fn parse_song_yaml(text: &str) -> Result<Vec<Song>> {
    let songs: Vec<Song> = serde_yaml::from_str(text)?;

    for song in songs.iter() {
        if song.metadata.title.trim().is_empty() {
            bail!("Song without a title..!");
        }
        if let Some(event) = song.events.iter().find(|e| e.pitches.is_empty()) {
            bail!(
                "Event at {:.3}s in '{}' has no pitches..!",
                event.offset_seconds,
                song.title()
            );
        }
        if let Some(event) = song.events.iter().find(|e| !e.offset_seconds.is_finite()) {
            bail!(
                "Event with offset {} in '{}' never plays..!",
                event.offset_seconds,
                song.title()
            );
        }
        if let Some(event) = song
            .events
            .iter()
            .find(|e| !e.duration_seconds.is_finite() || e.duration_seconds < 0.0)
        {
            bail!(
                "Event at {:.3}s in '{}' has a bad duration {}..!",
                event.offset_seconds,
                song.title(),
                event.duration_seconds
            );
        }
    }

    Ok(songs)
}

fn fur_elise() -> Song {
    let e = NoteEvent::new;

    Song {
        metadata: Metadata {
            title: String::from("Für Elise (Easy Mouse Version)"),
            tempo_bpm: None,
        },
        events: vec![
            // Measure 1
            e(0.0, &["E5"], 0.4),
            e(0.5, &["D#5"], 0.4),
            e(1.0, &["E5"], 0.4),
            e(1.5, &["D#5"], 0.4),
            e(2.0, &["E5"], 0.4),
            e(2.5, &["B4"], 0.4),
            e(3.0, &["D5"], 0.4),
            e(3.5, &["C5"], 0.4),
            e(0.0, &["A2", "A3"], 3.9),
            // Measure 2
            e(4.0, &["A4"], 1.9),
            e(4.0, &["C3", "C4"], 1.9),
            // Measure 3
            e(6.0, &["E4"], 0.4),
            e(6.5, &["A4"], 0.4),
            e(7.0, &["B4"], 1.9),
            e(6.0, &["E2", "E3"], 3.9),
            // Measure 4
            e(8.0, &["E4"], 1.9),
            e(8.0, &["A2", "A3"], 1.9),
        ],
    }
}

fn twinkle_twinkle() -> Song {
    let e = NoteEvent::new;

    Song {
        metadata: Metadata {
            title: String::from("Twinkle Twinkle Little Star"),
            tempo_bpm: None,
        },
        events: vec![
            e(0.0, &["C4"], 0.4),
            e(0.5, &["C4"], 0.4),
            e(1.0, &["G4"], 0.4),
            e(1.5, &["G4"], 0.4),
            e(2.0, &["A4"], 0.4),
            e(2.5, &["A4"], 0.4),
            e(3.0, &["G4"], 0.9),
        ],
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builtin_songs() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.titles(),
            vec!["Für Elise (Easy Mouse Version)", "Twinkle Twinkle Little Star"]
        );

        let twinkle = catalog.get("Twinkle Twinkle Little Star").unwrap();
        assert_eq!(twinkle.events.len(), 7);
        assert_eq!(twinkle.last_offset(), 3.0);
        assert!(catalog.get("Chopsticks").is_none());
    }

    #[test]
    fn events_sorted_on_insert() {
        let catalog = Catalog::builtin();
        let elise = catalog.get("Für Elise (Easy Mouse Version)").unwrap();

        assert!(
            elise
                .events
                .windows(2)
                .all(|pair| pair[0].offset_seconds <= pair[1].offset_seconds)
        );

        // Stable: the melody note listed first keeps its place ahead of the chord.
        assert_eq!(elise.events[0].pitches, vec!["E5"]);
        assert_eq!(elise.events[1].pitches, vec!["A2", "A3"]);
        assert_eq!(elise.note_count(), 21);
    }

    #[test]
    fn insert_replaces_by_title() {
        let mut catalog = Catalog::builtin();
        let replacement = Song {
            metadata: Metadata {
                title: String::from("Twinkle Twinkle Little Star"),
                tempo_bpm: Some(90.0),
            },
            events: vec![NoteEvent::new(0.0, &["C4", "E4", "G4"], 1.0)],
        };

        catalog.insert(replacement);
        assert_eq!(catalog.len(), 2);

        let twinkle = catalog.get("Twinkle Twinkle Little Star").unwrap();
        assert_eq!(twinkle.events.len(), 1);
        assert!(twinkle.events[0].is_chord());
    }

    #[test]
    fn yaml_song_file() {
        let text = r#"
- metadata:
    title: Scale
  events:
    - { offset_seconds: 1.0, pitches: [D4], duration_seconds: 0.4 }
    - { offset_seconds: 0.0, pitches: [C4], duration_seconds: 0.4 }
    - { offset_seconds: 2.0, pitches: [C4, E4, G4], duration_seconds: 1.5 }
"#;

        let songs = parse_song_yaml(text).unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].metadata.tempo_bpm, None);

        let mut catalog = Catalog::new();
        let song = catalog.insert(songs.into_iter().next().unwrap());
        assert_eq!(song.events[0].pitches, vec!["C4"]);
        assert_eq!(song.events[2].pitches.len(), 3);
    }

    #[test]
    fn yaml_rejects_empty_chord() {
        let text = r#"
- metadata: { title: Broken }
  events:
    - { offset_seconds: 0.0, pitches: [], duration_seconds: 0.4 }
"#;
        assert!(parse_song_yaml(text).is_err());
    }

    #[test]
    fn yaml_rejects_non_finite_offsets() {
        let song = |offset: &str, duration: &str| {
            format!(
                "- metadata: {{ title: Broken }}\n  events:\n    - {{ offset_seconds: 0.0, pitches: [C4], duration_seconds: 0.4 }}\n    - {{ offset_seconds: {}, pitches: [D4], duration_seconds: {} }}\n",
                offset, duration
            )
        };

        assert!(parse_song_yaml(&song("0.5", "0.4")).is_ok());
        assert!(parse_song_yaml(&song(".nan", "0.4")).is_err());
        assert!(parse_song_yaml(&song(".inf", "0.4")).is_err());
        assert!(parse_song_yaml(&song("-.inf", "0.4")).is_err());
        assert!(parse_song_yaml(&song("0.5", ".nan")).is_err());
        assert!(parse_song_yaml(&song("0.5", "-1.0")).is_err());
    }
}
