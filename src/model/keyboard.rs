use crate::model::notes::{NOTE_TO_MIDI, is_black};
use std::collections::HashMap;

/// Computer keyboard keys bound to piano notes.
pub const KEY_MAP: &[(char, &str)] = &[
    // White keys, octave 3 (bottom letter row)
    ('z', "C3"), ('x', "D3"), ('c', "E3"), ('v', "F3"), ('b', "G3"), ('n', "A3"), ('m', "B3"),
    // White keys, octave 4 (middle letter row)
    ('a', "C4"), ('s', "D4"), ('d', "E4"), ('f', "F4"), ('g', "G4"), ('h', "A4"), ('j', "B4"),
    ('k', "C5"),
    // Black keys, octave 3 (number row)
    ('2', "C#3"), ('3', "D#3"), ('5', "F#3"), ('6', "G#3"), ('7', "A#3"),
    // Black keys, octave 4 (top letter row)
    ('w', "C#4"), ('e', "D#4"), ('t', "F#4"), ('y', "G#4"), ('u', "A#4"),
];

pub const WHITE_KEY_WIDTH: u16 = 3;
pub const BLACK_KEY_WIDTH: u16 = 2;
/// Rows from the top of the piano where black keys sit over the white ones.
pub const BLACK_KEY_ROWS: u16 = 2;

pub fn note_for_key(key: char) -> Option<&'static str> {
    let key = key.to_ascii_lowercase();
    KEY_MAP
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, note)| *note)
}

pub fn key_for_note(note: &str) -> Option<char> {
    KEY_MAP
        .iter()
        .find(|(_, n)| *n == note)
        .map(|(k, _)| *k)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGeometry {
    pub note: &'static str,
    pub binding: Option<char>,
    pub x: u16,
    pub width: u16,
    pub black: bool,
}

/// Column geometry of every piano key, relative to the left edge of the piano.
///
/// Built once; falling notes take their horizontal position from here.
#[derive(Debug, Clone)]
pub struct KeyLayout {
    keys: Vec<KeyGeometry>,
    by_note: HashMap<&'static str, usize>,
    width: u16,
}

impl KeyLayout {
    pub fn new() -> Self {
        let mut keys = Vec::with_capacity(NOTE_TO_MIDI.len());
        let mut white_index: u16 = 0;

        for (note, _) in NOTE_TO_MIDI.iter() {
            if is_black(note) {
                // Straddles the boundary between the previous white key and the next.
                let x = (white_index * WHITE_KEY_WIDTH).saturating_sub(1);
                keys.push(KeyGeometry {
                    note,
                    binding: key_for_note(note),
                    x,
                    width: BLACK_KEY_WIDTH,
                    black: true,
                });
            } else {
                keys.push(KeyGeometry {
                    note,
                    binding: key_for_note(note),
                    x: white_index * WHITE_KEY_WIDTH,
                    width: WHITE_KEY_WIDTH,
                    black: false,
                });
                white_index += 1;
            }
        }

        let by_note = keys
            .iter()
            .enumerate()
            .map(|(i, key)| (key.note, i))
            .collect();

        Self {
            keys,
            by_note,
            width: white_index * WHITE_KEY_WIDTH,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn key(&self, note: &str) -> Option<&KeyGeometry> {
        self.by_note.get(note).map(|&i| &self.keys[i])
    }

    pub fn column(&self, note: &str) -> Option<u16> {
        self.key(note).map(|key| key.x)
    }

    pub fn white_keys(&self) -> impl Iterator<Item = &KeyGeometry> {
        self.keys.iter().filter(|key| !key.black)
    }

    pub fn black_keys(&self) -> impl Iterator<Item = &KeyGeometry> {
        self.keys.iter().filter(|key| key.black)
    }

    /// The key under a piano-relative cell. Black keys only cover the top rows.
    pub fn key_at(&self, x: u16, y: u16) -> Option<&KeyGeometry> {
        let contains = |key: &&KeyGeometry| x >= key.x && x < key.x + key.width;

        if y < BLACK_KEY_ROWS
            && let Some(key) = self.black_keys().find(contains)
        {
            return Some(key);
        }

        self.white_keys().find(contains)
    }
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::notes::midi_for_note;

    #[test]
    fn key_map_targets_real_notes() {
        assert!(KEY_MAP.iter().all(|(_, note)| midi_for_note(note).is_some()));
        assert_eq!(note_for_key('a'), Some("C4"));
        assert_eq!(note_for_key('A'), Some("C4"));
        assert_eq!(note_for_key('u'), Some("A#4"));
        assert_eq!(note_for_key('q'), None);
        assert_eq!(note_for_key(' '), None);
    }

    #[test]
    fn layout_columns() {
        let layout = KeyLayout::new();

        assert_eq!(layout.white_keys().count(), 29);
        assert_eq!(layout.black_keys().count(), 20);
        assert_eq!(layout.width(), 29 * WHITE_KEY_WIDTH);

        assert_eq!(layout.column("C3"), Some(0));
        assert_eq!(layout.column("D3"), Some(3));
        assert_eq!(layout.column("C#3"), Some(2));
        assert_eq!(layout.column("C4"), Some(7 * WHITE_KEY_WIDTH));
        assert_eq!(layout.column("A2"), None);
        assert_eq!(layout.key("C4").and_then(|k| k.binding), Some('a'));
    }

    #[test]
    fn hit_testing_prefers_black_keys_on_top() {
        let layout = KeyLayout::new();

        assert_eq!(layout.key_at(2, 0).map(|k| k.note), Some("C#3"));
        assert_eq!(layout.key_at(2, BLACK_KEY_ROWS).map(|k| k.note), Some("C3"));
        assert_eq!(layout.key_at(0, 0).map(|k| k.note), Some("C3"));
        assert_eq!(layout.key_at(layout.width(), 3), None);
    }
}
