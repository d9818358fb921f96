/// Every note the piano can sound, from C3 up to C7 inclusive.
pub const NOTE_TO_MIDI: &[(&str, u8)] = &[
    ("C3", 48), ("C#3", 49), ("D3", 50), ("D#3", 51), ("E3", 52), ("F3", 53), ("F#3", 54),
    ("G3", 55), ("G#3", 56), ("A3", 57), ("A#3", 58), ("B3", 59), ("C4", 60), ("C#4", 61),
    ("D4", 62), ("D#4", 63), ("E4", 64), ("F4", 65), ("F#4", 66), ("G4", 67), ("G#4", 68),
    ("A4", 69), ("A#4", 70), ("B4", 71), ("C5", 72), ("C#5", 73), ("D5", 74), ("D#5", 75),
    ("E5", 76), ("F5", 77), ("F#5", 78), ("G5", 79), ("G#5", 80), ("A5", 81), ("A#5", 82),
    ("B5", 83), ("C6", 84), ("C#6", 85), ("D6", 86), ("D#6", 87), ("E6", 88), ("F6", 89),
    ("F#6", 90), ("G6", 91), ("G#6", 92), ("A6", 93), ("A#6", 94), ("B6", 95), ("C7", 96),
];

pub const LOWEST_MIDI: u8 = 48;
pub const HIGHEST_MIDI: u8 = 96;

/// Pitch for a note name such as `"C#4"`, if the piano has it.
pub fn midi_for_note(name: &str) -> Option<u8> {
    NOTE_TO_MIDI
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, midi)| *midi)
}

pub fn note_for_midi(midi: u8) -> Option<&'static str> {
    NOTE_TO_MIDI
        .iter()
        .find(|(_, m)| *m == midi)
        .map(|(name, _)| *name)
}

pub fn is_black(name: &str) -> bool {
    name.contains('#')
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_is_chromatic() {
        assert_eq!(NOTE_TO_MIDI.len(), (HIGHEST_MIDI - LOWEST_MIDI + 1) as usize);
        assert!(
            NOTE_TO_MIDI
                .windows(2)
                .all(|pair| pair[1].1 == pair[0].1 + 1)
        );
    }

    #[test]
    fn lookups() {
        assert_eq!(midi_for_note("C4"), Some(60));
        assert_eq!(midi_for_note("A#6"), Some(94));
        assert_eq!(midi_for_note("A2"), None);
        assert_eq!(midi_for_note("c4"), None);
        assert_eq!(note_for_midi(72), Some("C5"));
        assert_eq!(note_for_midi(47), None);
        assert!(is_black("F#3"));
        assert!(!is_black("F3"));
    }
}
