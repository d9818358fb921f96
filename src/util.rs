use crate::midi_importer::import_midi_file;
use crate::model::catalog::Catalog;
use crate::model::config::SongArgs;
use crate::model::instruments::GENERAL_MIDI_INSTRUMENTS;
use crate::model::notes::midi_for_note;
use crate::model::song::NoteEvent;
use anyhow::Result;
use log::info;

/// A General MIDI program from a number or (part of) an instrument name.
pub fn parse_instrument(input: &str) -> u8 {
    let input = input.trim();

    if let Ok(program) = input.parse::<u8>() {
        if program <= 127 {
            return program;
        }
        info!("Program {} is out of range, defaulting to 0 (Acoustic Grand Piano)..!", program);
        return 0;
    }

    let needle = input.to_lowercase();
    match GENERAL_MIDI_INSTRUMENTS
        .iter()
        .position(|name| name.to_lowercase().contains(&needle))
    {
        Some(program) => program as u8,
        None => {
            info!(
                "Unknown instrument '{}', defaulting to 0 (Acoustic Grand Piano)..!",
                input
            );
            0
        }
    }
}

/// The built-in songs plus every song file and MIDI file named on the command line.
pub fn build_catalog(args: &SongArgs) -> Result<Catalog> {
    let mut catalog = Catalog::builtin();

    for path in args.song_files.iter() {
        catalog.load_yaml(path)?;
    }

    for path in args.midi_files.iter() {
        info!("Importing MIDI file: '{}'...", path.display());
        let song = import_midi_file(path, args.transpose, None)?;
        info!(
            "Imported song '{}' with {} events..!",
            song.title(),
            song.events.len()
        );
        catalog.insert(song);
    }

    Ok(catalog)
}

/// One line per event: pitches with their MIDI numbers, or `<no-mapping>`.
pub fn describe_event(event: &NoteEvent) -> String {
    let pitches = event
        .pitches
        .iter()
        .map(|p| match midi_for_note(p) {
            Some(midi) => format!("{}={}", p, midi),
            None => format!("{}=<no-mapping>", p),
        })
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "offset={:.3}s dur={:.3}s pitches=[{}]",
        event.offset_seconds, event.duration_seconds, pitches
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn instruments_by_number_or_name() {
        assert_eq!(parse_instrument("0"), 0);
        assert_eq!(parse_instrument(" 40 "), 40);
        assert_eq!(parse_instrument("200"), 0);
        assert_eq!(parse_instrument("violin"), 40);
        assert_eq!(parse_instrument("Pan Flute"), 75);
        assert_eq!(parse_instrument("kazoo"), 0);
    }

    #[test]
    fn event_descriptions() {
        let event = NoteEvent::new(0.5, &["C4", "A2"], 0.4);
        assert_eq!(
            describe_event(&event),
            "offset=0.500s dur=0.400s pitches=[C4=60 A2=<no-mapping>]"
        );
    }

    #[test]
    fn catalog_without_extra_files() {
        let catalog = build_catalog(&SongArgs::default()).unwrap();
        assert_eq!(catalog.len(), 2);

        let missing = SongArgs {
            song_files: vec!["./no/such/songs.yaml".into()],
            ..SongArgs::default()
        };
        assert!(build_catalog(&missing).is_err());
    }
}
