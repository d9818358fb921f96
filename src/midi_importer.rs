use crate::model::notes::{HIGHEST_MIDI, LOWEST_MIDI, note_for_midi};
use crate::model::song::*;
use anyhow::{Result, anyhow};
use log::{debug, warn};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const EPSILON_MS: f64 = 2.0;
const DEFAULT_MPQN: u32 = 500_000;
const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;

/// The piano's full range, used when importing without an explicit range.
pub const PIANO_RANGE: (u8, u8) = (LOWEST_MIDI, HIGHEST_MIDI);

struct NoteInterval {
    pub midi: u8,
    pub start_tick: u64,
    pub end_tick: u64,
}

#[derive(Debug, Clone)]
struct TempoSegment {
    pub mpqn: u32,
    pub start_tick: u64,
    pub ms_at_start: f64,
}

#[derive(Debug, Clone, Copy)]
struct TimedNote {
    midi: u8,
    time_ms: f64,
    duration_ms: f64,
}

/// Imports a Standard MIDI file as a song, keeping chords.
///
/// Every note is transposed, then folded by octaves into `clip_to_range`
/// (the piano's range if `None`); notes that still don't fit are dropped.
pub fn import_midi_file<P: AsRef<Path>>(
    path: P,
    transpose_semitones: i32,
    clip_to_range: Option<(u8, u8)>,
) -> Result<Song> {
    let bytes = fs::read(path.as_ref()).map_err(|e| {
        anyhow!(
            "Failed to read MIDI file {}: {}",
            path.as_ref().display(),
            e
        )
    })?;

    let fallback_title = path
        .as_ref()
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Imported Song");

    midi_bytes_to_song(&bytes, fallback_title, transpose_semitones, clip_to_range)
}

pub fn midi_bytes_to_song(
    bytes: &[u8],
    fallback_title: &str,
    transpose_semitones: i32,
    clip_to_range: Option<(u8, u8)>,
) -> Result<Song> {
    let smf = Smf::parse(bytes).map_err(|e| anyhow!("Failed to parse MIDI: {:?}", e))?;

    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(t) => t.as_int() as u64,
        Timing::Timecode(_fps, _subframe) => {
            return Err(anyhow!(
                "SMPTE timecode midi timing is not currently supported..!"
            ));
        }
    };

    let mut track_name = String::new();

    debug!("Ticks per quarter note: {}", ticks_per_quarter);
    debug!(
        "MIDI format: {:?}, tracks: {}",
        smf.header.format,
        smf.tracks.len()
    );

    let mut tempo_changes: Vec<(u64, u32)> = Vec::new();
    tempo_changes.push((0u64, DEFAULT_MPQN)); // ~120bpm until a tempo meta appears

    let mut intervals: Vec<NoteInterval> = Vec::new();
    let mut open_notes: HashMap<(u8, u8), Vec<u64>> = HashMap::new();

    for (track_idx, track) in smf.tracks.iter().enumerate() {
        let mut abs_tick: u64 = 0;
        for event in track.iter() {
            abs_tick = abs_tick.saturating_add(event.delta.as_int() as u64);

            match &event.kind {
                TrackEventKind::Meta(meta) => match meta {
                    MetaMessage::Tempo(micro) => {
                        let mpqn: u32 = micro.as_int();
                        tempo_changes.push((abs_tick, mpqn));
                        debug!(
                            "Tempo change at tick {} -> {} us/qn (track {})",
                            abs_tick, mpqn, track_idx
                        );
                    }
                    MetaMessage::TrackName(bytes) => {
                        if track_name.is_empty() {
                            track_name = String::from_utf8_lossy(bytes).into_owned();
                            debug!("Track name: {}", track_name);
                        }
                    }
                    _ => {}
                },
                TrackEventKind::Midi { channel, message } => {
                    let ch: u8 = channel.as_int();

                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            open_notes
                                .entry((ch, key.as_int()))
                                .or_default()
                                .push(abs_tick);
                        }
                        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                            close_note(&mut open_notes, &mut intervals, ch, key.as_int(), abs_tick);
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }
    }

    let last_tick_estimate = intervals
        .iter()
        .map(|interval| interval.end_tick)
        .max()
        .unwrap_or(0)
        .max(
            tempo_changes
                .iter()
                .map(|(tick, _)| *tick)
                .max()
                .unwrap_or(0),
        );

    for ((ch, key), stack) in open_notes.into_iter() {
        for start_tick in stack {
            let end_tick = if last_tick_estimate > start_tick {
                last_tick_estimate
            } else {
                start_tick + ticks_per_quarter
            };

            intervals.push(NoteInterval {
                midi: key,
                start_tick,
                end_tick,
            });

            warn!(
                "Unclosed NoteOn for {}, channel: {} at tick: {} auto-closing at: {}..!",
                key, ch, start_tick, end_tick
            );
        }
    }

    let mut last_tick: u64 = 0;
    let mut ms_accum: f64 = 0.0;
    let mut last_mpqn: u32 = DEFAULT_MPQN;
    let mut tempo_segments: Vec<TempoSegment> = Vec::new();

    tempo_changes.sort_by_key(|(tick, _)| *tick);

    for (tick, mpqn) in tempo_changes.into_iter() {
        if tick > last_tick {
            let delta_ticks = (tick - last_tick) as f64;
            ms_accum += delta_ticks * (last_mpqn as f64) / (ticks_per_quarter as f64) / 1000.0;
        }

        // A later tempo at the same tick overrides the earlier one.
        if let Some(segment) = tempo_segments.last_mut()
            && segment.start_tick == tick
        {
            segment.mpqn = mpqn;
        } else {
            tempo_segments.push(TempoSegment {
                start_tick: tick,
                mpqn,
                ms_at_start: ms_accum,
            });
        }

        last_tick = tick;
        last_mpqn = mpqn;
    }

    let ticks_to_ms = |tick: u64| -> f64 {
        let segment = match tempo_segments.iter().rfind(|seg| seg.start_tick <= tick) {
            Some(s) => s,
            None => &tempo_segments[0],
        };

        let delta_ticks = (tick - segment.start_tick) as f64;
        segment.ms_at_start
            + delta_ticks * (segment.mpqn as f64) / (ticks_per_quarter as f64) / 1000.0
    };

    let (min_id, max_id) = clip_to_range.unwrap_or(PIANO_RANGE);
    let (min_id, max_id) = (min_id as i32, max_id as i32);

    let mut notes: Vec<TimedNote> = Vec::new();
    for interval in intervals.into_iter() {
        let mut note_id = interval.midi as i32 + transpose_semitones;

        let mut attempts = 0;
        while (note_id < min_id || note_id > max_id) && attempts < 8 {
            if note_id < min_id {
                note_id += 12;
            } else if note_id > max_id {
                note_id -= 12;
            }
            attempts += 1;
        }

        if note_id < min_id || note_id > max_id {
            warn!(
                "Dropping note {} (during octave transpose) as it was not in range [{}..={}]..!",
                interval.midi, min_id, max_id
            );
            continue;
        }

        let start_ms = ticks_to_ms(interval.start_tick);
        let end_ms = ticks_to_ms(interval.end_tick);

        if end_ms - start_ms < EPSILON_MS {
            debug!(
                "Skipping tiny midi note {}, start: {} end: {}..!",
                interval.midi, start_ms, end_ms
            );
            continue;
        }

        notes.push(TimedNote {
            midi: note_id as u8,
            time_ms: start_ms,
            duration_ms: end_ms - start_ms,
        });
    }

    notes.sort_by(|a, b| {
        a.time_ms
            .total_cmp(&b.time_ms)
            .then_with(|| a.midi.cmp(&b.midi))
    });

    // The first segment comes from our default mpqn, so prefer the file's own.
    let tempo_bpm = tempo_segments
        .get(1)
        .or(tempo_segments.first())
        .map(|tempo| MICROSECONDS_PER_MINUTE / (tempo.mpqn as f64));

    let title = if track_name.trim().is_empty() {
        fallback_title.to_owned()
    } else {
        track_name.trim().to_owned()
    };

    Ok(Song {
        metadata: Metadata { title, tempo_bpm },
        events: group_into_chords(notes),
    })
}

fn close_note(
    open_notes: &mut HashMap<(u8, u8), Vec<u64>>,
    intervals: &mut Vec<NoteInterval>,
    ch: u8,
    midi_num: u8,
    abs_tick: u64,
) {
    if let Some(start_tick) = open_notes
        .get_mut(&(ch, midi_num))
        .and_then(|stack| stack.pop())
    {
        intervals.push(NoteInterval {
            midi: midi_num,
            start_tick,
            end_tick: abs_tick,
        });
    } else {
        debug!(
            "Orphaned NoteOff for {} ch{} at tick {}..!",
            midi_num, ch, abs_tick
        );
    }
}

/// Notes that start and end together (within epsilon) become a single chord
/// event. Expects `notes` sorted by start time.
fn group_into_chords(notes: Vec<TimedNote>) -> Vec<NoteEvent> {
    let mut groups: Vec<(f64, f64, Vec<u8>)> = Vec::new();

    for note in notes.into_iter() {
        let joined = groups
            .iter_mut()
            .rev()
            .take_while(|(time_ms, _, _)| note.time_ms - *time_ms <= EPSILON_MS)
            .find(|(_, duration_ms, pitches)| {
                (note.duration_ms - *duration_ms).abs() <= EPSILON_MS
                    && !pitches.contains(&note.midi)
            });

        if let Some((_, _, pitches)) = joined {
            pitches.push(note.midi);
        } else {
            groups.push((note.time_ms, note.duration_ms, vec![note.midi]));
        }
    }

    groups
        .into_iter()
        .map(|(time_ms, duration_ms, pitches)| NoteEvent {
            offset_seconds: time_ms / 1000.0,
            pitches: pitches
                .into_iter()
                .filter_map(|midi| {
                    let name = note_for_midi(midi);
                    if name.is_none() {
                        warn!("No note name for MIDI {}, dropping it..!", midi);
                    }
                    name.map(str::to_owned)
                })
                .collect(),
            duration_seconds: duration_ms / 1000.0,
        })
        .filter(|event| !event.pitches.is_empty())
        .collect()
}
