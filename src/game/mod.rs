use crate::model::config::GameConfig;
use crate::model::keyboard::KeyLayout;
use crate::model::notes::midi_for_note;
use crate::model::song::Song;
use log::{debug, info};
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod clock;

use clock::PlaybackClock;

pub const HIT_REWARD: i64 = 10;
pub const MISS_PENALTY: i64 = 5;
/// How long after the last note spawns before the song loops back to idle.
pub const FINISH_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_FIELD_HEIGHT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(u64);

/// A spawned note on its way down the field.
#[derive(Debug, Clone, PartialEq)]
pub struct FallingNote {
    pub id: NoteId,
    pub note: String,
    pub duration_seconds: f64,
    /// Rows fallen since spawn.
    pub vertical_position: f64,
    /// Column of the matching key, fixed at spawn.
    pub horizontal_position: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Spawned { id: NoteId, note: String, column: u16 },
    Missed { id: NoteId, note: String },
    /// The last event of the song has spawned during run `run`.
    SongFinished { run: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub state: PlayState,
    pub score: i64,
    pub next_event_index: usize,
    pub elapsed: Duration,
    pub active_notes: usize,
}

/// The falling-notes timing and scoring engine.
#[derive(Debug)]
pub struct Game {
    config: GameConfig,
    field_height: f64,
    song: Option<Arc<Song>>,
    state: PlayState,
    clock: PlaybackClock,
    next_event_index: usize,
    score: i64,
    active: Vec<FallingNote>,
    next_note_id: u64,
    run: u64,
}

impl Game {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            field_height: DEFAULT_FIELD_HEIGHT,
            song: None,
            state: PlayState::Stopped,
            clock: PlaybackClock::new(),
            next_event_index: 0,
            score: 0,
            active: Vec::new(),
            next_note_id: 0,
            run: 0,
        }
    }

    /// Swaps in a song (or none, for free play) and starts over.
    pub fn load_song(&mut self, song: Option<Arc<Song>>) {
        if let Some(song) = song.as_ref() {
            info!(
                "Loaded song: '{}' with {} events..!",
                song.title(),
                song.events.len()
            );
        }

        self.song = song;
        self.reset();
    }

    pub fn song(&self) -> Option<&Song> {
        self.song.as_deref()
    }

    pub fn start(&mut self, now: Instant) {
        if self.state == PlayState::Playing {
            return;
        }

        self.clock.start(now);
        self.state = PlayState::Playing;
        debug!("Playback started at {:?}..!", self.clock.elapsed(now));
    }

    pub fn pause(&mut self, now: Instant) {
        if self.state != PlayState::Playing {
            return;
        }

        self.clock.pause(now);
        self.state = PlayState::Paused;
        debug!("Playback paused at {:?}..!", self.clock.elapsed(now));
    }

    pub fn toggle(&mut self, now: Instant) {
        match self.state {
            PlayState::Playing => self.pause(now),
            PlayState::Stopped | PlayState::Paused => self.start(now),
        }
    }

    /// Back to a stopped, empty field. Any pending auto-reset from the previous
    /// run becomes stale.
    pub fn reset(&mut self) {
        self.state = PlayState::Stopped;
        self.clock.reset();
        self.next_event_index = 0;
        self.score = 0;
        self.active.clear();
        self.run += 1;
    }

    /// The deferred end-of-song reset. Does nothing unless `run` is still current.
    pub fn finish(&mut self, run: u64) -> bool {
        if run != self.run {
            debug!("Ignoring stale finish for run {} (now {})..!", run, self.run);
            return false;
        }

        info!("Song finished with score {}, resetting..!", self.score);
        self.reset();
        true
    }

    /// One frame: spawn what is due, move everything down, collect misses.
    pub fn tick(&mut self, now: Instant, layout: &KeyLayout) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.state != PlayState::Playing {
            return events;
        }

        let elapsed = self.clock.elapsed(now).as_secs_f64();

        if let Some(song) = self.song.clone() {
            let mut spawned_any = false;

            while let Some(event) = song.events.get(self.next_event_index)
                && event.offset_seconds <= elapsed
            {
                for pitch in event.pitches.iter() {
                    let note = self.spawn(pitch, event.duration_seconds, layout);
                    events.push(GameEvent::Spawned {
                        id: note.id,
                        note: note.note.clone(),
                        column: note.horizontal_position,
                    });
                }

                self.next_event_index += 1;
                spawned_any = true;
            }

            if spawned_any && self.next_event_index == song.events.len() {
                events.push(GameEvent::SongFinished { run: self.run });
            }
        }

        let step = self.config.fall_speed / self.config.frame_rate;
        for note in self.active.iter_mut() {
            note.vertical_position += step;
        }

        let height = self.field_height;
        let (missed, kept): (Vec<_>, Vec<_>) = mem::take(&mut self.active)
            .into_iter()
            .partition(|note| note.vertical_position >= height);
        self.active = kept;

        for note in missed {
            self.score -= MISS_PENALTY;
            if self.config.verbose {
                info!("Missed {} | score: {}", note.note, self.score);
            }
            events.push(GameEvent::Missed {
                id: note.id,
                note: note.note,
            });
        }

        events
    }

    fn spawn(&mut self, pitch: &str, duration_seconds: f64, layout: &KeyLayout) -> &FallingNote {
        let id = NoteId(self.next_note_id);
        self.next_note_id += 1;

        let horizontal_position = layout.column(pitch).unwrap_or(0);
        if self.config.verbose {
            info!(
                "Spawning {:6} | column: {:>3} | duration: {:.3}s",
                pitch, horizontal_position, duration_seconds
            );
        }

        self.active.push(FallingNote {
            id,
            note: pitch.to_owned(),
            duration_seconds,
            vertical_position: 0.0,
            horizontal_position,
        });

        &self.active[self.active.len() - 1]
    }

    /// A press of `note`'s key. Credits at most one note: the earliest spawned
    /// one inside the hit window.
    pub fn hit(&mut self, note: &str) -> Option<FallingNote> {
        midi_for_note(note)?;

        let (top, bottom) = self.hit_window();
        let index = self.active.iter().position(|n| {
            n.note == note && n.vertical_position >= top && n.vertical_position <= bottom
        })?;

        let hit = self.active.remove(index);
        self.score += HIT_REWARD;
        if self.config.verbose {
            info!(
                "Hit {} at row {:.2} | score: {}",
                hit.note, hit.vertical_position, self.score
            );
        }

        Some(hit)
    }

    /// Top and bottom row of the hit window.
    pub fn hit_window(&self) -> (f64, f64) {
        (
            self.field_height - self.config.hit_window,
            self.field_height,
        )
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn set_field_height(&mut self, rows: f64) {
        self.field_height = rows.max(1.0);
    }

    pub fn field_height(&self) -> f64 {
        self.field_height
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn run(&self) -> u64 {
        self.run
    }

    pub fn next_event_index(&self) -> usize {
        self.next_event_index
    }

    pub fn active_notes(&self) -> &[FallingNote] {
        &self.active
    }

    pub fn is_active(&self, id: NoteId) -> bool {
        self.active.iter().any(|n| n.id == id)
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.clock.elapsed(now)
    }

    pub fn snapshot(&self, now: Instant) -> Snapshot {
        Snapshot {
            state: self.state,
            score: self.score,
            next_event_index: self.next_event_index,
            elapsed: self.elapsed(now),
            active_notes: self.active.len(),
        }
    }
}
