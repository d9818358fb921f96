use crate::engine::{DEFAULT_VELOCITY, SynthEngine};
use crate::game::{FINISH_DELAY, FallingNote, Game, GameEvent};
use crate::model::config::GameConfig;
use crate::model::instruments::instrument_name;
use crate::model::keyboard::KeyLayout;
use crate::model::notes::midi_for_note;
use crate::model::song::Song;
use crate::scheduler::{Scheduler, TimerId};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const FLASH_DURATION: Duration = Duration::from_millis(200);
pub const REPEAT_GUARD: Duration = Duration::from_millis(100);
pub const RELEASE_SUSTAINED: Duration = Duration::from_secs(2);
pub const RELEASE_DRY: Duration = Duration::from_millis(500);
pub const VOLUME_STEPS: u8 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deferred {
    NoteOff { midi: u8 },
    ReleaseGuard { midi: u8 },
    Unflash { note: &'static str, flash: u64 },
    FinishSong { run: u64 },
}

/// Position of the volume slider, `0..=VOLUME_STEPS`, and the channel volume
/// it currently stands for.
///
/// A starting value keeps its exact level; only nudges snap to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeSlider {
    position: u8,
    value: u8,
}

impl VolumeSlider {
    pub fn from_value(value: u8) -> Self {
        let value = value.min(127);
        Self {
            position: (u32::from(value) * u32::from(VOLUME_STEPS) / 127) as u8,
            value,
        }
    }

    pub fn position(&self) -> u8 {
        self.position
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn nudge(&mut self, delta: i8) -> bool {
        let next = (i16::from(self.position) + i16::from(delta)).clamp(0, i16::from(VOLUME_STEPS));
        if next as u8 == self.position {
            return false;
        }

        self.position = next as u8;
        self.value = (u32::from(self.position) * 127 / u32::from(VOLUME_STEPS)) as u8;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub sustain: bool,
    pub program: u8,
    pub volume: VolumeSlider,
}

/// What a note press did.
#[derive(Debug, Clone, PartialEq)]
pub enum PressOutcome {
    /// No such note on the piano.
    Unmapped,
    /// Same key again within the repeat guard.
    Repeat,
    Played { hit: Option<FallingNote> },
}

/// Everything one piano session owns: the synth handle, the key layout, the
/// deferred actions and the scoring engine.
#[derive(Debug)]
pub struct Session<E: SynthEngine> {
    synth: E,
    game: Game,
    layout: KeyLayout,
    timers: Scheduler<Deferred>,
    controls: Controls,
    held: HashSet<u8>,
    pending_off: HashMap<u8, TimerId>,
    flashed: HashMap<&'static str, u64>,
    flash_seq: u64,
}

impl<E: SynthEngine> Session<E> {
    pub fn new(synth: E, config: GameConfig, program: u8, volume: u8) -> Self {
        let mut session = Self {
            synth,
            game: Game::new(config),
            layout: KeyLayout::new(),
            timers: Scheduler::new(),
            controls: Controls {
                sustain: false,
                program: program.min(127),
                volume: VolumeSlider::from_value(volume),
            },
            held: HashSet::new(),
            pending_off: HashMap::new(),
            flashed: HashMap::new(),
            flash_seq: 0,
        };

        let program = session.controls.program;
        let volume = session.controls.volume.value();
        session.send("program select", |s| s.program_change(program));
        session.send("volume", |s| s.set_volume(volume));
        session.send("sustain", |s| s.set_sustain(false));
        session
    }

    fn send<F>(&mut self, what: &str, f: F)
    where
        F: FnOnce(&mut E) -> anyhow::Result<()>,
    {
        if let Err(why) = f(&mut self.synth) {
            warn!("Synth error during {} | why: {:?}", what, why);
        }
    }

    pub fn select_song(&mut self, song: Option<Arc<Song>>) {
        self.game.load_song(song);
    }

    /// Player pressed the key for `note`: sound it, flash it, then try to score.
    pub fn press_note(&mut self, note: &str, now: Instant) -> PressOutcome {
        let Some(midi) = midi_for_note(note) else {
            debug!("No MIDI mapping for '{}', ignoring..!", note);
            return PressOutcome::Unmapped;
        };

        if !self.held.insert(midi) {
            return PressOutcome::Repeat;
        }
        self.timers
            .schedule_after(now, REPEAT_GUARD, Deferred::ReleaseGuard { midi });

        if let Some(id) = self.pending_off.remove(&midi) {
            self.timers.cancel(id);
        }

        self.send("note on", |s| s.note_on(midi, DEFAULT_VELOCITY));
        let release = if self.controls.sustain {
            RELEASE_SUSTAINED
        } else {
            RELEASE_DRY
        };
        let id = self
            .timers
            .schedule_after(now, release, Deferred::NoteOff { midi });
        self.pending_off.insert(midi, id);

        self.flash(note, now);

        PressOutcome::Played {
            hit: self.game.hit(note),
        }
    }

    fn flash(&mut self, note: &str, now: Instant) {
        let Some(note) = self.layout.key(note).map(|key| key.note) else {
            return;
        };

        self.flash_seq += 1;
        self.flashed.insert(note, self.flash_seq);
        self.timers.schedule_after(
            now,
            FLASH_DURATION,
            Deferred::Unflash {
                note,
                flash: self.flash_seq,
            },
        );
    }

    pub fn is_flashed(&self, note: &str) -> bool {
        self.flashed.contains_key(note)
    }

    pub fn toggle_sustain(&mut self) {
        self.controls.sustain = !self.controls.sustain;
        let on = self.controls.sustain;

        self.send("sustain", |s| s.set_sustain(on));
        if !on {
            self.send("all notes off", |s| s.all_notes_off());
        }
        info!("Sustain {}..!", if on { "on" } else { "off" });
    }

    pub fn select_instrument(&mut self, program: u8) {
        let program = program.min(127);
        self.controls.program = program;

        self.send("program select", |s| s.program_change(program));
        self.send("all notes off", |s| s.all_notes_off());
        info!("Instrument: {} ({})", instrument_name(program), program);
    }

    /// Steps through the General MIDI programs, wrapping at either end.
    pub fn cycle_instrument(&mut self, forward: bool) {
        let program = if forward {
            (self.controls.program + 1) % 128
        } else {
            (self.controls.program + 127) % 128
        };
        self.select_instrument(program);
    }

    pub fn nudge_volume(&mut self, delta: i8) {
        if !self.controls.volume.nudge(delta) {
            return;
        }

        let value = self.controls.volume.value();
        self.send("volume", |s| s.set_volume(value));
        debug!("Volume: {}", value);
    }

    pub fn toggle_playback(&mut self, now: Instant) {
        if self.game.song().is_none() {
            return;
        }
        self.game.toggle(now);
    }

    pub fn reset_song(&mut self) {
        self.game.reset();
    }

    /// One pass of the frame loop: deferred actions first, then a game frame.
    pub fn tick(&mut self, now: Instant) {
        for (id, action) in self.timers.take_due(now) {
            self.run_deferred(id, action);
        }

        for event in self.game.tick(now, &self.layout) {
            if let GameEvent::SongFinished { run } = event {
                self.timers
                    .schedule_after(now, FINISH_DELAY, Deferred::FinishSong { run });
            }
        }
    }

    fn run_deferred(&mut self, id: TimerId, action: Deferred) {
        match action {
            Deferred::NoteOff { midi } => {
                if self.pending_off.get(&midi) == Some(&id) {
                    self.pending_off.remove(&midi);
                    self.send("note off", |s| s.note_off(midi));
                }
            }
            Deferred::ReleaseGuard { midi } => {
                self.held.remove(&midi);
            }
            Deferred::Unflash { note, flash } => {
                if self.flashed.get(note) == Some(&flash) {
                    self.flashed.remove(note);
                }
            }
            Deferred::FinishSong { run } => {
                self.game.finish(run);
            }
        }
    }

    /// Silences everything; called before the synth goes away. Sounding notes
    /// are released and the damper is lifted before "all notes off".
    pub fn shutdown(&mut self) {
        self.timers.clear();
        self.held.clear();
        self.flashed.clear();

        let sounding: Vec<u8> = self.pending_off.drain().map(|(midi, _)| midi).collect();
        for midi in sounding {
            self.send("note off", |s| s.note_off(midi));
        }

        if self.controls.sustain {
            self.controls.sustain = false;
            self.send("sustain", |s| s.set_sustain(false));
        }
        self.send("all notes off", |s| s.all_notes_off());
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn synth(&self) -> &E {
        &self.synth
    }

    pub fn into_synth(self) -> E {
        self.synth
    }
}
