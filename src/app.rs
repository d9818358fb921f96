use crate::engine::SynthEngine;
use crate::model::catalog::Catalog;
use crate::model::keyboard::note_for_key;
use crate::model::song::Song;
use crate::session::Session;
use crate::ui::{FREE_PLAY, GameAreas, draw_game, draw_song_select};
use anyhow::Result;
use crossterm::cursor::Show;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::{debug, info, warn};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::Position;
use ratatui::widgets::ListState;
use spin_sleep::{SpinSleeper, SpinStrategy};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    SongSelect,
    Game,
}

/// The two-screen terminal application around a piano session.
#[derive(Debug)]
pub struct App<E: SynthEngine> {
    catalog: Catalog,
    session: Session<E>,
    screen: Screen,
    entries: Vec<String>,
    menu: ListState,
    areas: GameAreas,
    frame_time: Duration,
    should_quit: bool,
}

impl<E: SynthEngine> App<E> {
    pub fn new(catalog: Catalog, session: Session<E>, frame_rate: f64) -> Self {
        let mut entries: Vec<String> = catalog.titles().into_iter().map(String::from).collect();
        entries.push(FREE_PLAY.to_owned());

        Self {
            catalog,
            session,
            screen: Screen::SongSelect,
            entries,
            menu: ListState::default().with_selected(Some(0)),
            areas: GameAreas::default(),
            frame_time: Duration::from_secs_f64(1.0 / frame_rate.max(1.0)),
            should_quit: false,
        }
    }

    /// Skips the menu and goes straight to the game screen.
    pub fn open(&mut self, song: Option<Arc<Song>>) {
        let title = song
            .as_ref()
            .map(|s| s.title().to_owned())
            .unwrap_or_else(|| FREE_PLAY.into());
        info!("Opening '{}'..!", title);

        if let Some(i) = self.entries.iter().position(|e| *e == title) {
            self.menu.select(Some(i));
        }

        self.session.select_song(song);
        self.screen = Screen::Game;
    }

    fn open_selected(&mut self) {
        let index = self.menu.selected().unwrap_or(0);
        let song = self.catalog.songs().get(index).cloned();
        self.open(song);
    }

    fn back_to_menu(&mut self) {
        self.session.select_song(None);
        self.screen = Screen::SongSelect;
    }

    fn move_selection(&mut self, forward: bool) {
        let len = self.entries.len();
        let current = self.menu.selected().unwrap_or(0);
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        self.menu.select(Some(next));
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.kind == KeyEventKind::Release {
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            warn!("Ctrl-C received, quitting..!");
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::SongSelect => match key.code {
                KeyCode::Up => self.move_selection(false),
                KeyCode::Down => self.move_selection(true),
                KeyCode::Enter => self.open_selected(),
                KeyCode::Esc | KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
            Screen::Game => match key.code {
                KeyCode::Char(' ') => self.session.toggle_playback(now),
                KeyCode::Backspace => self.session.reset_song(),
                KeyCode::Tab => self.session.toggle_sustain(),
                KeyCode::Up => self.session.cycle_instrument(true),
                KeyCode::Down => self.session.cycle_instrument(false),
                KeyCode::Right => self.session.nudge_volume(1),
                KeyCode::Left => self.session.nudge_volume(-1),
                KeyCode::Esc | KeyCode::Char('q') => self.back_to_menu(),
                KeyCode::Char(c) => {
                    if let Some(note) = note_for_key(c) {
                        let outcome = self.session.press_note(note, now);
                        debug!("Key '{}' -> {}: {:?}", c, note, outcome);
                    }
                }
                _ => {}
            },
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        if self.screen != Screen::Game
            || mouse.kind != MouseEventKind::Down(MouseButton::Left)
        {
            return;
        }

        let piano = self.areas.piano;
        if !piano.contains(Position::new(mouse.column, mouse.row)) {
            return;
        }

        let note = self
            .session
            .layout()
            .key_at(mouse.column - piano.x, mouse.row - piano.y)
            .map(|key| key.note);

        if let Some(note) = note {
            let outcome = self.session.press_note(note, now);
            debug!("Click -> {}: {:?}", note, outcome);
        }
    }

    /// Draws the current screen and sizes the note field to what was drawn.
    pub fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        terminal.draw(|frame| match self.screen {
            Screen::SongSelect => draw_song_select(frame, &self.entries, &mut self.menu),
            Screen::Game => self.areas = draw_game(frame, &self.session),
        })?;

        if self.screen == Screen::Game {
            let rows = f64::from(self.areas.notes.height);
            if rows != self.session.game().field_height() {
                self.session.game_mut().set_field_height(rows);
            }
        }

        Ok(())
    }

    /// The frame loop: drain input, run due actions and one game frame, draw,
    /// then sleep until the next frame is due. The synth is silenced however
    /// the loop ends.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let result = self.frame_loop(terminal);
        self.session.shutdown();
        result
    }

    fn frame_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);
        let mut deadline = Instant::now();

        while !self.should_quit {
            while event::poll(Duration::ZERO)? {
                let now = Instant::now();
                match event::read()? {
                    Event::Key(key) => self.handle_key(key, now),
                    Event::Mouse(mouse) => self.handle_mouse(mouse, now),
                    _ => {}
                }
            }

            self.session.tick(Instant::now());
            self.draw(terminal)?;

            deadline += self.frame_time;
            let now = Instant::now();
            if deadline > now {
                sleeper.sleep(deadline - now);
            } else {
                deadline = now;
            }
        }

        Ok(())
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn session(&self) -> &Session<E> {
        &self.session
    }

    pub fn into_session(self) -> Session<E> {
        self.session
    }
}

/// Raw mode plus the alternate screen, undone when dropped.
struct TerminalGuard<W: Write> {
    out: W,
    raw_mode: bool,
}

impl<W: Write> TerminalGuard<W> {
    fn enter(out: W) -> Result<Self> {
        enable_raw_mode()?;
        let mut guard = Self {
            out,
            raw_mode: true,
        };
        execute!(guard.out, EnterAlternateScreen, EnableMouseCapture)?;
        Ok(guard)
    }
}

impl<W: Write> Drop for TerminalGuard<W> {
    fn drop(&mut self) {
        if self.raw_mode
            && let Err(why) = disable_raw_mode()
        {
            warn!("Failed to leave raw mode | why: {:?}", why);
        }
        if let Err(why) = execute!(self.out, LeaveAlternateScreen, DisableMouseCapture, Show) {
            warn!("Failed to restore the terminal | why: {:?}", why);
        }
    }
}

/// Runs `app` on the real terminal. The terminal is restored on every way out,
/// errors and panics included.
pub fn run_in_terminal<E: SynthEngine>(app: &mut App<E>) -> Result<()> {
    let _guard = TerminalGuard::enter(io::stdout())?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    app.run(&mut terminal)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::RecordingEngine;
    use crate::game::PlayState;
    use crate::model::config::GameConfig;
    use crossterm::event::KeyEventState;
    use ratatui::backend::TestBackend;

    fn app() -> App<RecordingEngine> {
        env_logger::try_init().unwrap_or(());
        let session = Session::new(RecordingEngine::default(), GameConfig::default(), 0, 100);
        App::new(Catalog::builtin(), session, 60.0)
    }

    fn press(app: &mut App<RecordingEngine>, code: KeyCode, now: Instant) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE), now);
    }

    fn click(app: &mut App<RecordingEngine>, column: u16, row: u16, now: Instant) {
        app.handle_mouse(
            MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column,
                row,
                modifiers: KeyModifiers::NONE,
            },
            now,
        );
    }

    #[test]
    fn menu_lists_songs_then_free_play() {
        let app = app();
        assert_eq!(app.entries.len(), 3);
        assert_eq!(app.entries.last().map(String::as_str), Some(FREE_PLAY));
        assert_eq!(app.screen(), Screen::SongSelect);
    }

    #[test]
    fn menu_wraps_and_opens_free_play() {
        let now = Instant::now();
        let mut app = app();

        press(&mut app, KeyCode::Up, now);
        assert_eq!(app.menu.selected(), Some(2));
        press(&mut app, KeyCode::Enter, now);

        assert_eq!(app.screen(), Screen::Game);
        assert!(app.session().game().song().is_none());
    }

    #[test]
    fn game_keys_drive_the_session() {
        let now = Instant::now();
        let mut app = app();
        press(&mut app, KeyCode::Enter, now);
        assert!(app.session().game().song().is_some());

        press(&mut app, KeyCode::Char(' '), now);
        assert_eq!(app.session().game().state(), PlayState::Playing);
        press(&mut app, KeyCode::Char(' '), now);
        assert_eq!(app.session().game().state(), PlayState::Paused);
        press(&mut app, KeyCode::Backspace, now);
        assert_eq!(app.session().game().state(), PlayState::Stopped);

        press(&mut app, KeyCode::Tab, now);
        assert!(app.session().controls().sustain);
        press(&mut app, KeyCode::Up, now);
        assert_eq!(app.session().controls().program, 1);
        press(&mut app, KeyCode::Left, now);
        assert_eq!(app.session().controls().volume.position(), 14);

        press(&mut app, KeyCode::Char('A'), now);
        assert_eq!(app.session().synth().note_ons(), vec![60]);
    }

    #[test]
    fn releases_are_ignored() {
        let now = Instant::now();
        let mut app = app();
        press(&mut app, KeyCode::Enter, now);

        let release = KeyEvent {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        app.handle_key(release, now);
        assert!(app.session().synth().note_ons().is_empty());
    }

    #[test]
    fn escape_goes_back_then_quits() {
        let now = Instant::now();
        let mut app = app();
        press(&mut app, KeyCode::Enter, now);

        press(&mut app, KeyCode::Esc, now);
        assert_eq!(app.screen(), Screen::SongSelect);
        assert!(app.session().game().song().is_none());
        assert!(!app.should_quit());

        press(&mut app, KeyCode::Char('q'), now);
        assert!(app.should_quit());
    }

    #[test]
    fn ctrl_c_quits_from_the_game() {
        let now = Instant::now();
        let mut app = app();
        press(&mut app, KeyCode::Enter, now);

        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), now);
        assert!(app.should_quit());
        assert!(app.session().synth().note_ons().is_empty());
    }

    #[test]
    fn clicks_on_the_piano_play_notes() {
        let now = Instant::now();
        let mut app = app();
        app.open(None);

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        app.draw(&mut terminal).unwrap();
        assert_eq!(app.session().game().field_height(), 23.0);

        let piano = app.areas.piano;
        // Bottom row of the first white key, then the top of C#3.
        click(&mut app, piano.x + 1, piano.y + piano.height - 1, now);
        click(&mut app, piano.x + 2, piano.y, now);
        // Outside the keyboard.
        click(&mut app, 0, 0, now);

        assert_eq!(app.session().synth().note_ons(), vec![48, 49]);
    }

    #[test]
    fn dropping_the_guard_restores_the_screen() {
        let mut out: Vec<u8> = Vec::new();
        {
            let _guard = TerminalGuard {
                out: &mut out,
                raw_mode: false,
            };
        }

        let written = String::from_utf8_lossy(&out);
        assert!(written.contains("\x1b[?1049l"), "left the alternate screen");
        assert!(written.contains("\x1b[?1000l"), "released the mouse");
        assert!(written.contains("\x1b[?25h"), "showed the cursor");
    }
}
