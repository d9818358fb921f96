use crate::engine::SynthEngine;
use crate::game::PlayState;
use crate::model::instruments::instrument_name;
use crate::session::{Session, VOLUME_STEPS};
use crate::ui::piano::{NoteField, PIANO_ROWS, PianoWidget, centered};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, List, ListItem, ListState, Paragraph};

pub const FREE_PLAY: &str = "Free Play";

const HELP: &str = "Space play/pause · Backspace reset · Tab sustain · ↑↓ instrument · ←→ volume · Esc back · Ctrl-C quit";

/// Where the game screen put its pieces, for mouse hit testing and for sizing
/// the note field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameAreas {
    pub notes: Rect,
    /// The keyboard itself, already centred.
    pub piano: Rect,
}

/// `├────●───┤`, one cell per slider position.
pub fn volume_slider(position: u8) -> String {
    let mut slider = String::from("├");
    for i in 0..=VOLUME_STEPS {
        slider.push(if i == position { '●' } else { '─' });
    }
    slider.push('┤');
    slider
}

fn state_label(state: PlayState) -> Span<'static> {
    match state {
        PlayState::Stopped => "■ stopped".dark_gray(),
        PlayState::Playing => "▶ playing".green(),
        PlayState::Paused => "❚❚ paused".yellow(),
    }
}

pub fn draw_song_select(frame: &mut Frame, entries: &[String], state: &mut ListState) {
    let [title, list, footer] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            "TermPiano".bold(),
            Span::raw("  pick a song to play along with"),
        ])),
        title,
    );

    let items: Vec<ListItem> = entries.iter().map(|e| ListItem::new(e.as_str())).collect();
    let menu = List::new(items)
        .block(Block::bordered().title(" Songs "))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    frame.render_stateful_widget(menu, list, state);

    frame.render_widget(
        Paragraph::new("↑↓ choose · Enter play · Esc/q quit".dark_gray()),
        footer,
    );
}

pub fn draw_game<E: SynthEngine>(frame: &mut Frame, session: &Session<E>) -> GameAreas {
    let [header, controls, notes, piano, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(PIANO_ROWS),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let game = session.game();
    let title = game
        .song()
        .map(|song| song.title().to_owned())
        .unwrap_or_else(|| FREE_PLAY.into());

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(title, Style::default().bold()),
            Span::raw("  "),
            state_label(game.state()),
            Span::raw("  Score: "),
            Span::styled(game.score().to_string(), Style::default().fg(Color::LightCyan)),
        ])),
        header,
    );

    let c = session.controls();
    let sustain = if c.sustain {
        "Sustain ON".light_green()
    } else {
        "Sustain off".dark_gray()
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            sustain,
            Span::raw(format!(
                "  Instrument: {} ({})  Volume ",
                instrument_name(c.program),
                c.program
            )),
            Span::raw(volume_slider(c.volume.position())),
            Span::raw(format!(" {}", c.volume.value())),
        ])),
        controls,
    );

    let layout = session.layout();
    frame.render_widget(NoteField::new(game, layout), notes);
    frame.render_widget(
        PianoWidget::new(layout, |note: &str| session.is_flashed(note)),
        piano,
    );
    frame.render_widget(Paragraph::new(HELP.dark_gray()), footer);

    GameAreas {
        notes,
        piano: centered(piano, layout.width()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::RecordingEngine;
    use crate::model::config::GameConfig;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn slider_marks_its_position() {
        assert_eq!(volume_slider(0), format!("├●{}┤", "─".repeat(20)));
        assert_eq!(volume_slider(20), format!("├{}●┤", "─".repeat(20)));
        assert_eq!(volume_slider(15).chars().position(|c| c == '●'), Some(16));
    }

    #[test]
    fn game_screen_layout() {
        env_logger::try_init().unwrap_or(());
        let session = Session::new(RecordingEngine::default(), GameConfig::default(), 0, 100);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        let mut areas = GameAreas::default();
        terminal
            .draw(|frame| areas = draw_game(frame, &session))
            .unwrap();

        assert_eq!(areas.notes.height, 30 - 3 - PIANO_ROWS);
        assert_eq!(areas.piano, Rect::new(6, 30 - 1 - PIANO_ROWS, 87, PIANO_ROWS));

        let header: String = (0..20)
            .map(|x| terminal.backend().buffer().cell((x, 0)).unwrap().symbol().to_owned())
            .collect();
        assert!(header.starts_with(FREE_PLAY));
    }

    #[test]
    fn song_select_highlights_the_choice() {
        env_logger::try_init().unwrap_or(());
        let entries = vec![String::from("Twinkle"), String::from(FREE_PLAY)];
        let mut state = ListState::default().with_selected(Some(1));
        let mut terminal = Terminal::new(TestBackend::new(40, 10)).unwrap();

        terminal
            .draw(|frame| draw_song_select(frame, &entries, &mut state))
            .unwrap();

        // Title takes two rows, then the list border.
        let row: String = (1..12)
            .map(|x| terminal.backend().buffer().cell((x, 4)).unwrap().symbol().to_owned())
            .collect();
        assert_eq!(row, "> Free Play");
    }
}
